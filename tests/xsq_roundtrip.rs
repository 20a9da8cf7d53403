//! XSQ emit/parse round-trip over a full pipeline output.

use pretty_assertions::assert_eq;

use lumiseq::prelude::*;

fn rendered_sequence() -> XSequence {
    let grid = BeatGrid::from_constant_bpm(100.0, 4, 48_000).unwrap();
    let fixtures = vec![
        FixtureInstance::standard("MH1", "Dmx MH1"),
        FixtureInstance::standard("MH2", "Dmx MH2"),
    ];
    let group = FixtureGroup {
        group_id: "moving_heads".to_owned(),
        fixture_ids: vec!["MH1".to_owned(), "MH2".to_owned()],
        chase_order: ChaseOrder::LeftToRight,
        tags: Vec::new(),
    };
    let rig = RigProfile::new(fixtures, vec![group]).unwrap();
    let plan = ChoreographyPlan::new(
        vec![
            Section::new("verse", 1, 10, "mirror_wave", ["moving_heads"]),
            Section::new("chorus", 11, 20, "fan_pulse", ["moving_heads"]),
        ],
        "roundtrip",
    );
    let registries = Registries::builtins();
    let options = PipelineOptions {
        media_file: "song.mp3".to_owned(),
        song: "Round Trip".to_owned(),
        artist: "lumiseq".to_owned(),
        ..PipelineOptions::default()
    };
    RenderingPipeline::new(plan, grid, rig, &registries, options)
        .render()
        .unwrap()
        .xsq
}

#[test]
fn parse_inverts_emit_for_a_full_render() {
    let original = rendered_sequence();
    let xml = emit_xsq(&original).unwrap();
    let mut parsed = parse_xsq(&xml).unwrap();
    parsed.effect_db.rebuild_index();
    assert_eq!(parsed, original);
}

#[test]
fn emit_parse_emit_is_stable() {
    let original = rendered_sequence();
    let first = emit_xsq(&original).unwrap();
    let reparsed = parse_xsq(&first).unwrap();
    let second = emit_xsq(&reparsed).unwrap();
    assert_eq!(first, second);
}

#[test]
fn duration_survives_the_seconds_conversion() {
    let original = rendered_sequence();
    assert_eq!(original.head.duration_ms, 48_000);
    let xml = emit_xsq(&original).unwrap();
    assert!(xml.contains("<sequenceDuration>48.000</sequenceDuration>"));
    let parsed = parse_xsq(&xml).unwrap();
    assert_eq!(parsed.head.duration_ms, 48_000);
}

#[test]
fn value_curve_slider_contract_holds_for_every_entry() {
    let xsq = rendered_sequence();
    for entry in &xsq.effect_db.entries {
        for part in entry.split(',') {
            if let Some(rest) = part.strip_prefix("E_VALUECURVE_DMX") {
                let channel: String =
                    rest.chars().take_while(char::is_ascii_digit).collect();
                assert!(
                    entry.contains(&format!("E_SLIDER_DMX{channel}=0,"))
                        || entry.contains(&format!(",E_SLIDER_DMX{channel}=0")),
                    "channel {channel} slider must be zero under a value curve"
                );
            }
        }
    }
}

#[test]
fn custom_value_curves_are_anchored() {
    let xsq = rendered_sequence();
    for entry in &xsq.effect_db.entries {
        let mut rest = entry.as_str();
        while let Some(pos) = rest.find("Values=") {
            let values = &rest[pos + "Values=".len()..];
            let end = values.find('|').unwrap_or(values.len());
            let values = &values[..end];
            assert!(values.starts_with("0.0000:"), "unanchored start: {values}");
            let last_pair = values.rsplit(';').next().unwrap();
            assert!(last_pair.starts_with("1.0000:"), "unanchored end: {values}");
            rest = &rest[pos + 7..];
        }
    }
}
