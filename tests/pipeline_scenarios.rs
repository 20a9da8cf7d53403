//! End-to-end pipeline scenarios.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use lumiseq::prelude::*;

fn fixture_with_limits(id: &str, model: &str) -> FixtureInstance {
    let mut fixture = FixtureInstance::standard(id, model);
    fixture.calibration.pan_min_dmx = 1;
    fixture.calibration.pan_max_dmx = 245;
    fixture.calibration.tilt_min_dmx = 10;
    fixture.calibration.tilt_max_dmx = 235;
    fixture
}

fn rig_of(n: usize) -> RigProfile {
    let fixtures: Vec<FixtureInstance> = (1..=n)
        .map(|i| fixture_with_limits(&format!("MH{i}"), &format!("Dmx MH{i}")))
        .collect();
    let group = FixtureGroup {
        group_id: "moving_heads".to_owned(),
        fixture_ids: fixtures.iter().map(|f| f.fixture_id.clone()).collect(),
        chase_order: ChaseOrder::LeftToRight,
        tags: Vec::new(),
    };
    RigProfile::new(fixtures, vec![group]).unwrap()
}

#[test]
fn minimal_song_single_fixture_pan_sweep() {
    // 120 BPM, 4/4, 90 bars: 2000ms per bar, 180s song.
    let grid = BeatGrid::from_constant_bpm(120.0, 4, 180_000).unwrap();
    let rig = rig_of(1);
    let plan = ChoreographyPlan::new(
        vec![Section::new("all", 1, 90, "pan_sweep", ["moving_heads"])],
        "single sweep",
    );
    let registries = Registries::builtins();
    let pipeline = RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());
    let output = pipeline.render().unwrap();

    let element = output.xsq.element("Dmx MH1").unwrap();
    let effects = &element.layers[0].effects;
    assert_eq!(effects.len(), 90);
    for (i, effect) in effects.iter().enumerate() {
        assert_eq!(effect.end_ms - effect.start_ms, 2_000, "effect {i}");
        assert_eq!(effect.start_ms, i as i64 * 2_000);
        assert_eq!(effect.name.as_deref(), Some("DMX"));
    }

    // The sweep runs linearly between the pan clamp endpoints.
    let settings = output
        .xsq
        .effect_db
        .get(effects[0].ref_index.unwrap())
        .unwrap();
    assert!(settings.contains("E_SLIDER_DMX1=0"));
    assert!(settings.contains("Type=Ramp"));
    assert!(settings.contains("P1=1.00|P2=245.00"));
}

#[test]
fn four_fixture_chevron_mirrors_offsets() {
    let grid = BeatGrid::from_constant_bpm(120.0, 4, 32_000).unwrap();
    let rig = rig_of(4);
    let plan = ChoreographyPlan::new(
        vec![Section::new("bloom", 1, 16, "chevron_bloom", ["moving_heads"])],
        "chevron",
    );
    let registries = Registries::builtins();
    let pipeline = RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());
    let output = pipeline.render().unwrap();

    // One chevron step per template pass; take the first pass's segments.
    let mut bases: BTreeMap<String, f64> = BTreeMap::new();
    for segment in output.segments.iter().filter(|s| s.t0_ms == 0) {
        let pan = segment.channel(ChannelName::Pan).unwrap();
        bases.insert(
            segment.fixture_id.clone(),
            f64::from(pan.base_dmx.unwrap()),
        );
    }
    assert_eq!(bases.len(), 4);

    let center = 128.0; // forward pan calibration
    let offset = |id: &str| bases[id] - center;
    // Outer fixtures swing wider than inner ones, mirrored around center.
    assert!(offset("MH1") < offset("MH2"));
    assert!(offset("MH2") < offset("MH3"));
    assert!(offset("MH3") < offset("MH4"));
    assert!((offset("MH1") + offset("MH4")).abs() <= 2.0);
    assert!((offset("MH2") + offset("MH3")).abs() <= 2.0);

    // Every fixture is lifted above the horizon: tilt base beyond the horizon
    // calibration value.
    for segment in output.segments.iter().filter(|s| s.t0_ms == 0) {
        let tilt = segment.channel(ChannelName::Tilt).unwrap();
        let base = tilt.base_dmx.or(tilt.static_dmx).unwrap();
        assert!(base > 128, "{} tilt {base}", segment.fixture_id);
    }
}

#[test]
fn section_boundary_crossfades_collapse_into_one_region() {
    let grid = BeatGrid::from_constant_bpm(120.0, 4, 32_000).unwrap();
    let rig = rig_of(1);

    // A template whose edges declare 1-bar crossfades.
    let mut registries = Registries::builtins();
    let mut template = registries
        .templates
        .get("pan_sweep")
        .unwrap()
        .template
        .clone();
    template.template_id = "sweep_fade".into();
    template.steps[0].entry_transition = Some(TransitionHint::new(TransitionMode::Crossfade, 1.0));
    template.steps[0].exit_transition = Some(TransitionHint::new(TransitionMode::Crossfade, 1.0));
    registries.templates.register(TemplateDoc {
        template,
        presets: Vec::new(),
    });

    let plan = ChoreographyPlan::new(
        vec![
            Section::new("a", 1, 8, "sweep_fade", ["moving_heads"]),
            Section::new("b", 9, 16, "sweep_fade", ["moving_heads"]),
        ],
        "crossfade",
    );
    let pipeline = RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());
    let output = pipeline.render().unwrap();

    let transitions: Vec<&FixtureSegment> = output
        .segments
        .iter()
        .filter(|s| s.metadata.get("kind").map(String::as_str) == Some("transition"))
        .collect();
    assert_eq!(transitions.len(), 1, "adjacent exit+entry merge into one");
    let region = transitions[0];
    // One bar out plus one bar in: a single 2-bar (4000ms) blended region
    // centered on the bar-8/bar-9 boundary at 16000ms.
    assert_eq!(region.t1_ms - region.t0_ms, 4_000);
    assert_eq!((region.t0_ms + region.t1_ms) / 2, 16_000);
}

#[test]
fn sine_value_curve_emission_round_trips_byte_for_byte() {
    let grid = BeatGrid::from_constant_bpm(120.0, 4, 16_000).unwrap();
    let rig = rig_of(2);
    let plan = ChoreographyPlan::new(
        vec![Section::new("fan", 1, 8, "fan_pulse", ["moving_heads"])],
        "fan",
    );
    let registries = Registries::builtins();
    let pipeline = RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());
    let output = pipeline.render().unwrap();

    // The sweep_sine movement puts a native sine on pan: slider zero plus a
    // Sine value curve.
    let sine_entry = output
        .xsq
        .effect_db
        .entries
        .iter()
        .find(|e| e.contains("Type=Sine"))
        .expect("a native sine value curve is emitted");
    assert!(sine_entry.contains("E_SLIDER_DMX1=0"));
    assert!(sine_entry.contains("E_VALUECURVE_DMX1=Active=TRUE|Id=ID_VALUECURVE_DMX1|Type=Sine|"));

    // Reading the file back reproduces every settings string byte-for-byte.
    let xml = emit_xsq(&output.xsq).unwrap();
    let parsed = parse_xsq(&xml).unwrap();
    assert_eq!(parsed.effect_db.entries, output.xsq.effect_db.entries);
}

#[test]
fn overlapping_sections_fail_validation_and_write_nothing() {
    let grid = BeatGrid::from_constant_bpm(120.0, 4, 64_000).unwrap();
    let rig = rig_of(1);
    let plan = ChoreographyPlan::new(
        vec![
            Section::new("a", 1, 16, "pan_sweep", ["moving_heads"]),
            Section::new("b", 15, 20, "pan_sweep", ["moving_heads"]),
        ],
        "overlap",
    );
    let registries = Registries::builtins();
    let pipeline = RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xsq");
    let err = pipeline.render_to_file(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains('a') && message.contains('b'), "{message}");
    assert!(message.contains("overlap"), "{message}");
    assert!(!path.exists());
}

#[test]
fn safety_clamps_hold_across_the_whole_sequence() {
    let grid = BeatGrid::from_constant_bpm(120.0, 4, 32_000).unwrap();
    let mut rig = rig_of(2);
    rig.fixtures[0].calibration.dimmer_floor_dmx = 20;
    rig.fixtures[0].calibration.dimmer_ceiling_dmx = 230;
    let plan = ChoreographyPlan::new(
        vec![
            Section::new("a", 2, 8, "mirror_wave", ["moving_heads"]),
            Section::new("b", 9, 15, "fan_pulse", ["moving_heads"]),
        ],
        "clamps",
    );
    let registries = Registries::builtins();
    let pipeline = RenderingPipeline::new(plan, grid, rig.clone(), &registries, PipelineOptions::default());
    let output = pipeline.render().unwrap();

    for segment in &output.segments {
        let calibration = rig.fixture(&segment.fixture_id).unwrap().calibration;
        for (channel, limits) in [
            (
                ChannelName::Pan,
                (calibration.pan_min_dmx, calibration.pan_max_dmx),
            ),
            (
                ChannelName::Tilt,
                (calibration.tilt_min_dmx, calibration.tilt_max_dmx),
            ),
            (
                ChannelName::Dimmer,
                (
                    calibration.dimmer_floor_dmx,
                    calibration.dimmer_ceiling_dmx,
                ),
            ),
        ] {
            let Some(value) = segment.channel(channel) else {
                continue;
            };
            for i in 0..=20 {
                let dmx = value.dmx_at(f64::from(i) / 20.0);
                assert!(
                    dmx >= f64::from(limits.0) - 0.5 && dmx <= f64::from(limits.1) + 0.5,
                    "{} {channel} {dmx} outside {limits:?}",
                    segment.segment_id
                );
            }
        }
    }
}
