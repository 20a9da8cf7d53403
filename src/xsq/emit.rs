//! Deterministic XSQ XML emission.

use std::path::Path;

use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use super::{
    EmissionError,
    model::{Effect, XSequence},
};

type XmlWriter = Writer<Vec<u8>>;

fn io_error(e: std::io::Error) -> EmissionError {
    EmissionError::Xml(e.to_string())
}

/// Milliseconds rendered as seconds with exactly three decimal places.
fn seconds_3dp(ms: i64) -> String {
    format!("{}.{:03}", ms / 1_000, ms % 1_000)
}

fn write_text_element(
    writer: &mut XmlWriter,
    name: &str,
    text: &str,
) -> Result<(), EmissionError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(io_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(io_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(io_error)?;
    Ok(())
}

fn effect_start(effect: &Effect) -> BytesStart<'static> {
    let mut start = BytesStart::new("Effect");
    if let Some(ref_index) = effect.ref_index {
        start.push_attribute(("ref", ref_index.to_string().as_str()));
    }
    if let Some(name) = &effect.name {
        start.push_attribute(("name", name.as_str()));
    }
    if let Some(label) = &effect.label {
        start.push_attribute(("label", label.as_str()));
    }
    start.push_attribute(("startTime", effect.start_ms.to_string().as_str()));
    start.push_attribute(("endTime", effect.end_ms.to_string().as_str()));
    if let Some(palette) = &effect.palette {
        start.push_attribute(("palette", palette.as_str()));
    }
    for (key, value) in &effect.parameters {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

/// Serializes a sequence to XML.
///
/// Output is deterministic: elements in their declared order, effects as
/// stored (the pipeline sorts them by start time), attributes in a fixed
/// order, and fixed-point fields formatted by truncation.
///
/// # Errors
///
/// [`EmissionError::DuplicateElement`] when element names collide, and
/// [`EmissionError::Xml`] when the writer fails.
pub fn emit_xsq(xsq: &XSequence) -> Result<String, EmissionError> {
    xsq.check_unique_elements()?;

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(io_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("xsequence")))
        .map_err(io_error)?;

    // head
    writer
        .write_event(Event::Start(BytesStart::new("head")))
        .map_err(io_error)?;
    write_text_element(&mut writer, "version", &xsq.head.version)?;
    write_text_element(&mut writer, "mediaFile", &xsq.head.media_file)?;
    write_text_element(
        &mut writer,
        "sequenceDuration",
        &seconds_3dp(xsq.head.duration_ms),
    )?;
    write_text_element(&mut writer, "song", &xsq.head.song)?;
    write_text_element(&mut writer, "artist", &xsq.head.artist)?;
    write_text_element(&mut writer, "sequenceType", &xsq.head.sequence_type)?;
    write_text_element(&mut writer, "sequenceTiming", &xsq.head.sequence_timing)?;
    writer
        .write_event(Event::End(BytesEnd::new("head")))
        .map_err(io_error)?;

    // EffectDB: ordered unique settings strings, referenced by index.
    writer
        .write_event(Event::Start(BytesStart::new("EffectDB")))
        .map_err(io_error)?;
    for (index, entry) in xsq.effect_db.entries.iter().enumerate() {
        let mut start = BytesStart::new("Effect");
        start.push_attribute(("ref", index.to_string().as_str()));
        writer.write_event(Event::Start(start)).map_err(io_error)?;
        writer
            .write_event(Event::Text(BytesText::new(entry)))
            .map_err(io_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("Effect")))
            .map_err(io_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("EffectDB")))
        .map_err(io_error)?;

    // DisplayElements
    writer
        .write_event(Event::Start(BytesStart::new("DisplayElements")))
        .map_err(io_error)?;
    for display in &xsq.display_elements {
        let mut start = BytesStart::new("Element");
        start.push_attribute(("type", display.element_type.to_string().as_str()));
        start.push_attribute(("name", display.name.as_str()));
        writer.write_event(Event::Empty(start)).map_err(io_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("DisplayElements")))
        .map_err(io_error)?;

    // ElementEffects
    writer
        .write_event(Event::Start(BytesStart::new("ElementEffects")))
        .map_err(io_error)?;
    for element in &xsq.elements {
        let mut start = BytesStart::new("Element");
        start.push_attribute(("type", element.element_type.to_string().as_str()));
        start.push_attribute(("name", element.name.as_str()));
        writer.write_event(Event::Start(start)).map_err(io_error)?;
        for layer in &element.layers {
            writer
                .write_event(Event::Start(BytesStart::new("EffectLayer")))
                .map_err(io_error)?;
            for effect in &layer.effects {
                writer
                    .write_event(Event::Empty(effect_start(effect)))
                    .map_err(io_error)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("EffectLayer")))
                .map_err(io_error)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("Element")))
            .map_err(io_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("ElementEffects")))
        .map_err(io_error)?;

    writer
        .write_event(Event::End(BytesEnd::new("xsequence")))
        .map_err(io_error)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| EmissionError::Xml(e.to_string()))
}

/// Emits a sequence and writes it to a file in one step.
///
/// Serialization happens fully in memory first, so a failed run writes
/// nothing.
///
/// # Errors
///
/// [`EmissionError::Io`] when the file cannot be written, plus everything
/// [`emit_xsq`] reports.
pub fn write_xsq_file(xsq: &XSequence, path: &Path) -> Result<(), EmissionError> {
    let xml = emit_xsq(xsq)?;
    std::fs::write(path, xml).map_err(|e| EmissionError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Parses a `seconds.millis` duration back to milliseconds.
pub(super) fn parse_seconds_3dp(text: &str) -> Option<i64> {
    let (seconds, millis) = match text.split_once('.') {
        Some((s, m)) => (s, m),
        None => (text, "0"),
    };
    let seconds: i64 = seconds.parse().ok()?;
    let mut millis_text = millis.to_owned();
    while millis_text.len() < 3 {
        millis_text.push('0');
    }
    let millis: i64 = millis_text[..3].parse().ok()?;
    Some(seconds * 1_000 + millis)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::xsq::model::{EffectLayer, Element, ElementType, SequenceHead};

    use super::*;

    #[test]
    fn duration_renders_three_decimals() {
        assert_eq!(seconds_3dp(10_500), "10.500");
        assert_eq!(seconds_3dp(500), "0.500");
        assert_eq!(seconds_3dp(180_000), "180.000");
        assert_eq!(seconds_3dp(1), "0.001");
    }

    #[test]
    fn duration_parses_back() {
        assert_eq!(parse_seconds_3dp("10.500"), Some(10_500));
        assert_eq!(parse_seconds_3dp("180.000"), Some(180_000));
        assert_eq!(parse_seconds_3dp("3"), Some(3_000));
        assert_eq!(parse_seconds_3dp("0.5"), Some(500));
    }

    #[test]
    fn emission_is_deterministic() {
        let mut xsq = XSequence::new(SequenceHead {
            duration_ms: 4_000,
            ..SequenceHead::default()
        });
        let ref_index = xsq.effect_db.intern("E_SLIDER_DMX1=0".to_owned());
        xsq.add_effect(
            ElementType::Model,
            "Dmx MH1",
            0,
            Effect {
                ref_index: Some(ref_index),
                name: Some("DMX".to_owned()),
                start_ms: 0,
                end_ms: 4_000,
                ..Effect::default()
            },
        );
        let first = emit_xsq(&xsq).unwrap();
        let second = emit_xsq(&xsq).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("<sequenceDuration>4.000</sequenceDuration>"));
        assert!(first.contains(r#"<Effect ref="0" name="DMX" startTime="0" endTime="4000"/>"#));
    }

    #[test]
    fn duplicate_element_names_abort_emission() {
        let mut xsq = XSequence::default();
        for _ in 0..2 {
            xsq.elements.push(Element {
                element_type: ElementType::Model,
                name: "Dup".to_owned(),
                layers: vec![EffectLayer::default()],
            });
        }
        assert!(matches!(
            emit_xsq(&xsq),
            Err(EmissionError::DuplicateElement(_))
        ));
    }
}
