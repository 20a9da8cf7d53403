//! The strict-inverse XSQ parser.

use std::collections::BTreeMap;

use quick_xml::{Reader, events::Event};

use super::{
    XsqParseError,
    emit::parse_seconds_3dp,
    model::{
        DisplayElement, Effect, EffectDb, EffectLayer, Element, ElementType, SequenceHead,
        XSequence,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Head,
    EffectDb,
    DisplayElements,
    ElementEffects,
}

fn malformed(message: impl ToString) -> XsqParseError {
    XsqParseError::MalformedXml(message.to_string())
}

fn parse_effect_attributes(
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<Effect, XsqParseError> {
    let mut effect = Effect::default();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(malformed)?.into_owned();
        match key.as_str() {
            "ref" => {
                effect.ref_index = Some(value.parse().map_err(|_| malformed("bad ref"))?);
            }
            "name" => effect.name = Some(value),
            "label" => effect.label = Some(value),
            "startTime" => {
                effect.start_ms = value.parse().map_err(|_| malformed("bad startTime"))?;
            }
            "endTime" => {
                effect.end_ms = value.parse().map_err(|_| malformed("bad endTime"))?;
            }
            "palette" => effect.palette = Some(value),
            _ => {
                effect.parameters.insert(key, value);
            }
        }
    }
    Ok(effect)
}

fn parse_typed_name(
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<(ElementType, String), XsqParseError> {
    let mut element_type = None;
    let mut name = None;
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let value = attribute.unescape_value().map_err(malformed)?.into_owned();
        match attribute.key.as_ref() {
            b"type" => {
                element_type =
                    Some(value.parse::<ElementType>().map_err(|_| {
                        malformed(format!("unknown element type '{value}'"))
                    })?);
            }
            b"name" => name = Some(value),
            _ => {}
        }
    }
    match (element_type, name) {
        (Some(element_type), Some(name)) => Ok((element_type, name)),
        _ => Err(XsqParseError::MissingRequired("Element type/name".into())),
    }
}

/// Parses an XSQ document.
///
/// The strict inverse of [`super::emit_xsq`]: `sequence_duration` converts
/// from seconds back to internal milliseconds, effect times are read as
/// milliseconds, and unknown effect attributes are preserved in the per-effect
/// parameter map so a subsequent emit round-trips.
///
/// # Errors
///
/// [`XsqParseError::MalformedXml`] for XML-level failures,
/// [`XsqParseError::MissingRequired`] when `version`, `sequence_duration` or
/// `MediaFile` is absent, and [`XsqParseError::UnknownVersion`] for
/// pre-2024 sequence versions.
pub fn parse_xsq(input: &str) -> Result<XSequence, XsqParseError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut block = Block::None;
    let mut head_fields: BTreeMap<String, String> = BTreeMap::new();
    let mut head_tag: Option<String> = None;

    let mut effect_db = EffectDb::default();
    let mut db_entry_open = false;
    let mut db_entry_text = String::new();

    let mut display_elements: Vec<DisplayElement> = Vec::new();
    let mut elements: Vec<Element> = Vec::new();
    let mut current_element: Option<Element> = None;
    let mut current_layer: Option<EffectLayer> = None;

    loop {
        match reader.read_event() {
            Err(e) => return Err(malformed(e)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => match start.name().as_ref() {
                b"xsequence" => {}
                b"head" => block = Block::Head,
                b"EffectDB" => block = Block::EffectDb,
                b"DisplayElements" => block = Block::DisplayElements,
                b"ElementEffects" => block = Block::ElementEffects,
                b"Effect" if block == Block::EffectDb => {
                    db_entry_open = true;
                    db_entry_text.clear();
                }
                b"Effect" if block == Block::ElementEffects => {
                    if let Some(layer) = current_layer.as_mut() {
                        layer.effects.push(parse_effect_attributes(&start)?);
                    }
                }
                b"Element" if block == Block::ElementEffects => {
                    let (element_type, name) = parse_typed_name(&start)?;
                    current_element = Some(Element {
                        element_type,
                        name,
                        layers: Vec::new(),
                    });
                }
                b"EffectLayer" => current_layer = Some(EffectLayer::default()),
                tag if block == Block::Head => {
                    let tag = String::from_utf8_lossy(tag).into_owned();
                    head_fields.entry(tag.clone()).or_default();
                    head_tag = Some(tag);
                }
                _ => {}
            },
            Ok(Event::Empty(start)) => match start.name().as_ref() {
                b"Element" if block == Block::DisplayElements => {
                    let (element_type, name) = parse_typed_name(&start)?;
                    display_elements.push(DisplayElement { element_type, name });
                }
                b"Effect" if block == Block::ElementEffects => {
                    if let Some(layer) = current_layer.as_mut() {
                        layer.effects.push(parse_effect_attributes(&start)?);
                    }
                }
                tag if block == Block::Head => {
                    head_fields
                        .entry(String::from_utf8_lossy(tag).into_owned())
                        .or_default();
                }
                _ => {}
            },
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(malformed)?.into_owned();
                if db_entry_open {
                    db_entry_text.push_str(&text);
                } else if let Some(tag) = &head_tag {
                    head_fields.insert(tag.clone(), text);
                }
            }
            Ok(Event::End(end)) => match end.name().as_ref() {
                b"head" => {
                    block = Block::None;
                    head_tag = None;
                }
                b"EffectDB" | b"DisplayElements" | b"ElementEffects" => block = Block::None,
                b"Effect" if db_entry_open => {
                    db_entry_open = false;
                    effect_db.intern(std::mem::take(&mut db_entry_text));
                }
                b"EffectLayer" => {
                    if let (Some(element), Some(layer)) =
                        (current_element.as_mut(), current_layer.take())
                    {
                        element.layers.push(layer);
                    }
                }
                b"Element" => {
                    if let Some(element) = current_element.take() {
                        elements.push(element);
                    }
                }
                _ if block == Block::Head => head_tag = None,
                _ => {}
            },
            Ok(_) => {}
        }
    }

    let version = head_fields
        .get("version")
        .cloned()
        .ok_or_else(|| XsqParseError::MissingRequired("version".into()))?;
    let media_file = head_fields
        .get("mediaFile")
        .cloned()
        .ok_or_else(|| XsqParseError::MissingRequired("MediaFile".into()))?;
    let duration_text = head_fields
        .get("sequenceDuration")
        .cloned()
        .ok_or_else(|| XsqParseError::MissingRequired("sequence_duration".into()))?;
    let duration_ms = parse_seconds_3dp(&duration_text)
        .ok_or_else(|| malformed(format!("bad sequence_duration '{duration_text}'")))?;

    let major: Option<i32> = version
        .split('.')
        .next()
        .and_then(|major| major.parse().ok());
    if major.is_none_or(|major| major < 2024) {
        return Err(XsqParseError::UnknownVersion(version));
    }

    Ok(XSequence {
        head: SequenceHead {
            version,
            media_file,
            duration_ms,
            song: head_fields.get("song").cloned().unwrap_or_default(),
            artist: head_fields.get("artist").cloned().unwrap_or_default(),
            sequence_type: head_fields
                .get("sequenceType")
                .cloned()
                .unwrap_or_else(|| "Media".to_owned()),
            sequence_timing: head_fields
                .get("sequenceTiming")
                .cloned()
                .unwrap_or_else(|| "50 ms".to_owned()),
        },
        effect_db,
        display_elements,
        elements,
    })
}
