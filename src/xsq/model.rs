//! XSQ value objects.

use std::collections::{BTreeMap, HashMap};

use super::EmissionError;

/// Sequence metadata from the `<head>` block.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SequenceHead {
    /// xLights version the file targets (e.g. `2024.20`).
    pub version: String,
    /// Audio file the sequence plays against.
    pub media_file: String,
    /// Sequence duration in milliseconds; emitted in seconds with three
    /// decimal places.
    pub duration_ms: i64,
    /// Song title.
    pub song: String,
    /// Artist.
    pub artist: String,
    /// Sequence type (`Media` for audio-backed sequences).
    pub sequence_type: String,
    /// Frame timing declaration (e.g. `50 ms`).
    pub sequence_timing: String,
}

impl Default for SequenceHead {
    fn default() -> Self {
        Self {
            version: "2024.20".to_owned(),
            media_file: String::new(),
            duration_ms: 0,
            song: String::new(),
            artist: String::new(),
            sequence_type: "Media".to_owned(),
            sequence_timing: "50 ms".to_owned(),
        }
    }
}

/// Deduplicated table of effect settings strings, referenced by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EffectDb {
    /// Ordered unique settings strings.
    pub entries: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl EffectDb {
    /// Interns a settings string, returning its stable index. Identical
    /// strings share one entry.
    pub fn intern(&mut self, settings: String) -> usize {
        if let Some(&existing) = self.index.get(&settings) {
            return existing;
        }
        let next = self.entries.len();
        self.index.insert(settings.clone(), next);
        self.entries.push(settings);
        next
    }

    /// Rebuilds the lookup index after deserialization or parsing.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
    }

    /// The settings string at an index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }
}

/// Kind of a sequence element.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum ElementType {
    /// A model (fixture) element carrying DMX effects.
    Model,
    /// A timing track carrying labeled markers.
    Timing,
}

/// A declared element in `<DisplayElements>`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DisplayElement {
    /// Element kind.
    pub element_type: ElementType,
    /// Element name.
    pub name: String,
}

/// One effect placement on a layer.
///
/// Unknown attributes read from a file are preserved in `parameters` so a
/// parse → emit round-trip keeps them.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Effect {
    /// Index into the [`EffectDb`], for model effects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_index: Option<usize>,
    /// Effect name (`DMX` for the effects this crate emits).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Marker label, for timing effects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Start time in milliseconds.
    pub start_ms: i64,
    /// End time in milliseconds.
    pub end_ms: i64,
    /// Palette reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<String>,
    /// Attributes not modeled here, preserved for round-trip.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// One layer of effects on an element, ascending by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EffectLayer {
    /// Effects on this layer.
    pub effects: Vec<Effect>,
}

/// One element of `<ElementEffects>`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Element {
    /// Element kind.
    pub element_type: ElementType,
    /// Element name (the xLights model name).
    pub name: String,
    /// Effect layers.
    pub layers: Vec<EffectLayer>,
}

/// A complete xLights sequence document.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct XSequence {
    /// Sequence metadata.
    pub head: SequenceHead,
    /// Interned settings strings.
    pub effect_db: EffectDb,
    /// Declared elements.
    pub display_elements: Vec<DisplayElement>,
    /// Per-element effect tables, in rig order.
    pub elements: Vec<Element>,
}

impl XSequence {
    /// Creates a sequence with the given head.
    #[must_use]
    pub fn new(head: SequenceHead) -> Self {
        Self {
            head,
            ..Self::default()
        }
    }

    /// Finds an element by name.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Ensures an element (and its declaration) exists, returning its index.
    pub fn ensure_element(&mut self, element_type: ElementType, name: &str) -> usize {
        if let Some(pos) = self.elements.iter().position(|e| e.name == name) {
            return pos;
        }
        self.display_elements.push(DisplayElement {
            element_type,
            name: name.to_owned(),
        });
        self.elements.push(Element {
            element_type,
            name: name.to_owned(),
            layers: vec![EffectLayer::default()],
        });
        self.elements.len() - 1
    }

    /// Appends an effect to an element's layer, creating the element and any
    /// missing layers on demand.
    pub fn add_effect(
        &mut self,
        element_type: ElementType,
        element_name: &str,
        layer: usize,
        effect: Effect,
    ) {
        let index = self.ensure_element(element_type, element_name);
        let element = &mut self.elements[index];
        while element.layers.len() <= layer {
            element.layers.push(EffectLayer::default());
        }
        element.layers[layer].effects.push(effect);
    }

    /// Checks that element names are unique, which xLights requires.
    ///
    /// # Errors
    ///
    /// [`EmissionError::DuplicateElement`] naming the first duplicate.
    pub fn check_unique_elements(&self) -> Result<(), EmissionError> {
        let mut seen = std::collections::HashSet::new();
        for element in &self.elements {
            if !seen.insert(&element.name) {
                return Err(EmissionError::DuplicateElement(element.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn interning_dedupes() {
        let mut db = EffectDb::default();
        let a = db.intern("X=1".to_owned());
        let b = db.intern("X=2".to_owned());
        let c = db.intern("X=1".to_owned());
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(db.entries.len(), 2);
    }

    #[test]
    fn ensure_element_is_idempotent() {
        let mut xsq = XSequence::default();
        let first = xsq.ensure_element(ElementType::Model, "Dmx MH1");
        let second = xsq.ensure_element(ElementType::Model, "Dmx MH1");
        assert_eq!(first, second);
        assert_eq!(xsq.elements.len(), 1);
        assert_eq!(xsq.display_elements.len(), 1);
    }

    #[test]
    fn duplicate_elements_detected() {
        let mut xsq = XSequence::default();
        xsq.elements.push(Element {
            element_type: ElementType::Model,
            name: "A".into(),
            layers: Vec::new(),
        });
        xsq.elements.push(Element {
            element_type: ElementType::Model,
            name: "A".into(),
            layers: Vec::new(),
        });
        assert_eq!(
            xsq.check_unique_elements(),
            Err(EmissionError::DuplicateElement("A".into()))
        );
    }
}
