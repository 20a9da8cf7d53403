//! Optional macro-level show intent.

use std::path::Path;

use crate::error::ValidationError;

/// Target energy level of a section, used for preset fallback.
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
#[strum(serialize_all = "snake_case")]
pub enum EnergyTarget {
    /// Quiet, restrained movement.
    Low,
    /// Default energy.
    Medium,
    /// Big, fast movement.
    High,
    /// Maximum impact moments (drops, finales).
    Peak,
}

/// A palette reference with optional usage hints.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PaletteRef {
    /// Palette identifier.
    pub palette_id: String,
    /// Global intensity scaler for this palette usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

/// Palette plan: a primary palette plus theme-consistent alternates.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PalettePlan {
    /// Default palette for the song.
    pub primary: PaletteRef,
    /// Alternates allowed for variation.
    #[serde(default)]
    pub alternates: Vec<PaletteRef>,
}

/// Per-section strategy hint.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SectionHint {
    /// Plan section this hint applies to.
    pub section_name: String,
    /// Target energy, mapped to a preset when the section names none.
    pub energy: EnergyTarget,
    /// Free-form style notes.
    #[serde(default)]
    pub style_notes: String,
}

/// High-level show intent produced upstream of the compiler.
///
/// The compiler reads this only to parameterize preset selection and color
/// choices when present; a missing macro plan never fails the pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MacroPlan {
    /// Overarching narrative notes.
    #[serde(default)]
    pub story_notes: String,
    /// Palette plan, when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<PalettePlan>,
    /// Per-section energy and style hints.
    #[serde(default)]
    pub section_hints: Vec<SectionHint>,
}

impl MacroPlan {
    /// The energy hint for a section, when one exists.
    #[must_use]
    pub fn energy_for(&self, section_name: &str) -> Option<EnergyTarget> {
        self.section_hints
            .iter()
            .find(|h| h.section_name == section_name)
            .map(|h| h.energy)
    }

    /// Loads a macro plan from a JSON file.
    ///
    /// # Errors
    ///
    /// [`ValidationError::ConfigRead`] / [`ValidationError::ConfigParse`].
    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path).map_err(|e| ValidationError::ConfigRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ValidationError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_lookup() {
        let plan = MacroPlan {
            story_notes: String::new(),
            palette: None,
            section_hints: vec![SectionHint {
                section_name: "chorus".into(),
                energy: EnergyTarget::Peak,
                style_notes: String::new(),
            }],
        };
        assert_eq!(plan.energy_for("chorus"), Some(EnergyTarget::Peak));
        assert_eq!(plan.energy_for("verse"), None);
    }
}
