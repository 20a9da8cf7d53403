//! Presets: structural overlays over templates.

use std::collections::BTreeMap;

use crate::transition::TransitionHint;

use super::{Intensity, StepTiming, Template};

/// Field overrides for one step.
///
/// `None` fields leave the step untouched; set fields replace the step's
/// value. Replacement (rather than accumulation) is what makes preset
/// application idempotent.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StepOverride {
    /// Swap the movement pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_id: Option<String>,
    /// Swap the geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_id: Option<String>,
    /// Swap the dimmer pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimmer_id: Option<String>,
    /// Replace the step timing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<StepTiming>,
    /// Replace the entry transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_transition: Option<TransitionHint>,
    /// Replace the exit transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_transition: Option<TransitionHint>,
    /// Merge these parameters over the step's (same key replaces).
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

/// A structural overlay mutating specific fields of a template.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Preset {
    /// Identifier referenced by plan sections.
    pub preset_id: String,
    /// Human-readable name.
    pub name: String,
    /// Per-step overrides, keyed by step id.
    #[serde(default)]
    pub step_overrides: BTreeMap<String, StepOverride>,
    /// Overall intensity override for dimmer rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,
}

impl Preset {
    /// Applies the overlay, producing a fresh template. The input is not
    /// mutated, and applying the same preset twice yields the same result.
    #[must_use]
    pub fn apply(&self, template: &Template) -> Template {
        let mut merged = template.clone();
        for step in &mut merged.steps {
            let Some(over) = self.step_overrides.get(&step.step_id) else {
                continue;
            };
            if let Some(movement_id) = &over.movement_id {
                step.movement_id = movement_id.clone();
            }
            if let Some(geometry_id) = &over.geometry_id {
                step.geometry_id = Some(geometry_id.clone());
            }
            if let Some(dimmer_id) = &over.dimmer_id {
                step.dimmer_id = dimmer_id.clone();
            }
            if let Some(timing) = over.timing {
                step.timing = timing;
            }
            if let Some(entry) = &over.entry_transition {
                step.entry_transition = Some(entry.clone());
            }
            if let Some(exit) = &over.exit_transition {
                step.exit_transition = Some(exit.clone());
            }
            for (key, value) in &over.params {
                step.params.insert(key.clone(), *value);
            }
        }
        merged
    }
}
