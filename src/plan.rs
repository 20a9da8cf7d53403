//! The choreography plan: what to play, where, and when.
//!
//! A [`ChoreographyPlan`] is the validated input of the pipeline — an ordered
//! list of [`Section`]s, each naming a template, an optional preset, a bar
//! range and a target group. An optional [`MacroPlan`] carries high-level show
//! intent (story, palette, per-section energy hints); the compiler reads it
//! only to parameterize preset choice, and its absence never fails the
//! pipeline.

mod macro_plan;
mod validate;

use std::{collections::BTreeMap, path::Path};

use crate::{error::ValidationError, fixture::PlanTarget};

pub use macro_plan::{EnergyTarget, MacroPlan, PalettePlan, PaletteRef, SectionHint};
pub use validate::ValidatedPlan;

/// A contiguous bar range of the plan using one template.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Section {
    /// Section name, unique within the plan.
    pub name: String,
    /// First bar (1-indexed, inclusive).
    pub start_bar: u32,
    /// Last bar (1-indexed, inclusive).
    pub end_bar: u32,
    /// Template to compile for this section.
    pub template_id: String,
    /// Preset overlay, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    /// Fixture groups or splits this section plays on.
    pub targets: Vec<PlanTarget>,
    /// Free-form template modifiers (`{param}` substitutions and hints).
    #[serde(default)]
    pub modifiers: BTreeMap<String, String>,
}

impl Section {
    /// A section targeting named groups, without preset or modifiers.
    #[must_use]
    pub fn new<const N: usize>(
        name: &str,
        start_bar: u32,
        end_bar: u32,
        template_id: &str,
        group_targets: [&str; N],
    ) -> Self {
        Self {
            name: name.to_owned(),
            start_bar,
            end_bar,
            template_id: template_id.to_owned(),
            preset_id: None,
            targets: group_targets
                .into_iter()
                .map(|g| PlanTarget::Group(g.to_owned()))
                .collect(),
            modifiers: BTreeMap::new(),
        }
    }

    /// Number of bars this section covers.
    #[must_use]
    pub fn duration_bars(&self) -> u32 {
        self.end_bar.saturating_sub(self.start_bar) + 1
    }
}

/// The full choreography of one song.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChoreographyPlan {
    /// Ordered sections covering a contiguous bar range.
    pub sections: Vec<Section>,
    /// One-line description of the overall approach.
    #[serde(default)]
    pub overall_strategy: String,
}

impl ChoreographyPlan {
    /// Creates a plan from sections.
    #[must_use]
    pub fn new(sections: Vec<Section>, overall_strategy: impl Into<String>) -> Self {
        Self {
            sections,
            overall_strategy: overall_strategy.into(),
        }
    }

    /// Loads a plan from a JSON file.
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

    /// Validates structural invariants against a song length.
    ///
    /// See [`ValidatedPlan`] for the checks performed.
    ///
    /// # Errors
    ///
    /// The first violated [`ValidationError`].
    pub fn validate(self, total_bars: u32) -> Result<ValidatedPlan, ValidationError> {
        ValidatedPlan::check(self, total_bars)
    }
}
