//! Template and step models.

use std::collections::BTreeMap;

use crate::transition::TransitionHint;

use super::TemplateError;

/// Timing of one step, in bars.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StepTiming {
    /// Step length in bars, scaled proportionally across the section window.
    pub duration_bars: f64,
}

impl Default for StepTiming {
    fn default() -> Self {
        Self { duration_bars: 1.0 }
    }
}

/// One step of a template: movement, optional geometry, dimmer and timing.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternStep {
    /// Step identifier, unique within the template.
    pub step_id: String,
    /// Movement pattern id from the movement library.
    pub movement_id: String,
    /// Geometry id from the geometry library, when the step is spatial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_id: Option<String>,
    /// Dimmer pattern id from the dimmer library.
    pub dimmer_id: String,
    /// Step timing.
    #[serde(default)]
    pub timing: StepTiming,
    /// Easing into this step from whatever precedes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_transition: Option<TransitionHint>,
    /// Easing out of this step into whatever follows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_transition: Option<TransitionHint>,
    /// Free-form step parameters (`tightness`, `pan_spread_deg`, ...).
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl PatternStep {
    /// A step with default timing and no geometry.
    #[must_use]
    pub fn new(step_id: &str, movement_id: &str, dimmer_id: &str) -> Self {
        Self {
            step_id: step_id.to_owned(),
            movement_id: movement_id.to_owned(),
            geometry_id: None,
            dimmer_id: dimmer_id.to_owned(),
            timing: StepTiming::default(),
            entry_transition: None,
            exit_transition: None,
            params: BTreeMap::new(),
        }
    }
}

/// A named, versioned recipe of steps.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Template {
    /// Identifier referenced by plan sections.
    pub template_id: String,
    /// Schema/content version.
    pub version: u32,
    /// Human-readable name.
    pub name: String,
    /// Ordered steps.
    pub steps: Vec<PatternStep>,
    /// Free-form annotations.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Template {
    /// Checks the template's own structural invariants.
    ///
    /// # Errors
    ///
    /// [`TemplateError::EmptySteps`] or [`TemplateError::BadStepDuration`].
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.steps.is_empty() {
            return Err(TemplateError::EmptySteps(self.template_id.clone()));
        }
        for step in &self.steps {
            if !(step.timing.duration_bars.is_finite() && step.timing.duration_bars > 0.0) {
                return Err(TemplateError::BadStepDuration {
                    template_id: self.template_id.clone(),
                    step_id: step.step_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Sum of all step durations in bars.
    #[must_use]
    pub fn total_step_bars(&self) -> f64 {
        self.steps.iter().map(|s| s.timing.duration_bars).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(steps: Vec<PatternStep>) -> Template {
        Template {
            template_id: "t".into(),
            version: 1,
            name: "T".into(),
            steps,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn empty_template_rejected() {
        assert!(matches!(
            template(Vec::new()).validate(),
            Err(TemplateError::EmptySteps(_))
        ));
    }

    #[test]
    fn zero_duration_step_rejected() {
        let mut step = PatternStep::new("s1", "sweep_lr", "pulse");
        step.timing.duration_bars = 0.0;
        assert!(matches!(
            template(vec![step]).validate(),
            Err(TemplateError::BadStepDuration { .. })
        ));
    }

    #[test]
    fn total_bars_sums_steps() {
        let mut a = PatternStep::new("a", "sweep_lr", "pulse");
        a.timing.duration_bars = 2.0;
        let mut b = PatternStep::new("b", "circle", "breathe");
        b.timing.duration_bars = 6.0;
        assert_eq!(template(vec![a, b]).total_step_bars(), 8.0);
    }
}
