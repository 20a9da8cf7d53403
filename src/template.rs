//! Templates: versioned recipes expanded into per-fixture segments.
//!
//! A [`Template`] is a named sequence of [`PatternStep`]s; each step names a
//! movement pattern, an optional geometry, and a dimmer pattern from the
//! registered libraries. [`compile`] expands a template — overlaid with an
//! optional [`Preset`] — against a [`TemplateCompileContext`] into
//! [`crate::segment::FixtureSegment`]s.

mod compile;
mod context;
mod dimmer;
mod geometry;
mod model;
mod movement;
mod preset;
mod registry;

use thiserror::Error;

pub use compile::{CompileOutput, CompileWarning, compile};
pub use context::{FixtureContext, RoleStrategy, TemplateCompileContext};
pub use dimmer::{DimmerPattern, DimmerRegistry, DimmerRender, Intensity, IntensityParams};
pub use geometry::{
    GeometryAssignment, GeometryParams, GeometryRegistry, TiltRole, asymmetric_geometry_ids,
    symmetric_geometry_ids,
};
pub use model::{PatternStep, StepTiming, Template};
pub use movement::{MovementPattern, MovementRegistry};
pub use preset::{Preset, StepOverride};
pub use registry::{TemplateDoc, TemplateRegistry};

/// A template or preset could not be resolved or failed validation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// No template registered under this id.
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
    /// The template exists but has no preset with this id.
    #[error("template '{template_id}' has no preset '{preset_id}'")]
    UnknownPreset {
        /// Template looked up.
        template_id: String,
        /// Missing preset.
        preset_id: String,
    },
    /// No movement pattern registered under this id.
    #[error("unknown movement pattern '{0}'")]
    UnknownMovement(String),
    /// No dimmer pattern registered under this id.
    #[error("unknown dimmer pattern '{0}'")]
    UnknownDimmer(String),
    /// A template file could not be read or was not valid JSON.
    #[error("cannot load template '{template_id}': {message}")]
    Load {
        /// Template being loaded.
        template_id: String,
        /// Underlying message.
        message: String,
    },
    /// A template declared no steps.
    #[error("template '{0}' has no steps")]
    EmptySteps(String),
    /// A step declared a non-positive duration.
    #[error("template '{template_id}' step '{step_id}' has non-positive duration")]
    BadStepDuration {
        /// Owning template.
        template_id: String,
        /// Offending step.
        step_id: String,
    },
    /// Error annotated with a section/step location by the pipeline.
    #[error("{location}: {source}")]
    Located {
        /// `section/step` path.
        location: String,
        /// Underlying error.
        #[source]
        source: Box<TemplateError>,
    },
}

impl TemplateError {
    /// Wraps the error with a `section/step` location for diagnostics.
    #[must_use]
    pub fn with_location(self, location: String) -> Self {
        match self {
            already @ Self::Located { .. } => already,
            other => Self::Located {
                location,
                source: Box::new(other),
            },
        }
    }
}

/// A geometry failure. Misclassification is a correctness bug, so it is fatal
/// rather than recovered.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// No geometry registered under this id.
    #[error("unknown geometry '{0}'")]
    UnknownGeometry(String),
    /// A geometry id appears in both classification sets, or in neither.
    #[error("geometry '{geometry_id}' is misclassified: {reason}")]
    Misclassified {
        /// Offending geometry id.
        geometry_id: String,
        /// What the classification check found.
        reason: String,
    },
}
