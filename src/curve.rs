//! The curve engine: normalized design-space curves and their DMX mapping.
//!
//! Curves are authored in a normalized *design* space: sampling at
//! `t ∈ [0, 1]` yields `v ∈ [0, 1]`. Mapping to DMX integer ranges — with
//! per-channel clamps and inversion — is a separate step ([`map_to_dmx`]),
//! so the same curve can drive a dimmer absolutely or a movement channel as a
//! signed offset around a base position.

mod dmx;
mod generate;
mod native;
mod point;

use thiserror::Error;

pub use dmx::{DmxMapMode, NativeDmxCurve, invert_limits, map_to_dmx};
pub use generate::samples_for_duration;
pub use native::{NativeCurve, NativeKind};
pub use point::CurvePoint;

/// A curve in normalized design space.
///
/// Either a parametric [`NativeCurve`] from the closed kind set, or a custom
/// point list. Both share the contract that sampling at `t ∈ [0, 1]` yields
/// `v ∈ [0, 1]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    /// A parametric curve of a registered kind.
    Native(NativeCurve),
    /// Explicit sampled points, `t` ascending.
    Custom(Vec<CurvePoint>),
}

impl Curve {
    /// Samples the curve at an arbitrary `t ∈ [0, 1]`.
    ///
    /// Native curves evaluate their formula directly; custom curves linearly
    /// interpolate between their recorded points. `t` outside `[0, 1]` clamps.
    #[must_use]
    pub fn sample(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Native(native) => native.eval(t),
            Self::Custom(points) => point::lerp_points(points, t),
        }
    }

    /// Produces `n_samples` points with `t` on a uniform grid in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// [`CurveError::InvalidSampleCount`] when `n_samples < 2`, and
    /// [`CurveError::InvalidCycles`] when a periodic native kind has an
    /// effective cycle count of zero or below.
    pub fn generate(&self, n_samples: usize) -> Result<Vec<CurvePoint>, CurveError> {
        generate::generate(self, n_samples)
    }

    /// Shorthand for a native curve with kind defaults.
    #[must_use]
    pub fn native(kind: NativeKind) -> Self {
        Self::Native(NativeCurve::new(kind))
    }
}

impl From<NativeCurve> for Curve {
    fn from(value: NativeCurve) -> Self {
        Self::Native(value)
    }
}

/// A curve operation failed.
///
/// Out-of-range *parameters* (amplitude above 1, duty outside `[0, 1]`, ...)
/// are not errors: they are preferences and clamp silently.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    /// Fewer than two samples were requested.
    #[error("n_samples must be >= 2, got {0}")]
    InvalidSampleCount(usize),
    /// A periodic kind was given a non-positive effective cycle count.
    #[error("cycles must be > 0, got {0}")]
    InvalidCycles(f64),
    /// A curve name did not resolve to a registered kind.
    #[error("unknown curve kind '{0}'")]
    UnknownCurveKind(String),
}
