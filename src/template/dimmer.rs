//! The dimmer pattern library and its handlers.

use std::collections::HashMap;

use crate::{
    curve::{Curve, CurveError, CurvePoint, NativeCurve, NativeKind},
    timing::BeatGrid,
};

use super::TemplateError;

/// Categorical intensity selecting a pattern's parameter set.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intensity {
    /// Low contrast, slow periods.
    Subtle,
    /// Default contrast.
    #[default]
    Smooth,
    /// Full contrast, fast periods.
    Dramatic,
}

/// One intensity's parameters for a dimmer pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityParams {
    /// Lowest output of the pattern, DMX.
    pub min_intensity: u8,
    /// Highest output of the pattern, DMX.
    pub max_intensity: u8,
    /// Pattern period in bars; 0 for aperiodic patterns.
    pub period_bars: f64,
}

/// What a dimmer handler produced for a step.
#[derive(Debug, Clone, PartialEq)]
pub enum DimmerRender {
    /// A constant level.
    Static(u8),
    /// A normalized curve over the step window.
    Curve(Vec<CurvePoint>),
}

/// A dimmer pattern: a curve shape plus per-intensity parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DimmerPattern {
    /// Pattern identifier.
    pub dimmer_id: String,
    /// Curve shape; `None` renders a static hold at `max_intensity`.
    pub curve: Option<NativeKind>,
    /// Parameters at [`Intensity::Subtle`].
    pub subtle: IntensityParams,
    /// Parameters at [`Intensity::Smooth`].
    pub smooth: IntensityParams,
    /// Parameters at [`Intensity::Dramatic`].
    pub dramatic: IntensityParams,
}

impl DimmerPattern {
    /// The parameter set for an intensity.
    #[must_use]
    pub fn params_for(&self, intensity: Intensity) -> IntensityParams {
        match intensity {
            Intensity::Subtle => self.subtle,
            Intensity::Smooth => self.smooth,
            Intensity::Dramatic => self.dramatic,
        }
    }

    /// Renders the pattern over a step window.
    ///
    /// `min_norm`/`max_norm` bound the normalized output; when the pattern has
    /// a bar-denominated period it converts to a cycle count as
    /// `duration_ms / (period_bars · ms_per_bar)`.
    ///
    /// # Errors
    ///
    /// Propagates [`CurveError`] from curve generation; the caller recovers
    /// per-segment.
    pub fn render(
        &self,
        intensity: Intensity,
        min_norm: f64,
        max_norm: f64,
        duration_ms: i64,
        grid: &BeatGrid,
        n_samples: usize,
    ) -> Result<DimmerRender, CurveError> {
        let params = self.params_for(intensity);
        let lo = min_norm.clamp(0.0, 1.0);
        let hi = max_norm.clamp(lo, 1.0);

        let Some(kind) = self.curve else {
            let level = f64::from(params.max_intensity) / 255.0;
            let scaled = lo + level * (hi - lo);
            return Ok(DimmerRender::Static((scaled * 255.0).round() as u8));
        };

        let mut native = NativeCurve::new(kind);
        if kind.is_periodic() {
            let cycles = if params.period_bars > 0.0 {
                duration_ms as f64 / (params.period_bars * grid.ms_per_bar())
            } else {
                1.0
            };
            if cycles <= 0.0 {
                return Err(CurveError::InvalidCycles(cycles));
            }
            native = native.with_cycles(cycles).with_frequency(1.0);
        }
        if kind == NativeKind::Pulse && self.dimmer_id == "strobe" {
            native = native.with_duty(0.2);
        }

        let base = Curve::Native(native).generate(n_samples)?;
        let min_i = f64::from(params.min_intensity) / 255.0;
        let max_i = f64::from(params.max_intensity) / 255.0;
        let points = base
            .into_iter()
            .map(|p| {
                let intensity_value = min_i + p.v * (max_i - min_i);
                CurvePoint::new(p.t, lo + intensity_value * (hi - lo))
            })
            .collect();
        Ok(DimmerRender::Curve(points))
    }
}

/// The registry of dimmer patterns, keyed by id.
#[derive(Debug, Clone)]
pub struct DimmerRegistry {
    patterns: HashMap<String, DimmerPattern>,
}

fn uniform(min_intensity: u8, max_intensity: u8, period_bars: f64) -> IntensityParams {
    IntensityParams {
        min_intensity,
        max_intensity,
        period_bars,
    }
}

impl DimmerRegistry {
    /// Builds the registry of builtin dimmer patterns.
    #[must_use]
    pub fn builtins() -> Self {
        let mut registry = Self {
            patterns: HashMap::new(),
        };
        registry.register(DimmerPattern {
            dimmer_id: "hold".into(),
            curve: None,
            subtle: uniform(0, 150, 0.0),
            smooth: uniform(0, 220, 0.0),
            dramatic: uniform(0, 255, 0.0),
        });
        registry.register(DimmerPattern {
            dimmer_id: "pulse".into(),
            curve: Some(NativeKind::Pulse),
            subtle: uniform(90, 180, 2.0),
            smooth: uniform(60, 220, 1.0),
            dramatic: uniform(20, 255, 0.5),
        });
        registry.register(DimmerPattern {
            dimmer_id: "breathe".into(),
            curve: Some(NativeKind::Sine),
            subtle: uniform(110, 190, 4.0),
            smooth: uniform(80, 230, 2.0),
            dramatic: uniform(40, 255, 1.0),
        });
        registry.register(DimmerPattern {
            dimmer_id: "ramp_up".into(),
            curve: Some(NativeKind::Ramp),
            subtle: uniform(40, 170, 0.0),
            smooth: uniform(20, 230, 0.0),
            dramatic: uniform(0, 255, 0.0),
        });
        registry.register(DimmerPattern {
            dimmer_id: "strobe".into(),
            curve: Some(NativeKind::Pulse),
            subtle: uniform(0, 170, 0.5),
            smooth: uniform(0, 230, 0.25),
            dramatic: uniform(0, 255, 0.125),
        });
        registry
    }

    /// Registers (or replaces) a pattern.
    pub fn register(&mut self, pattern: DimmerPattern) {
        self.patterns.insert(pattern.dimmer_id.clone(), pattern);
    }

    /// Resolves a dimmer id.
    ///
    /// # Errors
    ///
    /// [`TemplateError::UnknownDimmer`] when the id is not registered.
    pub fn resolve(&self, dimmer_id: &str) -> Result<&DimmerPattern, TemplateError> {
        self.patterns
            .get(dimmer_id)
            .ok_or_else(|| TemplateError::UnknownDimmer(dimmer_id.to_owned()))
    }

    /// Whether an id is registered.
    #[must_use]
    pub fn has(&self, dimmer_id: &str) -> bool {
        self.patterns.contains_key(dimmer_id)
    }

    /// All registered ids, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
