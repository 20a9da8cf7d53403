//! Parametric native curves.

use std::f64::consts::PI;

/// The closed set of native curve kinds.
///
/// Parameter meanings are kind-specific; see [`NativeCurve`] for the slot
/// conventions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NativeKind {
    /// Identity ramp `v = t`.
    Linear,
    /// Constant value (`p1`).
    Hold,
    /// Sine wave centered on 0.5.
    Sine,
    /// Cosine wave centered on 0.5 (peak at `t = 0`).
    Cosine,
    /// Triangle wave `0 → 1 → 0` per cycle, centered on 0.5.
    Triangle,
    /// Pulse wave with configurable duty (`p5`).
    Pulse,
    /// Pulse wave with fixed 50% duty.
    Square,
    /// Hermite smooth step `3t² − 2t³`.
    SmoothStep,
    /// Perlin smoother step `6t⁵ − 15t⁴ + 10t³`.
    SmootherStep,
    /// Sigmoid easing with steepness `p1`.
    SCurve,
    /// Straight ramp from `p1` to `p2`.
    Ramp,
    /// Arch `4t(1 − t)`, peaked at the midpoint.
    Parabolic,
    /// Rising sawtooth per cycle, centered on 0.5.
    SawTooth,
    /// Rectified sine `|sin|`, troughs at 0.
    AbsSine,
    /// Power ease-in `t^p1`.
    Exponential,
    /// Logarithmic ease-out `ln(1 + p1·t) / ln(1 + p1)`.
    Logarithmic,
}

impl NativeKind {
    /// Whether this kind repeats and therefore requires a positive effective
    /// cycle count.
    #[must_use]
    pub fn is_periodic(self) -> bool {
        matches!(
            self,
            Self::Sine
                | Self::Cosine
                | Self::Triangle
                | Self::Pulse
                | Self::Square
                | Self::SawTooth
                | Self::AbsSine
        )
    }

    /// Whether this kind reads as a signed offset around 0.5 when driving a
    /// movement channel.
    #[must_use]
    pub fn is_offset_centered(self) -> bool {
        matches!(
            self,
            Self::Sine | Self::Cosine | Self::Triangle | Self::SawTooth
        )
    }
}

/// A native curve: a kind plus its fixed parameter block.
///
/// The parameter array keeps sampling branch-free; slots have per-kind meaning:
///
/// | kind family | `p1` | `p2` | `p3` | `p4` | `p5` |
/// |---|---|---|---|---|---|
/// | periodic (sine, cosine, triangle, sawtooth, abs_sine) | base cycles | frequency multiplier | amplitude | phase (radians) | — |
/// | pulse, square | base cycles | frequency multiplier | amplitude | phase | duty |
/// | ramp | from | to | — | — | — |
/// | hold | value | — | — | — | — |
/// | s_curve | steepness | — | — | — | — |
/// | exponential / logarithmic | shape | — | — | — | — |
///
/// The effective cycle count of a periodic curve is `p1 × p2`; amplitude
/// scales around 0.5, so `v(t) = 0.5 + 0.5 · amp · wave(2π·c·t + phase)`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NativeCurve {
    /// Curve kind.
    pub kind: NativeKind,
    /// Kind-specific parameters.
    #[serde(default)]
    pub params: [f64; 5],
}

impl NativeCurve {
    /// Creates a curve with the kind's default parameters.
    #[must_use]
    pub fn new(kind: NativeKind) -> Self {
        let params = match kind {
            NativeKind::Hold => [1.0, 0.0, 0.0, 0.0, 0.0],
            NativeKind::Ramp => [0.0, 1.0, 0.0, 0.0, 0.0],
            NativeKind::SCurve => [12.0, 0.0, 0.0, 0.0, 0.0],
            NativeKind::Exponential => [2.0, 0.0, 0.0, 0.0, 0.0],
            NativeKind::Logarithmic => [9.0, 0.0, 0.0, 0.0, 0.0],
            NativeKind::Pulse | NativeKind::Square => [1.0, 1.0, 1.0, 0.0, 0.5],
            _ => [1.0, 1.0, 1.0, 0.0, 0.0],
        };
        Self { kind, params }
    }

    /// Sets the base cycle count (periodic kinds).
    #[must_use]
    pub fn with_cycles(mut self, cycles: f64) -> Self {
        self.params[0] = cycles;
        self
    }

    /// Sets the frequency multiplier (periodic kinds).
    #[must_use]
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.params[1] = frequency;
        self
    }

    /// Sets the amplitude scaling factor, clamped to `[0, 1]` at evaluation.
    #[must_use]
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.params[2] = amplitude;
        self
    }

    /// Sets the phase offset in radians (periodic kinds).
    #[must_use]
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.params[3] = phase;
        self
    }

    /// Sets the duty fraction (pulse kinds), clamped to `[0, 1]` at evaluation.
    #[must_use]
    pub fn with_duty(mut self, duty: f64) -> Self {
        self.params[4] = duty;
        self
    }

    /// Effective cycle count, `base_cycles × frequency_multiplier`.
    #[must_use]
    pub fn effective_cycles(&self) -> f64 {
        self.params[0] * self.params[1]
    }

    /// Evaluates the curve formula at `t ∈ [0, 1]`.
    ///
    /// Out-of-range parameters are clamped here, not rejected; the result is
    /// always in `[0, 1]`.
    #[must_use]
    pub fn eval(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let amp = self.params[2].clamp(0.0, 1.0);
        let phase = self.params[3];
        let cycles = self.effective_cycles();

        let v = match self.kind {
            NativeKind::Linear => t,
            NativeKind::Hold => self.params[0],
            NativeKind::Sine => 0.5 + 0.5 * amp * (2.0 * PI * cycles * t + phase).sin(),
            NativeKind::Cosine => 0.5 + 0.5 * amp * (2.0 * PI * cycles * t + phase).cos(),
            NativeKind::Triangle => {
                let pos = (t * cycles + phase / (2.0 * PI)).rem_euclid(1.0);
                let raw = if pos < 0.5 {
                    pos * 2.0
                } else {
                    2.0 - pos * 2.0
                };
                0.5 + (raw - 0.5) * amp
            }
            NativeKind::Pulse | NativeKind::Square => {
                let duty = if self.kind == NativeKind::Square {
                    0.5
                } else {
                    self.params[4].clamp(0.0, 1.0)
                };
                let pos = (t * cycles + phase / (2.0 * PI)).rem_euclid(1.0);
                if pos < duty {
                    0.5 + 0.5 * amp
                } else {
                    0.5 - 0.5 * amp
                }
            }
            NativeKind::SmoothStep => t * t * (3.0 - 2.0 * t),
            NativeKind::SmootherStep => t * t * t * (t * (t * 6.0 - 15.0) + 10.0),
            NativeKind::SCurve => {
                let steepness = self.params[0].max(f64::EPSILON);
                1.0 / (1.0 + (-(t - 0.5) * steepness).exp())
            }
            NativeKind::Ramp => {
                let from = self.params[0].clamp(0.0, 1.0);
                let to = self.params[1].clamp(0.0, 1.0);
                from + t * (to - from)
            }
            NativeKind::Parabolic => amp * 4.0 * t * (1.0 - t),
            NativeKind::SawTooth => {
                let pos = (t * cycles + phase / (2.0 * PI)).rem_euclid(1.0);
                0.5 + (pos - 0.5) * amp
            }
            NativeKind::AbsSine => amp * (2.0 * PI * cycles * t + phase).sin().abs(),
            NativeKind::Exponential => {
                let shape = self.params[0].max(f64::EPSILON);
                t.powf(shape)
            }
            NativeKind::Logarithmic => {
                let drive = self.params[0].max(f64::EPSILON);
                (1.0 + drive * t).ln() / (1.0 + drive).ln()
            }
        };
        v.clamp(0.0, 1.0)
    }
}
