//! Mapping design-space curves into DMX space.
//!
//! Two representations leave this module: re-normalized point lists (DMX value
//! divided by 255, ready for xLights custom value-curve emission) and
//! [`NativeDmxCurve`] parameter blocks (ready for native value-curve emission).

use super::{CurvePoint, NativeKind};

/// How a design-space value becomes a DMX byte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DmxMapMode {
    /// Dimmer-style: `v` scales the clamp interval directly,
    /// `dmx = clamp_min + v · (clamp_max − clamp_min)`.
    Absolute,
    /// Movement-style: `v` reads as a signed offset around 0.5 combined with a
    /// base position, `dmx = base + amplitude · (v − 0.5)`, clamped to the
    /// clamp interval.
    OffsetCentered {
        /// Center DMX position.
        base_dmx: f64,
        /// Peak-to-center DMX swing.
        amplitude_dmx: f64,
    },
}

/// Converts design-space points to DMX space and re-normalizes by 255 for
/// xLights output.
///
/// When `inverted` is set, each produced DMX value `x` is replaced with
/// `255 − x` before re-normalizing.
#[must_use]
pub fn map_to_dmx(
    points: &[CurvePoint],
    mode: DmxMapMode,
    clamp_min: u8,
    clamp_max: u8,
    inverted: bool,
) -> Vec<CurvePoint> {
    let lo = f64::from(clamp_min);
    let hi = f64::from(clamp_max);
    points
        .iter()
        .map(|point| {
            let dmx = match mode {
                DmxMapMode::Absolute => (lo + point.v * (hi - lo)).clamp(0.0, 255.0),
                DmxMapMode::OffsetCentered {
                    base_dmx,
                    amplitude_dmx,
                } => (base_dmx + amplitude_dmx * (point.v - 0.5)).clamp(lo, hi),
            };
            let dmx = if inverted { 255.0 - dmx } else { dmx };
            CurvePoint {
                t: point.t,
                v: dmx / 255.0,
            }
        })
        .collect()
}

/// Translates a clamp interval into post-inversion space.
///
/// Tuning against an inverted channel must honor the hardware constraints as
/// the fixture sees them, i.e. after `255 − x`.
#[must_use]
pub fn invert_limits(min_limit: f64, max_limit: f64) -> (f64, f64) {
    (255.0 - max_limit, 255.0 - min_limit)
}

/// A native value curve in DMX space, as xLights serializes it.
///
/// Parameter slots follow the xLights conventions the serializer emits:
/// the sine family carries `p1 = center`, `p2 = amplitude`, `p3 = cycles`,
/// `p4 = phase`; the ramp family carries `p1 = start`, `p2 = end`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NativeDmxCurve {
    /// Curve kind.
    pub kind: NativeKind,
    /// First kind-specific DMX parameter.
    pub p1: f64,
    /// Second kind-specific DMX parameter.
    pub p2: f64,
    /// Third kind-specific DMX parameter.
    pub p3: f64,
    /// Fourth kind-specific DMX parameter.
    pub p4: f64,
}

impl NativeDmxCurve {
    /// A sine-family curve from center/amplitude/cycles/phase.
    #[must_use]
    pub fn sine(center: f64, amplitude: f64, cycles: f64, phase: f64) -> Self {
        Self {
            kind: NativeKind::Sine,
            p1: center,
            p2: amplitude,
            p3: cycles,
            p4: phase,
        }
    }

    /// A ramp from `start` to `end` DMX.
    #[must_use]
    pub fn ramp(start: f64, end: f64) -> Self {
        Self {
            kind: NativeKind::Ramp,
            p1: start,
            p2: end,
            p3: 0.0,
            p4: 0.0,
        }
    }

    /// Whether the kind carries center/amplitude parameters.
    #[must_use]
    pub fn is_sine_family(&self) -> bool {
        matches!(
            self.kind,
            NativeKind::Sine | NativeKind::Cosine | NativeKind::AbsSine | NativeKind::Triangle
        )
    }

    /// Adjusts the curve so the resulting DMX range lies inside
    /// `[min_limit, max_limit]`.
    ///
    /// Sine-family: with amplitude `A` and center `C`, when `C − A < min` or
    /// `C + A > max`, the curve is re-centered at `(min + max) / 2` with
    /// amplitude `(max − min) / 2`. Ramp-family: endpoints clamp to the
    /// interval. Pass post-inversion limits (see [`invert_limits`]) for
    /// inverted channels.
    #[must_use]
    pub fn tuned(self, min_limit: f64, max_limit: f64) -> Self {
        let mut tuned = self;
        if self.is_sine_family() {
            let center = self.p1;
            let amplitude = self.p2.abs();
            if center - amplitude < min_limit || center + amplitude > max_limit {
                tuned.p1 = (min_limit + max_limit) / 2.0;
                tuned.p2 = (max_limit - min_limit) / 2.0;
            }
        } else {
            tuned.p1 = self.p1.clamp(min_limit, max_limit);
            tuned.p2 = self.p2.clamp(min_limit, max_limit);
        }
        tuned
    }
}
