//! Per-channel value blending across a transition window.

use std::f64::consts::FRAC_PI_2;

use crate::curve::{Curve, NativeCurve};

use super::TransitionStrategy;

/// Blends one channel at normalized time `t` within the transition.
///
/// `source` and `target` are DMX values; the result is clamped to `[0, 255]`.
#[must_use]
pub fn blend_value(strategy: TransitionStrategy, source: f64, target: f64, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let blended = match strategy {
        TransitionStrategy::Snap => {
            if t < 0.5 {
                source
            } else {
                target
            }
        }
        TransitionStrategy::SmoothInterpolation(kind) => {
            if t <= 0.0 {
                source
            } else if t >= 1.0 {
                target
            } else {
                let factor = Curve::Native(NativeCurve::new(kind)).sample(t);
                source + factor * (target - source)
            }
        }
        TransitionStrategy::Crossfade => {
            let fade_out = (t * FRAC_PI_2).cos();
            let fade_in = (t * FRAC_PI_2).sin();
            source * fade_out + target * fade_in
        }
        TransitionStrategy::FadeViaBlack => {
            if t < 0.5 {
                source * (1.0 - t * 2.0)
            } else {
                target * ((t - 0.5) * 2.0)
            }
        }
        TransitionStrategy::Sequence => {
            if t >= 1.0 {
                target
            } else if t < 0.33 {
                source * (1.0 - t / 0.33)
            } else if t < 0.66 {
                0.0
            } else {
                target * ((t - 0.66) / 0.34)
            }
        }
    };
    blended.clamp(0.0, 255.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::curve::NativeKind;

    use super::*;

    #[test]
    fn snap_switches_at_midpoint() {
        assert_eq!(blend_value(TransitionStrategy::Snap, 10.0, 200.0, 0.49), 10.0);
        assert_eq!(blend_value(TransitionStrategy::Snap, 10.0, 200.0, 0.5), 200.0);
    }

    #[test]
    fn crossfade_edges_are_exact() {
        assert_abs_diff_eq!(
            blend_value(TransitionStrategy::Crossfade, 37.0, 199.0, 0.0),
            37.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            blend_value(TransitionStrategy::Crossfade, 37.0, 199.0, 1.0),
            199.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn crossfade_is_equal_power() {
        let mid = blend_value(TransitionStrategy::Crossfade, 255.0, 255.0, 0.5);
        // cos(π/4) + sin(π/4) = √2: equal-power blends overshoot linear.
        assert_abs_diff_eq!(mid, 255.0, epsilon = 1e-9);
    }

    #[test]
    fn fade_via_black_hits_zero_at_midpoint() {
        for (source, target) in [(255.0, 255.0), (10.0, 250.0), (0.0, 1.0)] {
            assert_eq!(
                blend_value(TransitionStrategy::FadeViaBlack, source, target, 0.5),
                0.0
            );
        }
    }

    #[test]
    fn sequence_phases() {
        let s = TransitionStrategy::Sequence;
        assert_eq!(blend_value(s, 200.0, 100.0, 0.0), 200.0);
        assert_eq!(blend_value(s, 200.0, 100.0, 0.5), 0.0);
        assert_eq!(blend_value(s, 200.0, 100.0, 1.0), 100.0);
        assert!(blend_value(s, 200.0, 100.0, 0.9) < 100.0);
    }

    #[test]
    fn smooth_interpolation_edges_are_exact() {
        let s = TransitionStrategy::SmoothInterpolation(NativeKind::SmoothStep);
        assert_eq!(blend_value(s, 42.0, 230.0, 0.0), 42.0);
        assert_eq!(blend_value(s, 42.0, 230.0, 1.0), 230.0);
        let mid = blend_value(s, 0.0, 255.0, 0.5);
        assert_abs_diff_eq!(mid, 127.5, epsilon = 1e-9);
    }

    #[test]
    fn output_clamped_to_dmx_range() {
        let v = blend_value(TransitionStrategy::Crossfade, 255.0, 255.0, 0.25);
        assert!(v <= 255.0);
    }
}
