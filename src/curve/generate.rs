//! Uniform-grid sampling of curves.

use super::{Curve, CurveError, CurvePoint, point};

/// Samples a curve into `n_samples` points on a uniform `t` grid.
pub(crate) fn generate(curve: &Curve, n_samples: usize) -> Result<Vec<CurvePoint>, CurveError> {
    if n_samples < 2 {
        return Err(CurveError::InvalidSampleCount(n_samples));
    }
    if let Curve::Native(native) = curve
        && native.kind.is_periodic()
    {
        let cycles = native.effective_cycles();
        if cycles <= 0.0 {
            return Err(CurveError::InvalidCycles(cycles));
        }
    }

    let last = (n_samples - 1) as f64;
    let points = (0..n_samples)
        .map(|i| {
            let t = i as f64 / last;
            let v = match curve {
                Curve::Native(native) => native.eval(t),
                Curve::Custom(custom) => point::lerp_points(custom, t),
            };
            CurvePoint::new(t, v)
        })
        .collect();
    Ok(points)
}

/// Point count tuned to a segment's duration: roughly ten points per second,
/// clamped to 20..=300 so short segments stay smooth and long holds stay small.
#[must_use]
pub fn samples_for_duration(duration_ms: i64) -> usize {
    ((duration_ms as f64 / 1_000.0 * 10.0) as usize).clamp(20, 300)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::curve::{NativeCurve, NativeKind};

    use super::*;

    #[test]
    fn rejects_single_sample() {
        let err = Curve::native(NativeKind::Linear).generate(1).unwrap_err();
        assert_eq!(err, CurveError::InvalidSampleCount(1));
    }

    #[test]
    fn rejects_zero_cycles() {
        let curve = Curve::Native(NativeCurve::new(NativeKind::Sine).with_cycles(0.0));
        let err = curve.generate(16).unwrap_err();
        assert_eq!(err, CurveError::InvalidCycles(0.0));
    }

    #[test]
    fn uniform_grid_with_anchored_ends() {
        let points = Curve::native(NativeKind::Linear).generate(5).unwrap();
        let ts: Vec<f64> = points.iter().map(|p| p.t).collect();
        assert_eq!(ts, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(points[0].v, 0.0);
        assert_eq!(points[4].v, 1.0);
    }

    #[test]
    fn custom_curve_resamples_by_interpolation() {
        let custom = Curve::Custom(vec![
            CurvePoint::new(0.0, 0.0),
            CurvePoint::new(0.5, 1.0),
            CurvePoint::new(1.0, 0.0),
        ]);
        let points = custom.generate(5).unwrap();
        assert_eq!(points[1].v, 0.5);
        assert_eq!(points[2].v, 1.0);
        assert_eq!(points[3].v, 0.5);
    }

    #[test]
    fn duration_tuning_bounds() {
        assert_eq!(samples_for_duration(100), 20);
        assert_eq!(samples_for_duration(5_000), 50);
        assert_eq!(samples_for_duration(120_000), 300);
    }
}
