//! Value-curve string grammar and fixed-point formatting.

use crate::curve::{CurvePoint, NativeDmxCurve, NativeKind};

/// Formats a value with a fixed number of decimals, TRUNCATING rather than
/// rounding, with a locale-independent formatter.
///
/// Value-curve strings are compared byte-for-byte across the xLights
/// ecosystem, and the ecosystem truncates.
#[must_use]
pub fn fmt_trunc(value: f64, decimals: u32) -> String {
    let factor = 10f64.powi(decimals as i32);
    // The epsilon absorbs binary representation error (0.29 × 100 is
    // 28.999...96 in f64) without ever carrying a true truncation over.
    let truncated = ((value * factor) + 1e-9).trunc() / factor;
    format!("{truncated:.prec$}", prec = decimals as usize)
}

/// The `Type=` name xLights uses for a native kind, when one exists.
///
/// Kinds without an xLights native equivalent serialize as sampled custom
/// curves instead.
#[must_use]
pub fn xlights_type_name(kind: NativeKind) -> Option<&'static str> {
    match kind {
        NativeKind::Sine => Some("Sine"),
        NativeKind::AbsSine => Some("Abs Sine"),
        NativeKind::Ramp => Some("Ramp"),
        NativeKind::SawTooth => Some("Saw Tooth"),
        NativeKind::Square => Some("Square"),
        _ => None,
    }
}

/// Builds a native value-curve string.
///
/// Shape: `Active=TRUE|Id=ID_VALUECURVE_DMX{ch}|Type={name}|Min=0.00|`
/// `Max=255.00|RV=FALSE|P1=…|P2=…|P3=…|P4=…|` with parameter values in two
/// truncated decimals and a trailing pipe.
#[must_use]
pub fn native_value_curve_string(channel: u16, curve: &NativeDmxCurve) -> Option<String> {
    let type_name = xlights_type_name(curve.kind)?;
    Some(format!(
        "Active=TRUE|Id=ID_VALUECURVE_DMX{channel}|Type={type_name}|Min=0.00|Max=255.00|RV=FALSE|P1={}|P2={}|P3={}|P4={}|",
        fmt_trunc(curve.p1, 2),
        fmt_trunc(curve.p2, 2),
        fmt_trunc(curve.p3, 2),
        fmt_trunc(curve.p4, 2),
    ))
}

/// Builds a custom value-curve string from normalized points.
///
/// Times carry four truncated decimals, values two; anchor points at `t=0.00`
/// and `t=1.00` are inserted when missing, reusing the first/last recorded
/// value. The string ends with a trailing pipe.
#[must_use]
pub fn custom_value_curve_string(channel: u16, points: &[CurvePoint]) -> String {
    let mut pairs: Vec<String> = Vec::with_capacity(points.len() + 2);
    if let Some(first) = points.first()
        && first.t > 0.0005
    {
        pairs.push(format!("0.0000:{}", fmt_trunc(first.v, 2)));
    }
    for point in points {
        pairs.push(format!(
            "{}:{}",
            fmt_trunc(point.t, 4),
            fmt_trunc(point.v, 2)
        ));
    }
    if let Some(last) = points.last()
        && last.t < 0.9995
    {
        pairs.push(format!("1.0000:{}", fmt_trunc(last.v, 2)));
    }
    format!(
        "Active=TRUE|Id=ID_VALUECURVE_DMX{channel}|Type=Custom|Min=0.00|Max=255.00|RV=FALSE|Values={}|",
        pairs.join(";")
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn truncation_not_rounding() {
        assert_eq!(fmt_trunc(0.999, 2), "0.99");
        assert_eq!(fmt_trunc(0.995, 2), "0.99");
        assert_eq!(fmt_trunc(128.0, 2), "128.00");
        assert_eq!(fmt_trunc(0.29, 2), "0.29");
        assert_eq!(fmt_trunc(0.123_456, 4), "0.1234");
    }

    #[test]
    fn native_sine_string_shape() {
        let curve = NativeDmxCurve::sine(128.0, 60.0, 2.0, 0.0);
        let s = native_value_curve_string(3, &curve).unwrap();
        assert_eq!(
            s,
            "Active=TRUE|Id=ID_VALUECURVE_DMX3|Type=Sine|Min=0.00|Max=255.00|RV=FALSE|P1=128.00|P2=60.00|P3=2.00|P4=0.00|"
        );
    }

    #[test]
    fn custom_string_inserts_anchors() {
        let points = [CurvePoint::new(0.25, 0.5), CurvePoint::new(0.75, 0.8)];
        let s = custom_value_curve_string(1, &points);
        assert!(s.contains("Values=0.0000:0.50;0.2500:0.50;0.7500:0.80;1.0000:0.80|"));
        assert!(s.ends_with('|'));
    }

    #[test]
    fn custom_string_keeps_existing_anchors() {
        let points = [CurvePoint::new(0.0, 0.1), CurvePoint::new(1.0, 0.9)];
        let s = custom_value_curve_string(1, &points);
        assert!(s.contains("Values=0.0000:0.10;1.0000:0.90|"));
    }

    #[test]
    fn unmappable_kind_has_no_native_name() {
        assert_eq!(xlights_type_name(NativeKind::SmoothStep), None);
        let curve = NativeDmxCurve {
            kind: NativeKind::SmoothStep,
            p1: 0.0,
            p2: 255.0,
            p3: 0.0,
            p4: 0.0,
        };
        assert_eq!(native_value_curve_string(1, &curve), None);
    }
}
