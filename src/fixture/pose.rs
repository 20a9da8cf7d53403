//! Physical orientation of a fixture.

/// Pan/tilt orientation in degrees.
///
/// `pan_deg` 0° is forward, positive toward stage right; `tilt_deg` 0° is the
/// horizon, positive up. Pan normalizes to `[-180, 180)` at construction, so
/// adding any multiple of 360° produces the same pose.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pose {
    /// Pan angle in degrees, normalized to `[-180, 180)`.
    pub pan_deg: f64,
    /// Tilt angle in degrees.
    pub tilt_deg: f64,
}

impl Pose {
    /// Creates a pose, normalizing pan into `[-180, 180)`.
    #[must_use]
    pub fn new(pan_deg: f64, tilt_deg: f64) -> Self {
        Self {
            pan_deg: normalize_pan(pan_deg),
            tilt_deg,
        }
    }

    /// The canonical rest pose used by gap fill.
    #[must_use]
    pub fn soft_home() -> Self {
        Self {
            pan_deg: 0.0,
            tilt_deg: 0.0,
        }
    }
}

/// Normalizes a pan angle into `[-180, 180)`.
#[must_use]
pub fn normalize_pan(pan_deg: f64) -> f64 {
    let wrapped = pan_deg.rem_euclid(360.0);
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Mounting position and aim offset of one fixture.
///
/// Fixtures mounted at different spots need different poses to aim at the same
/// target. Carries BOTH the 1-based position number and the 0-based list index
/// explicitly; nothing ever infers one from the other.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FixturePosition {
    /// 1-based position number on the mount.
    pub position_index: u8,
    /// 0-based index in the rig's fixture list.
    pub index: usize,
    /// Pan offset from forward in degrees.
    #[serde(default)]
    pub pan_offset_deg: f64,
    /// Tilt offset from horizon in degrees.
    #[serde(default)]
    pub tilt_offset_deg: f64,
}

impl FixturePosition {
    /// Applies the mounting offset to a target pose, producing the pose the
    /// fixture must actually take to aim there.
    #[must_use]
    pub fn apply_offset(&self, pose: Pose) -> Pose {
        Pose::new(
            pose.pan_deg + self.pan_offset_deg,
            pose.tilt_deg + self.tilt_offset_deg,
        )
    }

    /// Removes the mounting offset from an actual pose. Inverse of
    /// [`FixturePosition::apply_offset`].
    #[must_use]
    pub fn remove_offset(&self, pose: Pose) -> Pose {
        Pose::new(
            pose.pan_deg - self.pan_offset_deg,
            pose.tilt_deg - self.tilt_offset_deg,
        )
    }
}

impl Default for FixturePosition {
    fn default() -> Self {
        Self {
            position_index: 1,
            index: 0,
            pan_offset_deg: 0.0,
            tilt_offset_deg: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn pan_normalizes_to_half_open_range() {
        assert_eq!(Pose::new(180.0, 0.0).pan_deg, -180.0);
        assert_eq!(Pose::new(-180.0, 0.0).pan_deg, -180.0);
        assert_eq!(Pose::new(190.0, 0.0).pan_deg, -170.0);
        assert_eq!(Pose::new(540.0, 0.0).pan_deg, -180.0);
        assert_eq!(Pose::new(90.0, 0.0).pan_deg, 90.0);
    }

    #[test]
    fn full_turns_are_identity() {
        for k in -3i32..=3 {
            let base = Pose::new(37.5, 12.0);
            let turned = Pose::new(37.5 + f64::from(k) * 360.0, 12.0);
            assert_abs_diff_eq!(base.pan_deg, turned.pan_deg, epsilon = 1e-9);
        }
    }

    #[test]
    fn apply_then_remove_offset_is_identity() {
        let position = FixturePosition {
            position_index: 2,
            index: 1,
            pan_offset_deg: 15.0,
            tilt_offset_deg: -5.0,
        };
        let pose = Pose::new(30.0, 20.0);
        let back = position.remove_offset(position.apply_offset(pose));
        assert_abs_diff_eq!(back.pan_deg, pose.pan_deg, epsilon = 1e-9);
        assert_abs_diff_eq!(back.tilt_deg, pose.tilt_deg, epsilon = 1e-9);
    }
}
