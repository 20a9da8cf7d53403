//! The geometry engine: spatial roles and per-fixture offsets.
//!
//! A geometry assigns each fixture in a step a pan/tilt offset, a tilt role
//! and (for asymmetric geometries) a phase or amplitude variation.
//! Classification as *symmetric* (identical curve parameterization across
//! fixtures, shared curves) or *asymmetric* (per-fixture phase/offset/
//! amplitude variation, per-fixture curves) is a static property of the
//! geometry, never a runtime decision, and the two sets must be disjoint.

use std::collections::BTreeMap;

use std::f64::consts::PI;

use super::{GeometryError, context::FixtureContext};

/// Overall tilt character assigned by a geometry.
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
pub enum TiltRole {
    /// Beams lifted above the horizon; the default.
    #[default]
    AboveHorizon,
    /// Beams pointed well up.
    Up,
    /// Beams level with the horizon.
    Zero,
}

impl TiltRole {
    /// Canonical tilt of the role in degrees. Geometry tilt offsets apply
    /// RELATIVE to this value.
    #[must_use]
    pub fn canonical_tilt_deg(self) -> f64 {
        match self {
            Self::AboveHorizon => 30.0,
            Self::Up => 60.0,
            Self::Zero => 0.0,
        }
    }

    /// Parses a role name, falling back to the default for unknown names.
    #[must_use]
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

/// Numeric parameters read from a step's parameter map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParams {
    /// Total pan fan-out across the rig in degrees.
    pub pan_spread_deg: f64,
    /// Tilt variation budget in degrees.
    pub tilt_spread_deg: f64,
    /// 0 = loose, 1 = inner fixtures pulled fully to center.
    pub tightness: f64,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            pan_spread_deg: 60.0,
            tilt_spread_deg: 15.0,
            tightness: 0.5,
        }
    }
}

impl GeometryParams {
    /// Reads parameters from a step's map, keeping defaults for absent keys
    /// and clamping tightness to `[0, 1]`.
    #[must_use]
    pub fn from_step_params(params: &BTreeMap<String, f64>) -> Self {
        let defaults = Self::default();
        Self {
            pan_spread_deg: params
                .get("pan_spread_deg")
                .copied()
                .unwrap_or(defaults.pan_spread_deg),
            tilt_spread_deg: params
                .get("tilt_spread_deg")
                .copied()
                .unwrap_or(defaults.tilt_spread_deg),
            tightness: params
                .get("tightness")
                .copied()
                .unwrap_or(defaults.tightness)
                .clamp(0.0, 1.0),
        }
    }
}

/// One fixture's spatial assignment within a step.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryAssignment {
    /// Assigned fixture.
    pub fixture_id: String,
    /// Pan offset from forward in degrees.
    pub pan_offset_deg: f64,
    /// Tilt offset in degrees, relative to the role's canonical tilt.
    pub tilt_offset_deg: f64,
    /// Assigned tilt role.
    pub tilt_role: TiltRole,
    /// Movement phase offset in radians (asymmetric geometries).
    pub phase_offset: f64,
    /// Movement amplitude scale (asymmetric geometries).
    pub amplitude_scale: f64,
}

impl GeometryAssignment {
    fn neutral(fixture_id: &str) -> Self {
        Self {
            fixture_id: fixture_id.to_owned(),
            pan_offset_deg: 0.0,
            tilt_offset_deg: 0.0,
            tilt_role: TiltRole::default(),
            phase_offset: 0.0,
            amplitude_scale: 1.0,
        }
    }
}

/// Geometries whose parameterization is identical across fixtures.
const SYMMETRIC: &[&str] = &["fan", "wall_wash", "chevron_v", "audience_scan", "rainbow_arc"];

/// Geometries with per-fixture phase, offset or amplitude variation.
const ASYMMETRIC: &[&str] = &[
    "mirror_lr",
    "wave_lr",
    "center_out",
    "x_cross",
    "alternating_updown",
];

/// Geometry ids classified as symmetric.
#[must_use]
pub fn symmetric_geometry_ids() -> &'static [&'static str] {
    SYMMETRIC
}

/// Geometry ids classified as asymmetric.
#[must_use]
pub fn asymmetric_geometry_ids() -> &'static [&'static str] {
    ASYMMETRIC
}

/// The registry of implemented geometries.
#[derive(Debug, Clone, Default)]
pub struct GeometryRegistry {}

impl GeometryRegistry {
    /// Builds the registry of builtin geometries.
    #[must_use]
    pub fn builtins() -> Self {
        Self {}
    }

    /// All registered geometry ids.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = SYMMETRIC.iter().chain(ASYMMETRIC.iter()).copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether a geometry is registered.
    #[must_use]
    pub fn has(&self, geometry_id: &str) -> bool {
        SYMMETRIC.contains(&geometry_id) || ASYMMETRIC.contains(&geometry_id)
    }

    /// Whether a geometry is classified symmetric.
    ///
    /// # Errors
    ///
    /// [`GeometryError::UnknownGeometry`] for unregistered ids and
    /// [`GeometryError::Misclassified`] when the id appears in both sets.
    pub fn is_symmetric(&self, geometry_id: &str) -> Result<bool, GeometryError> {
        let symmetric = SYMMETRIC.contains(&geometry_id);
        let asymmetric = ASYMMETRIC.contains(&geometry_id);
        match (symmetric, asymmetric) {
            (true, true) => Err(GeometryError::Misclassified {
                geometry_id: geometry_id.to_owned(),
                reason: "appears in both classification sets".to_owned(),
            }),
            (false, false) => Err(GeometryError::UnknownGeometry(geometry_id.to_owned())),
            (symmetric, _) => Ok(symmetric),
        }
    }

    /// Computes per-fixture assignments for a geometry.
    ///
    /// Fixtures are assigned in the order given. `rel` below is the fixture's
    /// normalized position in `[-1, 1]` across the rig (0 for a single
    /// fixture).
    ///
    /// # Errors
    ///
    /// [`GeometryError::UnknownGeometry`] for unregistered ids.
    pub fn apply(
        &self,
        geometry_id: &str,
        params: &GeometryParams,
        fixtures: &[FixtureContext],
    ) -> Result<Vec<GeometryAssignment>, GeometryError> {
        if !self.has(geometry_id) {
            return Err(GeometryError::UnknownGeometry(geometry_id.to_owned()));
        }
        let n = fixtures.len();
        let rel = |i: usize| -> f64 {
            if n <= 1 {
                0.0
            } else {
                (i as f64 / (n - 1) as f64) * 2.0 - 1.0
            }
        };
        let half_spread = params.pan_spread_deg / 2.0;

        let assignments = fixtures
            .iter()
            .enumerate()
            .map(|(i, fixture)| {
                let mut a = GeometryAssignment::neutral(&fixture.fixture_id);
                let r = rel(i);
                match geometry_id {
                    "fan" => {
                        a.pan_offset_deg = r * half_spread;
                    }
                    "wall_wash" => {
                        a.tilt_role = TiltRole::Zero;
                    }
                    "chevron_v" => {
                        // Inner fixtures compress toward center by tightness;
                        // outer fixtures keep the full spread.
                        let compression = 1.0 - params.tightness * (1.0 - r.abs());
                        a.pan_offset_deg = r * half_spread * compression;
                        a.tilt_offset_deg = params.tilt_spread_deg * r.abs().max(1.0 / 3.0);
                    }
                    "audience_scan" => {
                        a.pan_offset_deg = r * half_spread;
                        a.tilt_role = TiltRole::Zero;
                        a.tilt_offset_deg = -params.tilt_spread_deg / 2.0;
                    }
                    "rainbow_arc" => {
                        a.pan_offset_deg = r * half_spread;
                        a.tilt_role = TiltRole::Up;
                        a.tilt_offset_deg = params.tilt_spread_deg * (1.0 - r.abs());
                    }
                    "mirror_lr" => {
                        a.pan_offset_deg = r * half_spread;
                        a.tilt_offset_deg = params.tilt_spread_deg * r.abs();
                        // Right half mirrors the movement.
                        if r > 0.0 {
                            a.phase_offset = PI;
                        }
                    }
                    "wave_lr" => {
                        a.phase_offset = (r + 1.0) / 2.0 * PI;
                    }
                    "center_out" => {
                        a.phase_offset = r.abs() * PI;
                    }
                    "x_cross" => {
                        a.pan_offset_deg = r * half_spread;
                        a.tilt_offset_deg = r * params.tilt_spread_deg / 2.0;
                        if r > 0.0 {
                            a.phase_offset = PI;
                        }
                    }
                    "alternating_updown" => {
                        a.tilt_role = if i % 2 == 0 { TiltRole::Up } else { TiltRole::Zero };
                        if i % 2 == 1 {
                            a.phase_offset = PI;
                        }
                    }
                    _ => unreachable!("registered geometry ids are matched exhaustively"),
                }
                a
            })
            .collect();
        Ok(assignments)
    }
}
