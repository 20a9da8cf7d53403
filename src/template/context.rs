//! The template compile context.

use crate::{
    fixture::{FixtureCalibration, FixtureInstance},
    timing::BeatGrid,
};

use super::{DimmerRegistry, GeometryRegistry, Intensity, MovementRegistry};

/// One fixture as the compiler sees it: identity, position, inferred spatial
/// role and calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureContext {
    /// Fixture identifier.
    pub fixture_id: String,
    /// 0-based index in the compile order.
    pub index: usize,
    /// 1-based position number on the mount.
    pub position_index: u8,
    /// Inferred spatial role (`OUTER_LEFT`, `INNER_LEFT`, ...).
    pub role: String,
    /// Movement calibration and safety limits.
    pub calibration: FixtureCalibration,
}

impl FixtureContext {
    /// Builds a context from a fixture instance at a compile position. The
    /// role starts empty and is assigned by a [`RoleStrategy`].
    #[must_use]
    pub fn from_instance(instance: &FixtureInstance, index: usize) -> Self {
        Self {
            fixture_id: instance.fixture_id.clone(),
            index,
            position_index: instance.position.position_index,
            role: String::new(),
            calibration: instance.calibration,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(fixture_id: &str, index: usize) -> Self {
        Self {
            fixture_id: fixture_id.to_owned(),
            index,
            position_index: index as u8 + 1,
            role: String::new(),
            calibration: FixtureCalibration::default(),
        }
    }
}

/// How spatial roles are inferred from position in the target group.
///
/// The four-point strategy is normative for four fixtures; other counts fall
/// back to `{group_id}_{index}` names. Role inference is pluggable because the
/// correct behavior for other counts is rig-specific.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleStrategy {
    /// `OUTER_LEFT, INNER_LEFT, INNER_RIGHT, OUTER_RIGHT` when the group has
    /// exactly four fixtures; `{group_id}_{index}` otherwise.
    #[default]
    FourPointChevron,
    /// Always `{group_id}_{index}`.
    GroupIndex,
}

impl RoleStrategy {
    /// Assigns roles to an ordered fixture list.
    pub fn assign(self, group_id: &str, fixtures: &mut [FixtureContext]) {
        const FOUR_POINT: [&str; 4] = ["OUTER_LEFT", "INNER_LEFT", "INNER_RIGHT", "OUTER_RIGHT"];
        let four = self == Self::FourPointChevron && fixtures.len() == 4;
        for (i, fixture) in fixtures.iter_mut().enumerate() {
            fixture.role = if four {
                FOUR_POINT[i].to_owned()
            } else {
                format!("{group_id}_{i}")
            };
        }
    }
}

/// Everything a template compilation reads: fixtures, the time window, and
/// read-only handles to the pattern registries.
///
/// Derived timing fields are computed once at construction so handlers never
/// re-derive them inconsistently.
#[derive(Debug, Clone)]
pub struct TemplateCompileContext<'a> {
    /// Plan section being compiled, stamped into every segment.
    pub section_id: String,
    /// Ordered fixtures, roles already assigned.
    pub fixtures: Vec<FixtureContext>,
    /// The song's tempo map.
    pub beat_grid: &'a BeatGrid,
    /// First bar of the section (1-indexed).
    pub start_bar: u32,
    /// Section length in bars.
    pub duration_bars: u32,
    /// Section start in milliseconds.
    pub start_ms: i64,
    /// Section length in milliseconds.
    pub duration_ms: i64,
    /// Nominal tempo.
    pub bpm: f64,
    /// Mean bar length in milliseconds.
    pub ms_per_bar: f64,
    /// Sample count for curve validation and custom-curve generation.
    pub n_samples: usize,
    /// Intensity driving dimmer parameter selection.
    pub intensity: Intensity,
    /// Geometry library.
    pub geometry: &'a GeometryRegistry,
    /// Movement library.
    pub movements: &'a MovementRegistry,
    /// Dimmer library.
    pub dimmers: &'a DimmerRegistry,
}

impl<'a> TemplateCompileContext<'a> {
    /// Builds a context for a section window, deriving the millisecond fields
    /// from the grid.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        section_id: impl Into<String>,
        fixtures: Vec<FixtureContext>,
        beat_grid: &'a BeatGrid,
        start_bar: u32,
        duration_bars: u32,
        intensity: Intensity,
        geometry: &'a GeometryRegistry,
        movements: &'a MovementRegistry,
        dimmers: &'a DimmerRegistry,
    ) -> Self {
        let end_bar = start_bar + duration_bars.saturating_sub(1);
        let (start_ms, end_ms) = beat_grid.bar_window(start_bar, end_bar);
        Self {
            section_id: section_id.into(),
            fixtures,
            beat_grid,
            start_bar,
            duration_bars,
            start_ms,
            duration_ms: end_ms - start_ms,
            bpm: beat_grid.tempo_bpm(),
            ms_per_bar: beat_grid.ms_per_bar(),
            n_samples: 64,
            intensity,
            geometry,
            movements,
            dimmers,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn four_point_roles() {
        let mut fixtures: Vec<FixtureContext> = (0..4)
            .map(|i| FixtureContext::for_tests(&format!("MH{}", i + 1), i))
            .collect();
        RoleStrategy::FourPointChevron.assign("moving_heads", &mut fixtures);
        let roles: Vec<&str> = fixtures.iter().map(|f| f.role.as_str()).collect();
        assert_eq!(
            roles,
            ["OUTER_LEFT", "INNER_LEFT", "INNER_RIGHT", "OUTER_RIGHT"]
        );
    }

    #[test]
    fn other_counts_use_group_index() {
        let mut fixtures: Vec<FixtureContext> = (0..3)
            .map(|i| FixtureContext::for_tests(&format!("MH{}", i + 1), i))
            .collect();
        RoleStrategy::FourPointChevron.assign("roof", &mut fixtures);
        let roles: Vec<&str> = fixtures.iter().map(|f| f.role.as_str()).collect();
        assert_eq!(roles, ["roof_0", "roof_1", "roof_2"]);
    }

    #[test]
    fn derived_window_fields() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 16_000).unwrap();
        let geometry = GeometryRegistry::builtins();
        let movements = MovementRegistry::builtins();
        let dimmers = DimmerRegistry::builtins();
        let context = TemplateCompileContext::new(
            "verse",
            Vec::new(),
            &grid,
            3,
            2,
            Intensity::Smooth,
            &geometry,
            &movements,
            &dimmers,
        );
        assert_eq!(context.start_ms, 4_000);
        assert_eq!(context.duration_ms, 4_000);
        assert_eq!(context.ms_per_bar, 2_000.0);
    }
}
