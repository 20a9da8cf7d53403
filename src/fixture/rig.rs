//! Rig profile: named fixture groups, chase orders and target expansion.

use crate::error::ValidationError;

use super::FixtureInstance;

/// The order fixtures chase in within a group.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChaseOrder {
    /// Declared order.
    #[default]
    LeftToRight,
    /// Declared order reversed.
    RightToLeft,
    /// Ends first, closing toward the middle.
    OutsideIn,
    /// Middle first, opening toward the ends.
    InsideOut,
}

/// A split partition of the rig used by target expansion.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitDimension {
    /// Left half of the rig, declared order.
    HalvesLeft,
    /// Right half of the rig, declared order.
    HalvesRight,
    /// Fixtures at odd positions (1st, 3rd, ...).
    Odd,
    /// Fixtures at even positions (2nd, 4th, ...).
    Even,
}

/// A plan reference to fixtures, resolved against the rig profile.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTarget {
    /// A named semantic group.
    Group(String),
    /// All groups carrying a zone tag.
    Zone(String),
    /// A declared split of the rig.
    Split(SplitDimension),
}

/// A named semantic group of fixtures with a declared chase order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FixtureGroup {
    /// Group identifier referenced by plan targets.
    pub group_id: String,
    /// Member fixture ids, declared left to right.
    pub fixture_ids: Vec<String>,
    /// Chase order for sequential effects.
    #[serde(default)]
    pub chase_order: ChaseOrder,
    /// Zone tags this group belongs to.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FixtureGroup {
    /// Member ids rearranged per the group's chase order.
    #[must_use]
    pub fn ordered_fixture_ids(&self) -> Vec<String> {
        let ids = &self.fixture_ids;
        match self.chase_order {
            ChaseOrder::LeftToRight => ids.clone(),
            ChaseOrder::RightToLeft => ids.iter().rev().cloned().collect(),
            ChaseOrder::OutsideIn => {
                let mut out = Vec::with_capacity(ids.len());
                let (mut left, mut right) = (0usize, ids.len());
                while left < right {
                    out.push(ids[left].clone());
                    left += 1;
                    if left < right {
                        right -= 1;
                        out.push(ids[right].clone());
                    }
                }
                out
            }
            ChaseOrder::InsideOut => {
                let mut outside_in = Self {
                    chase_order: ChaseOrder::OutsideIn,
                    ..self.clone()
                }
                .ordered_fixture_ids();
                outside_in.reverse();
                outside_in
            }
        }
    }
}

/// Aggregation of all fixtures into semantic groups.
///
/// Fixture declaration order is the rig order: elements are emitted and
/// compiled in this order, and splits partition it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RigProfile {
    /// All fixtures, in rig order.
    pub fixtures: Vec<FixtureInstance>,
    /// Named groups over the fixtures.
    pub groups: Vec<FixtureGroup>,
}

impl RigProfile {
    /// Builds a profile and checks that every group member exists.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownFixture`] when a group references an id that
    /// is not in `fixtures`.
    pub fn new(
        fixtures: Vec<FixtureInstance>,
        groups: Vec<FixtureGroup>,
    ) -> Result<Self, ValidationError> {
        for group in &groups {
            for id in &group.fixture_ids {
                if !fixtures.iter().any(|f| &f.fixture_id == id) {
                    return Err(ValidationError::UnknownFixture {
                        group: group.group_id.clone(),
                        fixture_id: id.clone(),
                    });
                }
            }
        }
        Ok(Self { fixtures, groups })
    }

    /// A one-fixture rig with a single `moving_heads` group. Convenient for
    /// tests and examples.
    #[must_use]
    pub fn single(fixture_id: &str, model_name: &str) -> Self {
        Self {
            fixtures: vec![FixtureInstance::standard(fixture_id, model_name)],
            groups: vec![FixtureGroup {
                group_id: "moving_heads".to_owned(),
                fixture_ids: vec![fixture_id.to_owned()],
                chase_order: ChaseOrder::LeftToRight,
                tags: Vec::new(),
            }],
        }
    }

    /// Looks up a fixture by id.
    #[must_use]
    pub fn fixture(&self, fixture_id: &str) -> Option<&FixtureInstance> {
        self.fixtures.iter().find(|f| f.fixture_id == fixture_id)
    }

    /// Looks up a group by id.
    #[must_use]
    pub fn group(&self, group_id: &str) -> Option<&FixtureGroup> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    /// Resolves a plan target to an ordered fixture-id list.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownTarget`] when the group or zone does not
    /// exist. `section` is threaded through for the error location.
    pub fn expand_target(
        &self,
        target: &PlanTarget,
        section: &str,
    ) -> Result<Vec<String>, ValidationError> {
        match target {
            PlanTarget::Group(group_id) => self
                .group(group_id)
                .map(FixtureGroup::ordered_fixture_ids)
                .ok_or_else(|| ValidationError::UnknownTarget {
                    section: section.to_owned(),
                    kind: "group",
                    id: group_id.clone(),
                }),
            PlanTarget::Zone(tag) => {
                let ids: Vec<String> = self
                    .groups
                    .iter()
                    .filter(|g| g.tags.iter().any(|t| t == tag))
                    .flat_map(FixtureGroup::ordered_fixture_ids)
                    .collect();
                if ids.is_empty() {
                    return Err(ValidationError::UnknownTarget {
                        section: section.to_owned(),
                        kind: "zone",
                        id: tag.clone(),
                    });
                }
                Ok(ids)
            }
            PlanTarget::Split(dimension) => {
                let all: Vec<&str> = self
                    .fixtures
                    .iter()
                    .map(|f| f.fixture_id.as_str())
                    .collect();
                let half = all.len().div_ceil(2);
                let picked: Vec<String> = match dimension {
                    SplitDimension::HalvesLeft => {
                        all.iter().take(half).map(|s| (*s).to_owned()).collect()
                    }
                    SplitDimension::HalvesRight => {
                        all.iter().skip(half).map(|s| (*s).to_owned()).collect()
                    }
                    SplitDimension::Odd => all
                        .iter()
                        .step_by(2)
                        .map(|s| (*s).to_owned())
                        .collect(),
                    SplitDimension::Even => all
                        .iter()
                        .skip(1)
                        .step_by(2)
                        .map(|s| (*s).to_owned())
                        .collect(),
                };
                if picked.is_empty() {
                    return Err(ValidationError::UnknownTarget {
                        section: section.to_owned(),
                        kind: "split",
                        id: dimension.to_string(),
                    });
                }
                Ok(picked)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rig_of(n: usize) -> RigProfile {
        let fixtures: Vec<FixtureInstance> = (1..=n)
            .map(|i| FixtureInstance::standard(format!("MH{i}"), format!("Dmx MH{i}")))
            .collect();
        let group = FixtureGroup {
            group_id: "moving_heads".to_owned(),
            fixture_ids: fixtures.iter().map(|f| f.fixture_id.clone()).collect(),
            chase_order: ChaseOrder::LeftToRight,
            tags: vec!["roof".to_owned()],
        };
        RigProfile::new(fixtures, vec![group]).unwrap()
    }

    #[test]
    fn chase_orders() {
        let mut group = rig_of(4).groups[0].clone();
        assert_eq!(group.ordered_fixture_ids(), ["MH1", "MH2", "MH3", "MH4"]);
        group.chase_order = ChaseOrder::RightToLeft;
        assert_eq!(group.ordered_fixture_ids(), ["MH4", "MH3", "MH2", "MH1"]);
        group.chase_order = ChaseOrder::OutsideIn;
        assert_eq!(group.ordered_fixture_ids(), ["MH1", "MH4", "MH2", "MH3"]);
        group.chase_order = ChaseOrder::InsideOut;
        assert_eq!(group.ordered_fixture_ids(), ["MH3", "MH2", "MH4", "MH1"]);
    }

    #[test]
    fn expand_group_and_zone() {
        let rig = rig_of(3);
        let by_group = rig
            .expand_target(&PlanTarget::Group("moving_heads".into()), "s1")
            .unwrap();
        assert_eq!(by_group, ["MH1", "MH2", "MH3"]);
        let by_zone = rig
            .expand_target(&PlanTarget::Zone("roof".into()), "s1")
            .unwrap();
        assert_eq!(by_zone, by_group);
    }

    #[test]
    fn expand_splits() {
        let rig = rig_of(4);
        assert_eq!(
            rig.expand_target(&PlanTarget::Split(SplitDimension::HalvesLeft), "s1")
                .unwrap(),
            ["MH1", "MH2"]
        );
        assert_eq!(
            rig.expand_target(&PlanTarget::Split(SplitDimension::HalvesRight), "s1")
                .unwrap(),
            ["MH3", "MH4"]
        );
        assert_eq!(
            rig.expand_target(&PlanTarget::Split(SplitDimension::Odd), "s1")
                .unwrap(),
            ["MH1", "MH3"]
        );
        assert_eq!(
            rig.expand_target(&PlanTarget::Split(SplitDimension::Even), "s1")
                .unwrap(),
            ["MH2", "MH4"]
        );
    }

    #[test]
    fn unknown_group_is_an_error() {
        let rig = rig_of(2);
        let err = rig
            .expand_target(&PlanTarget::Group("floor".into()), "verse")
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownTarget {
                section: "verse".into(),
                kind: "group",
                id: "floor".into(),
            }
        );
    }

    #[test]
    fn group_with_unknown_member_rejected() {
        let fixtures = vec![FixtureInstance::standard("MH1", "Dmx MH1")];
        let group = FixtureGroup {
            group_id: "g".into(),
            fixture_ids: vec!["MH9".into()],
            chase_order: ChaseOrder::LeftToRight,
            tags: Vec::new(),
        };
        assert!(RigProfile::new(fixtures, vec![group]).is_err());
    }
}
