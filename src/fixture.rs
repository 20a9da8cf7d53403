//! Fixtures: poses, calibration, DMX channel maps and the rig profile.
//!
//! A [`FixtureInstance`] is one physical lighting unit: its DMX addressing,
//! channel map, inversion flags, movement calibration and the xLights model
//! name it is emitted under. A [`RigProfile`] aggregates instances into named
//! semantic groups with a declared chase order and expands plan targets into
//! ordered fixture-id lists.

mod config;
mod pose;
mod rig;

pub use config::{
    ChannelInversions, DmxMapping, FixtureCalibration, FixtureInstance, load_fixture_file,
};
pub use pose::{FixturePosition, Pose};
pub use rig::{ChaseOrder, FixtureGroup, PlanTarget, RigProfile, SplitDimension};
