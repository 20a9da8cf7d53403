//! Fixture configuration: DMX mapping, inversions and movement calibration.

use std::path::Path;

use crate::error::ValidationError;

use super::FixturePosition;

/// DMX channel assignments of one fixture, 1-based channel numbers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DmxMapping {
    /// Coarse pan channel.
    pub pan_channel: u16,
    /// Coarse tilt channel.
    pub tilt_channel: u16,
    /// Dimmer channel.
    pub dimmer_channel: u16,
    /// Shutter channel, when the fixture has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutter: Option<u16>,
    /// Color wheel channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u16>,
    /// Gobo wheel channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gobo: Option<u16>,
    /// Fine pan channel for 16-bit movement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_fine_channel: Option<u16>,
    /// Fine tilt channel for 16-bit movement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt_fine_channel: Option<u16>,
    /// Whether the fine channels are in use.
    #[serde(default)]
    pub use_16bit_pan_tilt: bool,
}

impl DmxMapping {
    /// A common 16-channel moving-head layout: pan 1, tilt 3, dimmer 6,
    /// shutter 7, color 8, gobo 10.
    #[must_use]
    pub fn standard_moving_head() -> Self {
        Self {
            pan_channel: 1,
            tilt_channel: 3,
            dimmer_channel: 6,
            shutter: Some(7),
            color: Some(8),
            gobo: Some(10),
            pan_fine_channel: Some(2),
            tilt_fine_channel: Some(4),
            use_16bit_pan_tilt: false,
        }
    }

    /// Highest channel number referenced by this mapping.
    #[must_use]
    pub fn max_channel(&self) -> u16 {
        let fine = if self.use_16bit_pan_tilt {
            self.pan_fine_channel
                .max(self.tilt_fine_channel)
                .unwrap_or(0)
        } else {
            0
        };
        [
            self.pan_channel,
            self.tilt_channel,
            self.dimmer_channel,
            self.shutter.unwrap_or(0),
            self.color.unwrap_or(0),
            self.gobo.unwrap_or(0),
            fine,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Per-channel inversion flags applied at emission time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChannelInversions {
    /// Invert the pan channel.
    #[serde(default)]
    pub pan: bool,
    /// Invert the tilt channel.
    #[serde(default)]
    pub tilt: bool,
    /// Invert the dimmer channel.
    #[serde(default)]
    pub dimmer: bool,
    /// Invert the shutter channel.
    #[serde(default)]
    pub shutter: bool,
    /// Invert the color channel.
    #[serde(default)]
    pub color: bool,
    /// Invert the gobo channel.
    #[serde(default)]
    pub gobo: bool,
}

/// Movement calibration and safety limits of one fixture.
///
/// Safety limits (`pan_min_dmx`..`pan_max_dmx`, likewise tilt) bound every
/// emitted byte on the movement channels; dimmer floor/ceiling bound the
/// dimmer. Orientation calibration records which DMX values produce "forward"
/// and "horizon".
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FixtureCalibration {
    /// Lowest safe pan DMX value.
    pub pan_min_dmx: u8,
    /// Highest safe pan DMX value.
    pub pan_max_dmx: u8,
    /// Lowest safe tilt DMX value.
    pub tilt_min_dmx: u8,
    /// Highest safe tilt DMX value.
    pub tilt_max_dmx: u8,
    /// Pan travels reversed relative to the DMX ramp.
    #[serde(default)]
    pub pan_inverted: bool,
    /// Tilt travels reversed relative to the DMX ramp.
    #[serde(default)]
    pub tilt_inverted: bool,
    /// Dimmer never emitted below this.
    #[serde(default)]
    pub dimmer_floor_dmx: u8,
    /// Dimmer never emitted above this.
    #[serde(default = "default_ceiling")]
    pub dimmer_ceiling_dmx: u8,
    /// Full pan travel in degrees (commonly 540).
    #[serde(default = "default_pan_range")]
    pub pan_range_deg: f64,
    /// Full tilt travel in degrees (commonly 270).
    #[serde(default = "default_tilt_range")]
    pub tilt_range_deg: f64,
    /// DMX value that aims the fixture forward (pan 0°).
    #[serde(default = "default_center")]
    pub forward_pan_dmx: u8,
    /// DMX value that levels the fixture at the horizon (tilt 0°).
    #[serde(default = "default_center")]
    pub horizon_tilt_dmx: u8,
}

fn default_ceiling() -> u8 {
    255
}
fn default_pan_range() -> f64 {
    540.0
}
fn default_tilt_range() -> f64 {
    270.0
}
fn default_center() -> u8 {
    128
}

impl Default for FixtureCalibration {
    fn default() -> Self {
        Self {
            pan_min_dmx: 0,
            pan_max_dmx: 255,
            tilt_min_dmx: 0,
            tilt_max_dmx: 255,
            pan_inverted: false,
            tilt_inverted: false,
            dimmer_floor_dmx: 0,
            dimmer_ceiling_dmx: 255,
            pan_range_deg: default_pan_range(),
            tilt_range_deg: default_tilt_range(),
            forward_pan_dmx: default_center(),
            horizon_tilt_dmx: default_center(),
        }
    }
}

fn deg_to_dmx(
    deg: f64,
    range_deg: f64,
    center_dmx: u8,
    inverted: bool,
    min_dmx: u8,
    max_dmx: u8,
) -> u8 {
    let raw = f64::from(center_dmx) + deg * 255.0 / range_deg;
    let raw = if inverted { 255.0 - raw } else { raw };
    raw.round().clamp(f64::from(min_dmx), f64::from(max_dmx)) as u8
}

fn dmx_to_deg(dmx: u8, range_deg: f64, center_dmx: u8, inverted: bool) -> f64 {
    let raw = if inverted {
        255.0 - f64::from(dmx)
    } else {
        f64::from(dmx)
    };
    (raw - f64::from(center_dmx)) * range_deg / 255.0
}

impl FixtureCalibration {
    /// Converts a pose to clamped pan/tilt DMX bytes, honoring inversion and
    /// safety limits.
    #[must_use]
    pub fn degrees_to_dmx(&self, pose: super::Pose) -> (u8, u8) {
        let pan = deg_to_dmx(
            pose.pan_deg,
            self.pan_range_deg,
            self.forward_pan_dmx,
            self.pan_inverted,
            self.pan_min_dmx,
            self.pan_max_dmx,
        );
        let tilt = deg_to_dmx(
            pose.tilt_deg,
            self.tilt_range_deg,
            self.horizon_tilt_dmx,
            self.tilt_inverted,
            self.tilt_min_dmx,
            self.tilt_max_dmx,
        );
        (pan, tilt)
    }

    /// Converts pan/tilt DMX bytes back to degrees. Inverse of
    /// [`FixtureCalibration::degrees_to_dmx`] up to one DMX step on valid
    /// pairs.
    #[must_use]
    pub fn dmx_to_degrees(&self, pan_dmx: u8, tilt_dmx: u8) -> super::Pose {
        super::Pose::new(
            dmx_to_deg(
                pan_dmx,
                self.pan_range_deg,
                self.forward_pan_dmx,
                self.pan_inverted,
            ),
            dmx_to_deg(
                tilt_dmx,
                self.tilt_range_deg,
                self.horizon_tilt_dmx,
                self.tilt_inverted,
            ),
        )
    }

    /// One degree of pan expressed in DMX steps.
    #[must_use]
    pub fn pan_dmx_per_degree(&self) -> f64 {
        255.0 / self.pan_range_deg
    }

    /// One degree of tilt expressed in DMX steps.
    #[must_use]
    pub fn tilt_dmx_per_degree(&self) -> f64 {
        255.0 / self.tilt_range_deg
    }
}

/// One lighting unit: configuration plus the xLights model name it renders to.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FixtureInstance {
    /// Unique fixture identifier (e.g. `MH1`).
    pub fixture_id: String,
    /// xLights model name this fixture is emitted under (e.g. `Dmx MH1`).
    pub model_name: String,
    /// DMX universe number.
    #[serde(default = "default_universe")]
    pub dmx_universe: u16,
    /// Starting DMX address within the universe.
    #[serde(default = "default_universe")]
    pub dmx_start_address: u16,
    /// Channel assignments.
    pub mapping: DmxMapping,
    /// Emission-time inversion flags.
    #[serde(default)]
    pub inversions: ChannelInversions,
    /// Movement calibration and safety limits.
    #[serde(default)]
    pub calibration: FixtureCalibration,
    /// Mounting position and aim offset.
    #[serde(default)]
    pub position: FixturePosition,
}

fn default_universe() -> u16 {
    1
}

impl FixtureInstance {
    /// A fixture with the standard moving-head layout and default calibration.
    #[must_use]
    pub fn standard(fixture_id: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            fixture_id: fixture_id.into(),
            model_name: model_name.into(),
            dmx_universe: 1,
            dmx_start_address: 1,
            mapping: DmxMapping::standard_moving_head(),
            inversions: ChannelInversions::default(),
            calibration: FixtureCalibration::default(),
            position: FixturePosition::default(),
        }
    }

    /// Whether a logical channel is inverted at emission time.
    #[must_use]
    pub fn is_inverted(&self, channel: crate::segment::ChannelName) -> bool {
        use crate::segment::ChannelName;
        match channel {
            ChannelName::Pan => self.inversions.pan,
            ChannelName::Tilt => self.inversions.tilt,
            ChannelName::Dimmer => self.inversions.dimmer,
            ChannelName::Shutter => self.inversions.shutter,
            ChannelName::Color => self.inversions.color,
            ChannelName::Gobo => self.inversions.gobo,
        }
    }

    /// DMX channel number of a logical channel, when the fixture has it.
    #[must_use]
    pub fn dmx_channel(&self, channel: crate::segment::ChannelName) -> Option<u16> {
        use crate::segment::ChannelName;
        match channel {
            ChannelName::Pan => Some(self.mapping.pan_channel),
            ChannelName::Tilt => Some(self.mapping.tilt_channel),
            ChannelName::Dimmer => Some(self.mapping.dimmer_channel),
            ChannelName::Shutter => self.mapping.shutter,
            ChannelName::Color => self.mapping.color,
            ChannelName::Gobo => self.mapping.gobo,
        }
    }
}

/// Loads a fixture configuration file: a JSON list of [`FixtureInstance`]s.
///
/// # Errors
///
/// [`ValidationError::ConfigRead`] when the file cannot be read and
/// [`ValidationError::ConfigParse`] when it does not match the schema.
pub fn load_fixture_file(path: &Path) -> Result<Vec<FixtureInstance>, ValidationError> {
    let text = std::fs::read_to_string(path).map_err(|e| ValidationError::ConfigRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ValidationError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
