//! Per-fixture time segments: the sole currency between the template compiler
//! and the XSQ serializer.
//!
//! A [`FixtureSegment`] bundles one fixture's channel state over a time
//! window: each [`ChannelValue`] is either a static DMX byte or a design-space
//! curve with mapping hints. Segments are immutable after compilation.

use std::collections::BTreeMap;

use crate::{
    curve::{Curve, DmxMapMode},
    error::ValidationError,
};

/// The closed set of logical channels the compiler knows about.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelName {
    /// Horizontal movement.
    Pan,
    /// Vertical movement.
    Tilt,
    /// Intensity.
    Dimmer,
    /// Shutter / strobe.
    Shutter,
    /// Color wheel.
    Color,
    /// Gobo wheel.
    Gobo,
}

/// How a channel value combines with overlapping segments.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlendMode {
    /// Replace whatever was there.
    #[default]
    Override,
    /// Add on top, saturating.
    Add,
    /// Keep the brighter value.
    Max,
}

/// One channel's value specification within a segment.
///
/// Exactly one of `static_dmx` or `curve` is set; the constructors enforce the
/// exclusive-or. For offset-centered curves (movement) the final DMX value is
/// `base_dmx + amplitude_dmx · (v − 0.5)`; for absolute curves (dimmer) it is
/// `clamp_min + v · (clamp_max − clamp_min)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelValue {
    /// The channel this value drives. Must match the key it is stored under.
    pub channel: ChannelName,
    /// Static DMX byte, mutually exclusive with `curve`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dmx: Option<u8>,
    /// Design-space curve, mutually exclusive with `static_dmx`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
    /// Center DMX position for offset-centered curves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dmx: Option<u8>,
    /// Peak-to-center DMX swing for offset-centered curves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude_dmx: Option<u8>,
    /// Read the curve as a signed offset around 0.5.
    #[serde(default)]
    pub offset_centered: bool,
    /// Blend behavior against overlapping segments.
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Lower DMX clamp.
    #[serde(default)]
    pub clamp_min: u8,
    /// Upper DMX clamp.
    #[serde(default = "max_dmx")]
    pub clamp_max: u8,
}

fn max_dmx() -> u8 {
    255
}

impl ChannelValue {
    /// A static channel value.
    ///
    /// # Errors
    ///
    /// [`ValidationError::ClampOrder`] when `clamp_max < clamp_min`.
    pub fn static_value(
        channel: ChannelName,
        dmx: u8,
        clamp_min: u8,
        clamp_max: u8,
    ) -> Result<Self, ValidationError> {
        if clamp_max < clamp_min {
            return Err(ValidationError::ClampOrder {
                clamp_min,
                clamp_max,
            });
        }
        Ok(Self {
            channel,
            static_dmx: Some(dmx.clamp(clamp_min, clamp_max)),
            curve: None,
            base_dmx: None,
            amplitude_dmx: None,
            offset_centered: false,
            blend_mode: BlendMode::Override,
            clamp_min,
            clamp_max,
        })
    }

    /// An absolute (dimmer-style) curve value.
    ///
    /// # Errors
    ///
    /// [`ValidationError::ClampOrder`] when `clamp_max < clamp_min`.
    pub fn absolute_curve(
        channel: ChannelName,
        curve: Curve,
        clamp_min: u8,
        clamp_max: u8,
    ) -> Result<Self, ValidationError> {
        if clamp_max < clamp_min {
            return Err(ValidationError::ClampOrder {
                clamp_min,
                clamp_max,
            });
        }
        Ok(Self {
            channel,
            static_dmx: None,
            curve: Some(curve),
            base_dmx: None,
            amplitude_dmx: None,
            offset_centered: false,
            blend_mode: BlendMode::Override,
            clamp_min,
            clamp_max,
        })
    }

    /// An offset-centered (movement-style) curve around a base position.
    ///
    /// # Errors
    ///
    /// [`ValidationError::ClampOrder`] when `clamp_max < clamp_min`.
    pub fn offset_curve(
        channel: ChannelName,
        curve: Curve,
        base_dmx: u8,
        amplitude_dmx: u8,
        clamp_min: u8,
        clamp_max: u8,
    ) -> Result<Self, ValidationError> {
        if clamp_max < clamp_min {
            return Err(ValidationError::ClampOrder {
                clamp_min,
                clamp_max,
            });
        }
        Ok(Self {
            channel,
            static_dmx: None,
            curve: Some(curve),
            base_dmx: Some(base_dmx),
            amplitude_dmx: Some(amplitude_dmx),
            offset_centered: true,
            blend_mode: BlendMode::Override,
            clamp_min,
            clamp_max,
        })
    }

    /// Checks the exclusive-or and clamp invariants of a deserialized value.
    ///
    /// # Errors
    ///
    /// The violated [`ValidationError`] variant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (&self.static_dmx, &self.curve) {
            (None, None) => {
                return Err(ValidationError::ChannelValueEmpty {
                    channel: self.channel.to_string(),
                });
            }
            (Some(_), Some(_)) => {
                return Err(ValidationError::ChannelValueConflict {
                    channel: self.channel.to_string(),
                });
            }
            _ => {}
        }
        if self.clamp_max < self.clamp_min {
            return Err(ValidationError::ClampOrder {
                clamp_min: self.clamp_min,
                clamp_max: self.clamp_max,
            });
        }
        Ok(())
    }

    /// The DMX mapping mode this value uses for curve conversion.
    #[must_use]
    pub fn map_mode(&self) -> DmxMapMode {
        if self.offset_centered {
            DmxMapMode::OffsetCentered {
                base_dmx: f64::from(self.base_dmx.unwrap_or(128)),
                amplitude_dmx: f64::from(self.amplitude_dmx.unwrap_or(64)),
            }
        } else {
            DmxMapMode::Absolute
        }
    }

    /// DMX value at a normalized time within the segment, pre-inversion.
    ///
    /// Static values are constant; curve values sample the curve and map it.
    /// Used by the transition engine to read boundary anchors.
    #[must_use]
    pub fn dmx_at(&self, t: f64) -> f64 {
        if let Some(dmx) = self.static_dmx {
            return f64::from(dmx.clamp(self.clamp_min, self.clamp_max));
        }
        let v = self.curve.as_ref().map_or(0.5, |c| c.sample(t));
        match self.map_mode() {
            DmxMapMode::Absolute => {
                let lo = f64::from(self.clamp_min);
                let hi = f64::from(self.clamp_max);
                (lo + v * (hi - lo)).clamp(0.0, 255.0)
            }
            DmxMapMode::OffsetCentered {
                base_dmx,
                amplitude_dmx,
            } => (base_dmx + amplitude_dmx * (v - 0.5))
                .clamp(f64::from(self.clamp_min), f64::from(self.clamp_max)),
        }
    }
}

/// A per-fixture, time-bounded bundle of channel values.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FixtureSegment {
    /// Plan section this segment came from.
    pub section_id: String,
    /// Template step within the section.
    pub step_id: String,
    /// Template that produced it.
    pub template_id: String,
    /// Preset applied, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    /// Unique segment identifier.
    pub segment_id: String,
    /// Owning fixture.
    pub fixture_id: String,
    /// Start time in milliseconds (inclusive).
    pub t0_ms: i64,
    /// End time in milliseconds (`t1_ms >= t0_ms`).
    pub t1_ms: i64,
    /// Channel state, keyed by channel name.
    pub channels: BTreeMap<ChannelName, ChannelValue>,
    /// Whether this segment may share an effect with identical siblings.
    /// `false` when per-fixture phase offsets make it unique.
    #[serde(default = "default_true")]
    pub allow_grouping: bool,
    /// Free-form annotations carried into the artifact trace.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl FixtureSegment {
    /// Creates an empty segment over a time window.
    ///
    /// # Errors
    ///
    /// [`ValidationError::SegmentTimeOrder`] when `t1_ms < t0_ms`.
    pub fn new(
        section_id: impl Into<String>,
        step_id: impl Into<String>,
        template_id: impl Into<String>,
        segment_id: impl Into<String>,
        fixture_id: impl Into<String>,
        t0_ms: i64,
        t1_ms: i64,
    ) -> Result<Self, ValidationError> {
        let segment_id = segment_id.into();
        if t1_ms < t0_ms {
            return Err(ValidationError::SegmentTimeOrder {
                segment_id,
                t0_ms,
                t1_ms,
            });
        }
        Ok(Self {
            section_id: section_id.into(),
            step_id: step_id.into(),
            template_id: template_id.into(),
            preset_id: None,
            segment_id,
            fixture_id: fixture_id.into(),
            t0_ms,
            t1_ms,
            channels: BTreeMap::new(),
            allow_grouping: true,
            metadata: BTreeMap::new(),
        })
    }

    /// Inserts or replaces a channel value, keeping key and tag consistent.
    pub fn set_channel(&mut self, value: ChannelValue) {
        self.channels.insert(value.channel, value);
    }

    /// The channel value for a name, when set.
    #[must_use]
    pub fn channel(&self, channel: ChannelName) -> Option<&ChannelValue> {
        self.channels.get(&channel)
    }

    /// Segment length in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        self.t1_ms - self.t0_ms
    }

    /// Provenance tag: `section_step_template` with the preset appended when
    /// one was applied.
    #[must_use]
    pub fn metatag(&self) -> String {
        match &self.preset_id {
            Some(preset) => format!(
                "{}_{}_{}_{}",
                self.section_id, self.step_id, self.template_id, preset
            ),
            None => format!("{}_{}_{}", self.section_id, self.step_id, self.template_id),
        }
    }

    /// Checks time ordering, channel-key consistency and every channel value.
    ///
    /// # Errors
    ///
    /// The first violated [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.t1_ms < self.t0_ms {
            return Err(ValidationError::SegmentTimeOrder {
                segment_id: self.segment_id.clone(),
                t0_ms: self.t0_ms,
                t1_ms: self.t1_ms,
            });
        }
        for (key, value) in &self.channels {
            if value.channel != *key {
                return Err(ValidationError::ChannelKeyMismatch {
                    key: key.to_string(),
                    value: value.channel.to_string(),
                });
            }
            value.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::curve::NativeKind;

    use super::*;

    #[test]
    fn static_and_curve_are_exclusive() {
        let mut value =
            ChannelValue::static_value(ChannelName::Dimmer, 200, 0, 255).unwrap();
        value.curve = Some(Curve::native(NativeKind::Sine));
        assert_eq!(
            value.validate().unwrap_err(),
            ValidationError::ChannelValueConflict {
                channel: "dimmer".into()
            }
        );
    }

    #[test]
    fn clamp_order_is_enforced() {
        let err = ChannelValue::static_value(ChannelName::Pan, 10, 200, 100).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ClampOrder {
                clamp_min: 200,
                clamp_max: 100
            }
        );
    }

    #[test]
    fn key_mismatch_detected() {
        let mut segment =
            FixtureSegment::new("s", "step", "tpl", "seg", "MH1", 0, 1_000).unwrap();
        let value = ChannelValue::static_value(ChannelName::Tilt, 128, 0, 255).unwrap();
        segment.channels.insert(ChannelName::Pan, value);
        assert!(matches!(
            segment.validate(),
            Err(ValidationError::ChannelKeyMismatch { .. })
        ));
    }

    #[test]
    fn segment_time_order() {
        let err = FixtureSegment::new("s", "step", "tpl", "seg", "MH1", 2_000, 1_000).unwrap_err();
        assert!(matches!(err, ValidationError::SegmentTimeOrder { .. }));
    }

    #[test]
    fn dmx_at_for_offset_curve() {
        let value = ChannelValue::offset_curve(
            ChannelName::Pan,
            Curve::native(NativeKind::Sine),
            128,
            64,
            0,
            255,
        )
        .unwrap();
        // Sine starts at its midpoint: offset 0 around the base.
        assert_eq!(value.dmx_at(0.0), 128.0);
        // Quarter cycle: positive peak.
        assert_eq!(value.dmx_at(0.25), 160.0);
    }

    #[test]
    fn metatag_includes_preset_when_set() {
        let mut segment =
            FixtureSegment::new("chorus", "step_1", "fan", "seg", "MH1", 0, 100).unwrap();
        assert_eq!(segment.metatag(), "chorus_step_1_fan");
        segment.preset_id = Some("big".into());
        assert_eq!(segment.metatag(), "chorus_step_1_fan_big");
    }
}
