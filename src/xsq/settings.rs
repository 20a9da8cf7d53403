//! DMX effect settings-string builder.

use std::collections::BTreeMap;

use crate::{
    curve::{Curve, CurveError, NativeDmxCurve, NativeKind, map_to_dmx, samples_for_duration},
    fixture::FixtureInstance,
    segment::{ChannelValue, FixtureSegment},
};

use super::value_curve::{custom_value_curve_string, native_value_curve_string, xlights_type_name};

/// Builds xLights DMX effect settings strings from fixture segments.
///
/// Output layout (a single comma-separated `key=value` line):
///
/// 1. `B_CHOICE_BufferStyle=Per Model Default`
/// 2. `E_CHECKBOX_INVDMX{ch}` for every channel 1..=N (N rounded up to the
///    nearest 16, minimum 16)
/// 3. `E_NOTEBOOK1=Channels 1-16`
/// 4. `E_SLIDER_DMX{ch}` — forced to 0 on channels carrying a value curve
/// 5. `E_VALUECURVE_DMX{ch}` for each curve channel, ascending
#[derive(Debug, Clone)]
pub struct DmxSettingsBuilder<'a> {
    fixture: &'a FixtureInstance,
}

impl<'a> DmxSettingsBuilder<'a> {
    /// Creates a builder for one fixture's channel mapping and inversions.
    #[must_use]
    pub fn new(fixture: &'a FixtureInstance) -> Self {
        Self { fixture }
    }

    /// Builds the settings string for a segment.
    ///
    /// # Errors
    ///
    /// Propagates [`CurveError`] when a custom curve cannot be sampled.
    pub fn build(&self, segment: &FixtureSegment) -> Result<String, CurveError> {
        let mut channel_values: BTreeMap<u16, u8> = BTreeMap::new();
        let mut channel_curves: BTreeMap<u16, String> = BTreeMap::new();
        let n_samples = samples_for_duration(segment.duration_ms());

        for value in segment.channels.values() {
            let Some(dmx_channel) = self.fixture.dmx_channel(value.channel) else {
                continue;
            };
            if let Some(static_dmx) = value.static_dmx {
                channel_values.insert(dmx_channel, static_dmx);
                continue;
            }
            if let Some(base) = value.base_dmx {
                // Kept as the slider fallback; the slider is still forced to 0
                // while the curve exists.
                channel_values.insert(dmx_channel, base);
            }
            if value.curve.is_some() {
                let curve_string = self.curve_string(dmx_channel, value, n_samples)?;
                channel_curves.insert(dmx_channel, curve_string);
            }
        }

        let max_channel = Self::padded_channel_count(&channel_values, &channel_curves);
        let inversions = self.inversion_flags(max_channel);

        let mut parts: Vec<String> =
            Vec::with_capacity(3 + 2 * max_channel as usize + channel_curves.len());
        parts.push("B_CHOICE_BufferStyle=Per Model Default".to_owned());
        for ch in 1..=max_channel {
            parts.push(format!(
                "E_CHECKBOX_INVDMX{ch}={}",
                u8::from(inversions.get(&ch).copied().unwrap_or(false))
            ));
        }
        parts.push("E_NOTEBOOK1=Channels 1-16".to_owned());
        for ch in 1..=max_channel {
            if channel_curves.contains_key(&ch) {
                // xLights requires a zero slider under a value curve.
                parts.push(format!("E_SLIDER_DMX{ch}=0"));
            } else {
                parts.push(format!(
                    "E_SLIDER_DMX{ch}={}",
                    channel_values.get(&ch).copied().unwrap_or(0)
                ));
            }
        }
        for (ch, curve_string) in &channel_curves {
            parts.push(format!("E_VALUECURVE_DMX{ch}={curve_string}"));
        }
        Ok(parts.join(","))
    }

    /// Serializes one channel's curve: native when the kind maps onto an
    /// xLights native value curve, sampled custom otherwise.
    fn curve_string(
        &self,
        dmx_channel: u16,
        value: &ChannelValue,
        n_samples: usize,
    ) -> Result<String, CurveError> {
        if let Some(Curve::Native(native)) = &value.curve
            && xlights_type_name(native.kind).is_some()
        {
            let spec = self.native_spec(native, value);
            if let Some(s) = native_value_curve_string(dmx_channel, &spec) {
                return Ok(s);
            }
        }
        let curve = value.curve.as_ref().expect("caller checked curve presence");
        let points = curve.generate(n_samples)?;
        let mapped = map_to_dmx(
            &points,
            value.map_mode(),
            value.clamp_min,
            value.clamp_max,
            false,
        );
        Ok(custom_value_curve_string(dmx_channel, &mapped))
    }

    /// Translates a design-space native curve into DMX parameter space and
    /// tunes it against the channel's clamp interval.
    fn native_spec(
        &self,
        native: &crate::curve::NativeCurve,
        value: &ChannelValue,
    ) -> NativeDmxCurve {
        let lo = f64::from(value.clamp_min);
        let hi = f64::from(value.clamp_max);
        let amplitude_param = native.params[2].clamp(0.0, 1.0);
        let spec = match native.kind {
            NativeKind::Ramp => {
                let from = value.dmx_at(0.0);
                let to = value.dmx_at(1.0);
                NativeDmxCurve::ramp(from, to)
            }
            _ => {
                let (center, swing) = if value.offset_centered {
                    let base = f64::from(value.base_dmx.unwrap_or(128));
                    let amplitude = f64::from(value.amplitude_dmx.unwrap_or(64));
                    (base, amplitude / 2.0 * amplitude_param)
                } else {
                    ((lo + hi) / 2.0, (hi - lo) / 2.0 * amplitude_param)
                };
                NativeDmxCurve {
                    kind: native.kind,
                    p1: center,
                    p2: swing,
                    p3: native.effective_cycles(),
                    p4: native.params[3],
                }
            }
        };
        spec.tuned(lo, hi)
    }

    /// Highest referenced channel, rounded up to the nearest 16 (minimum 16).
    fn padded_channel_count(
        values: &BTreeMap<u16, u8>,
        curves: &BTreeMap<u16, String>,
    ) -> u16 {
        let highest = values
            .keys()
            .chain(curves.keys())
            .copied()
            .max()
            .unwrap_or(0)
            .max(16);
        highest.div_ceil(16) * 16
    }

    /// Inversion flags per DMX channel; 16-bit fine channels inherit their
    /// coarse channel's flag.
    fn inversion_flags(&self, max_channel: u16) -> BTreeMap<u16, bool> {
        let mapping = &self.fixture.mapping;
        let inv = &self.fixture.inversions;
        let mut flags = BTreeMap::new();
        let mut set = |channel: Option<u16>, inverted: bool| {
            if let Some(ch) = channel
                && ch > 0
                && ch <= max_channel
            {
                flags.insert(ch, inverted);
            }
        };
        set(Some(mapping.pan_channel), inv.pan);
        set(Some(mapping.tilt_channel), inv.tilt);
        set(Some(mapping.dimmer_channel), inv.dimmer);
        set(mapping.shutter, inv.shutter);
        set(mapping.color, inv.color);
        set(mapping.gobo, inv.gobo);
        if mapping.use_16bit_pan_tilt {
            set(mapping.pan_fine_channel, inv.pan);
            set(mapping.tilt_fine_channel, inv.tilt);
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        curve::NativeCurve,
        segment::{ChannelName, FixtureSegment},
    };

    use super::*;

    fn segment_with(value: ChannelValue) -> FixtureSegment {
        let mut segment =
            FixtureSegment::new("s", "step", "tpl", "seg", "MH1", 0, 2_000).unwrap();
        segment.set_channel(value);
        segment
    }

    #[test]
    fn slider_is_zero_under_a_value_curve() {
        let fixture = FixtureInstance::standard("MH1", "Dmx MH1");
        let builder = DmxSettingsBuilder::new(&fixture);
        let value = ChannelValue::offset_curve(
            ChannelName::Pan,
            Curve::Native(NativeCurve::new(NativeKind::Sine).with_cycles(2.0)),
            128,
            120,
            1,
            245,
        )
        .unwrap();
        let settings = builder.build(&segment_with(value)).unwrap();

        // Pan is channel 1 in the standard mapping.
        assert!(settings.contains("E_SLIDER_DMX1=0,"));
        assert!(settings.contains(
            "E_VALUECURVE_DMX1=Active=TRUE|Id=ID_VALUECURVE_DMX1|Type=Sine|Min=0.00|Max=255.00|RV=FALSE|P1=128.00|P2=60.00|P3=2.00|P4=0.00|"
        ));
    }

    #[test]
    fn static_values_fill_sliders() {
        let fixture = FixtureInstance::standard("MH1", "Dmx MH1");
        let builder = DmxSettingsBuilder::new(&fixture);
        let value = ChannelValue::static_value(ChannelName::Dimmer, 200, 0, 255).unwrap();
        let settings = builder.build(&segment_with(value)).unwrap();
        // Dimmer is channel 6 in the standard mapping.
        assert!(settings.contains("E_SLIDER_DMX6=200"));
        assert!(!settings.contains("E_VALUECURVE_DMX6"));
    }

    #[test]
    fn settings_order_and_channel_padding() {
        let fixture = FixtureInstance::standard("MH1", "Dmx MH1");
        let builder = DmxSettingsBuilder::new(&fixture);
        let value = ChannelValue::static_value(ChannelName::Pan, 10, 0, 255).unwrap();
        let settings = builder.build(&segment_with(value)).unwrap();
        let parts: Vec<&str> = settings.split(',').collect();

        assert_eq!(parts[0], "B_CHOICE_BufferStyle=Per Model Default");
        // 16 inversion flags, then the notebook, then 16 sliders.
        assert_eq!(parts.len(), 1 + 16 + 1 + 16);
        assert_eq!(parts[1], "E_CHECKBOX_INVDMX1=0");
        assert_eq!(parts[17], "E_NOTEBOOK1=Channels 1-16");
    }

    #[test]
    fn inversion_flags_follow_fixture_config() {
        let mut fixture = FixtureInstance::standard("MH1", "Dmx MH1");
        fixture.inversions.tilt = true;
        let builder = DmxSettingsBuilder::new(&fixture);
        let value = ChannelValue::static_value(ChannelName::Tilt, 99, 0, 255).unwrap();
        let settings = builder.build(&segment_with(value)).unwrap();
        // Tilt is channel 3.
        assert!(settings.contains("E_CHECKBOX_INVDMX3=1"));
        assert!(settings.contains("E_CHECKBOX_INVDMX1=0"));
    }

    #[test]
    fn smoothstep_serializes_as_custom_curve() {
        let fixture = FixtureInstance::standard("MH1", "Dmx MH1");
        let builder = DmxSettingsBuilder::new(&fixture);
        let value = ChannelValue::absolute_curve(
            ChannelName::Dimmer,
            Curve::native(NativeKind::SmoothStep),
            0,
            255,
        )
        .unwrap();
        let settings = builder.build(&segment_with(value)).unwrap();
        assert!(settings.contains("Type=Custom"));
        assert!(settings.contains("Values=0.0000:0.00;"));
    }

    #[test]
    fn identical_segments_share_settings_strings() {
        let fixture = FixtureInstance::standard("MH1", "Dmx MH1");
        let builder = DmxSettingsBuilder::new(&fixture);
        let value = ChannelValue::static_value(ChannelName::Pan, 42, 0, 255).unwrap();
        let a = builder.build(&segment_with(value.clone())).unwrap();
        let b = builder.build(&segment_with(value)).unwrap();
        assert_eq!(a, b);
    }
}
