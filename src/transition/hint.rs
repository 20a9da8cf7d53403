//! Transition declarations carried by templates.

use std::collections::BTreeMap;

use crate::{curve::NativeKind, segment::ChannelName};

/// The overall shape of a transition.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransitionMode {
    /// Hard cut at the midpoint.
    Snap,
    /// Equal-power blend.
    Crossfade,
    /// Fade out to black, then up to the target.
    FadeViaBlack,
    /// Shutter-close, hold, shutter-open.
    Sequence,
    /// Fill a timeline hole rather than blend an adjacency.
    GapFill,
}

/// Per-channel blending strategy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStrategy {
    /// Source before the midpoint, target after.
    Snap,
    /// Interpolate source to target by the named curve's value.
    SmoothInterpolation(NativeKind),
    /// Equal-power crossfade, `cos(tπ/2)·src + sin(tπ/2)·tgt`.
    Crossfade,
    /// First half fades the source to 0, second half fades 0 to the target.
    /// For channels where intermediate blends are meaningless (color, gobo).
    FadeViaBlack,
    /// Three phases: close until 0.33, hold closed until 0.66, open to 1.
    Sequence,
}

/// A declared transition between effects.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionHint {
    /// Overall mode.
    pub mode: TransitionMode,
    /// Transition length in bars. Zero means snap regardless of mode.
    pub duration_bars: f64,
    /// Easing curve used by strategies that interpolate.
    #[serde(default = "default_curve")]
    pub curve: NativeKind,
    /// Channel strategies overriding the mode's default.
    #[serde(default)]
    pub per_channel_overrides: BTreeMap<ChannelName, TransitionStrategy>,
}

fn default_curve() -> NativeKind {
    NativeKind::SmoothStep
}

impl TransitionHint {
    /// A hint with no per-channel overrides.
    #[must_use]
    pub fn new(mode: TransitionMode, duration_bars: f64) -> Self {
        Self {
            mode,
            duration_bars,
            curve: default_curve(),
            per_channel_overrides: BTreeMap::new(),
        }
    }

    /// Whether this hint degenerates to a snap: declared so, or zero-length.
    #[must_use]
    pub fn is_snap(&self) -> bool {
        self.mode == TransitionMode::Snap || self.duration_bars == 0.0
    }

    /// The strategy applied to one channel: the override when declared,
    /// otherwise the mode's default.
    #[must_use]
    pub fn strategy_for(&self, channel: ChannelName) -> TransitionStrategy {
        if self.is_snap() {
            return TransitionStrategy::Snap;
        }
        if let Some(strategy) = self.per_channel_overrides.get(&channel) {
            return *strategy;
        }
        match self.mode {
            TransitionMode::Snap => TransitionStrategy::Snap,
            TransitionMode::Crossfade => TransitionStrategy::Crossfade,
            TransitionMode::FadeViaBlack => TransitionStrategy::FadeViaBlack,
            TransitionMode::Sequence => TransitionStrategy::Sequence,
            TransitionMode::GapFill => TransitionStrategy::SmoothInterpolation(self.curve),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn zero_duration_snaps_every_channel() {
        let hint = TransitionHint::new(TransitionMode::Crossfade, 0.0);
        assert!(hint.is_snap());
        for channel in [ChannelName::Pan, ChannelName::Dimmer, ChannelName::Gobo] {
            assert_eq!(hint.strategy_for(channel), TransitionStrategy::Snap);
        }
    }

    #[test]
    fn override_beats_mode_default() {
        let mut hint = TransitionHint::new(TransitionMode::Crossfade, 1.0);
        hint.per_channel_overrides
            .insert(ChannelName::Gobo, TransitionStrategy::FadeViaBlack);
        assert_eq!(
            hint.strategy_for(ChannelName::Gobo),
            TransitionStrategy::FadeViaBlack
        );
        assert_eq!(
            hint.strategy_for(ChannelName::Pan),
            TransitionStrategy::Crossfade
        );
    }
}
