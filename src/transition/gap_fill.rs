//! Gap-fill rendering: soft-home easing, small-gap interpolation and the
//! large-gap 40/20/40 phasing.

use crate::{
    curve::{Curve, CurvePoint, NativeKind},
    fixture::{FixtureCalibration, Pose},
    segment::{ChannelName, ChannelValue, FixtureSegment},
};

use super::{TransitionStrategy, blend_value};

/// Per-fixture limits and rest position the gap filler works in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct FixtureLimits {
    pub pan: (u8, u8),
    pub tilt: (u8, u8),
    pub dimmer: (u8, u8),
    pub soft_home_pan: u8,
    pub soft_home_tilt: u8,
}

impl FixtureLimits {
    pub(super) fn from_calibration(cal: &FixtureCalibration, soft_home: Pose) -> Self {
        let (soft_home_pan, soft_home_tilt) = cal.degrees_to_dmx(soft_home);
        Self {
            pan: (cal.pan_min_dmx, cal.pan_max_dmx),
            tilt: (cal.tilt_min_dmx, cal.tilt_max_dmx),
            dimmer: (cal.dimmer_floor_dmx, cal.dimmer_ceiling_dmx.max(cal.dimmer_floor_dmx)),
            soft_home_pan,
            soft_home_tilt,
        }
    }

    fn clamp_for(&self, channel: ChannelName) -> (u8, u8) {
        match channel {
            ChannelName::Pan => self.pan,
            ChannelName::Tilt => self.tilt,
            ChannelName::Dimmer => self.dimmer,
            _ => (0, 255),
        }
    }
}

/// Everything needed to render one gap on one fixture.
#[derive(Debug, Clone)]
pub(super) struct GapContext<'a> {
    pub fixture_id: &'a str,
    pub section_id: String,
    pub limits: FixtureLimits,
    pub prev: Option<&'a FixtureSegment>,
    pub next: Option<&'a FixtureSegment>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub curve: NativeKind,
    pub n_samples: usize,
    pub dip_fraction: f64,
}

impl GapContext<'_> {
    fn strategy(&self) -> TransitionStrategy {
        TransitionStrategy::SmoothInterpolation(self.curve)
    }

    /// DMX value of a neighbor channel at its boundary-facing end.
    fn anchor(&self, side: Side, channel: ChannelName) -> Option<f64> {
        let (segment, t) = match side {
            Side::Prev => (self.prev?, 1.0),
            Side::Next => (self.next?, 0.0),
        };
        segment.channel(channel).map(|value| value.dmx_at(t))
    }

    fn soft_home_for(&self, channel: ChannelName) -> f64 {
        match channel {
            ChannelName::Pan => f64::from(self.limits.soft_home_pan),
            ChannelName::Tilt => f64::from(self.limits.soft_home_tilt),
            ChannelName::Dimmer => f64::from(self.limits.dimmer.0),
            _ => 0.0,
        }
    }

    /// The dimmer level held through a dramatic pause: a fraction of the
    /// ceiling, floor-clamped, and never absolute zero.
    fn dimmer_dip(&self) -> f64 {
        let (floor, ceiling) = self.limits.dimmer;
        (f64::from(ceiling) * self.dip_fraction)
            .max(f64::from(floor))
            .max(1.0)
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Prev,
    Next,
}

/// Builds a channel easing from one DMX value to another over the window.
fn eased_channel(
    channel: ChannelName,
    from_dmx: f64,
    to_dmx: f64,
    strategy: TransitionStrategy,
    n_samples: usize,
    clamp: (u8, u8),
) -> ChannelValue {
    let (lo, hi) = (f64::from(clamp.0), f64::from(clamp.1));
    let span = (hi - lo).max(1.0);
    let last = (n_samples.max(2) - 1) as f64;
    let points: Vec<CurvePoint> = (0..n_samples.max(2))
        .map(|i| {
            let t = i as f64 / last;
            let dmx = blend_value(strategy, from_dmx, to_dmx, t).clamp(lo, hi);
            CurvePoint::new(t, (dmx - lo) / span)
        })
        .collect();
    ChannelValue::absolute_curve(channel, Curve::Custom(points), clamp.0, clamp.1)
        .expect("clamp interval from calibration is ordered")
}

fn static_channel(channel: ChannelName, dmx: f64, clamp: (u8, u8)) -> ChannelValue {
    let dmx = dmx.clamp(f64::from(clamp.0), f64::from(clamp.1)).round() as u8;
    ChannelValue::static_value(channel, dmx, clamp.0, clamp.1)
        .expect("clamp interval from calibration is ordered")
}

fn fill_segment(
    ctx: &GapContext<'_>,
    label: &str,
    t0_ms: i64,
    t1_ms: i64,
    channels: Vec<ChannelValue>,
) -> FixtureSegment {
    let mut segment = FixtureSegment::new(
        ctx.section_id.clone(),
        label,
        "gap_fill",
        format!("gap_{label}_{}_{t0_ms}", ctx.fixture_id),
        ctx.fixture_id,
        t0_ms,
        t1_ms,
    )
    .expect("gap windows are ordered");
    segment.allow_grouping = false;
    segment
        .metadata
        .insert("kind".to_owned(), "gap_fill".to_owned());
    segment.metadata.insert("phase".to_owned(), label.to_owned());
    for value in channels {
        segment.set_channel(value);
    }
    segment
}

/// Eases the rig from soft-home into the next segment's opening state.
pub(super) fn render_sequence_start(ctx: &GapContext<'_>) -> Vec<FixtureSegment> {
    let strategy = ctx.strategy();
    let channels = [ChannelName::Pan, ChannelName::Tilt, ChannelName::Dimmer]
        .into_iter()
        .map(|channel| {
            let home = ctx.soft_home_for(channel);
            match ctx.anchor(Side::Next, channel) {
                Some(target) => eased_channel(
                    channel,
                    home,
                    target,
                    strategy,
                    ctx.n_samples,
                    ctx.limits.clamp_for(channel),
                ),
                None => static_channel(channel, home, ctx.limits.clamp_for(channel)),
            }
        })
        .collect();
    vec![fill_segment(ctx, "sequence_start", ctx.start_ms, ctx.end_ms, channels)]
}

/// Mirror of [`render_sequence_start`]: eases from the final state back to
/// soft-home.
pub(super) fn render_sequence_end(ctx: &GapContext<'_>) -> Vec<FixtureSegment> {
    let strategy = ctx.strategy();
    let channels = [ChannelName::Pan, ChannelName::Tilt, ChannelName::Dimmer]
        .into_iter()
        .map(|channel| {
            let home = ctx.soft_home_for(channel);
            match ctx.anchor(Side::Prev, channel) {
                Some(source) => eased_channel(
                    channel,
                    source,
                    home,
                    strategy,
                    ctx.n_samples,
                    ctx.limits.clamp_for(channel),
                ),
                None => static_channel(channel, home, ctx.limits.clamp_for(channel)),
            }
        })
        .collect();
    vec![fill_segment(ctx, "sequence_end", ctx.start_ms, ctx.end_ms, channels)]
}

/// Direct interpolation from the previous-end anchor to the next-start anchor.
/// A missing movement anchor holds at soft-home instead.
pub(super) fn render_small_gap(ctx: &GapContext<'_>) -> Vec<FixtureSegment> {
    let strategy = ctx.strategy();
    let pan_from = ctx.anchor(Side::Prev, ChannelName::Pan);
    let pan_to = ctx.anchor(Side::Next, ChannelName::Pan);
    let tilt_from = ctx.anchor(Side::Prev, ChannelName::Tilt);
    let tilt_to = ctx.anchor(Side::Next, ChannelName::Tilt);

    let movement_anchored =
        pan_from.is_some() && pan_to.is_some() && tilt_from.is_some() && tilt_to.is_some();

    let mut channels = Vec::new();
    if movement_anchored {
        channels.push(eased_channel(
            ChannelName::Pan,
            pan_from.unwrap_or_default(),
            pan_to.unwrap_or_default(),
            strategy,
            ctx.n_samples,
            ctx.limits.pan,
        ));
        channels.push(eased_channel(
            ChannelName::Tilt,
            tilt_from.unwrap_or_default(),
            tilt_to.unwrap_or_default(),
            strategy,
            ctx.n_samples,
            ctx.limits.tilt,
        ));
    } else {
        channels.push(static_channel(
            ChannelName::Pan,
            f64::from(ctx.limits.soft_home_pan),
            ctx.limits.pan,
        ));
        channels.push(static_channel(
            ChannelName::Tilt,
            f64::from(ctx.limits.soft_home_tilt),
            ctx.limits.tilt,
        ));
    }
    if let (Some(from), Some(to)) = (
        ctx.anchor(Side::Prev, ChannelName::Dimmer),
        ctx.anchor(Side::Next, ChannelName::Dimmer),
    ) {
        channels.push(eased_channel(
            ChannelName::Dimmer,
            from,
            to,
            strategy,
            ctx.n_samples,
            ctx.limits.dimmer,
        ));
    }
    vec![fill_segment(ctx, "small_gap", ctx.start_ms, ctx.end_ms, channels)]
}

/// Three-phase 40/20/40 fill: ease to soft-home, hold with the dimmer pulled
/// low, ease back out. The middle dimmer dips but never reaches zero.
pub(super) fn render_large_gap(ctx: &GapContext<'_>) -> Vec<FixtureSegment> {
    let strategy = ctx.strategy();
    let duration = ctx.end_ms - ctx.start_ms;
    let p1_end = ctx.start_ms + (duration as f64 * 0.4).round() as i64;
    let p2_end = ctx.start_ms + (duration as f64 * 0.6).round() as i64;

    let home_pan = f64::from(ctx.limits.soft_home_pan);
    let home_tilt = f64::from(ctx.limits.soft_home_tilt);
    let dip = ctx.dimmer_dip();

    let pan_from = ctx.anchor(Side::Prev, ChannelName::Pan).unwrap_or(home_pan);
    let tilt_from = ctx.anchor(Side::Prev, ChannelName::Tilt).unwrap_or(home_tilt);
    let dim_from = ctx.anchor(Side::Prev, ChannelName::Dimmer).unwrap_or(dip);
    let pan_to = ctx.anchor(Side::Next, ChannelName::Pan).unwrap_or(home_pan);
    let tilt_to = ctx.anchor(Side::Next, ChannelName::Tilt).unwrap_or(home_tilt);
    let dim_to = ctx.anchor(Side::Next, ChannelName::Dimmer).unwrap_or(dip);

    let ease_in = fill_segment(
        ctx,
        "large_gap_in",
        ctx.start_ms,
        p1_end,
        vec![
            eased_channel(ChannelName::Pan, pan_from, home_pan, strategy, ctx.n_samples, ctx.limits.pan),
            eased_channel(ChannelName::Tilt, tilt_from, home_tilt, strategy, ctx.n_samples, ctx.limits.tilt),
            eased_channel(ChannelName::Dimmer, dim_from, dip, strategy, ctx.n_samples, ctx.limits.dimmer),
        ],
    );
    let hold = fill_segment(
        ctx,
        "large_gap_hold",
        p1_end,
        p2_end,
        vec![
            static_channel(ChannelName::Pan, home_pan, ctx.limits.pan),
            static_channel(ChannelName::Tilt, home_tilt, ctx.limits.tilt),
            static_channel(ChannelName::Dimmer, dip, ctx.limits.dimmer),
        ],
    );
    let ease_out = fill_segment(
        ctx,
        "large_gap_out",
        p2_end,
        ctx.end_ms,
        vec![
            eased_channel(ChannelName::Pan, home_pan, pan_to, strategy, ctx.n_samples, ctx.limits.pan),
            eased_channel(ChannelName::Tilt, home_tilt, tilt_to, strategy, ctx.n_samples, ctx.limits.tilt),
            eased_channel(ChannelName::Dimmer, dip, dim_to, strategy, ctx.n_samples, ctx.limits.dimmer),
        ],
    );
    vec![ease_in, hold, ease_out]
}
