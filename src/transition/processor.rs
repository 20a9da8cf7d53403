//! The transition processor: walks boundaries and renders the final timeline.

use std::collections::BTreeMap;

use itertools::Itertools;
use tracing::debug;

use crate::{
    curve::{Curve, CurvePoint, NativeKind},
    fixture::{Pose, RigProfile},
    segment::{ChannelName, ChannelValue, FixtureSegment},
};

use super::{
    Boundary, BoundaryKind, TransitionHint, blend_value,
    boundary::detect_boundaries,
    gap_fill::{
        FixtureLimits, GapContext, render_large_gap, render_sequence_end, render_sequence_start,
        render_small_gap,
    },
};

/// Tunables of the transition engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionConfig {
    /// Gaps at least this long get the 40/20/40 treatment.
    pub large_gap_threshold_ms: i64,
    /// Gaps under this are filled entirely; snap-centering would starve them.
    pub min_fill_ms: i64,
    /// Abutting exit/entry windows within this tolerance merge into a single
    /// blended region.
    pub collapse_tolerance_ms: i64,
    /// The canonical rest pose gap fill eases through.
    pub soft_home: Pose,
    /// Fraction of the dimmer ceiling held through a dramatic pause.
    pub dimmer_dip_fraction: f64,
    /// Sample count of blended curves.
    pub n_samples: usize,
    /// Easing curve when no hint declares one.
    pub default_curve: NativeKind,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            large_gap_threshold_ms: 5_000,
            min_fill_ms: 10,
            collapse_tolerance_ms: 1,
            soft_home: Pose::soft_home(),
            dimmer_dip_fraction: 0.12,
            n_samples: 33,
            default_curve: NativeKind::SmoothStep,
        }
    }
}

/// A section's declared entry/exit transitions, as budgeted by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionTransitions {
    /// Section these hints belong to.
    pub section_id: String,
    /// Easing into the section.
    pub entry: Option<TransitionHint>,
    /// Easing out of the section.
    pub exit: Option<TransitionHint>,
}

/// Walks a compiled timeline, blends section boundaries and fills gaps.
#[derive(Debug, Clone)]
pub struct TransitionProcessor<'a> {
    config: TransitionConfig,
    rig: &'a RigProfile,
    ms_per_bar: f64,
    sections: BTreeMap<String, (Option<TransitionHint>, Option<TransitionHint>)>,
}

impl<'a> TransitionProcessor<'a> {
    /// Creates a processor over a rig and the sections' transition hints.
    #[must_use]
    pub fn new(
        config: TransitionConfig,
        rig: &'a RigProfile,
        ms_per_bar: f64,
        sections: Vec<SectionTransitions>,
    ) -> Self {
        let sections = sections
            .into_iter()
            .map(|s| (s.section_id, (s.entry, s.exit)))
            .collect();
        Self {
            config,
            rig,
            ms_per_bar,
            sections,
        }
    }

    fn entry_hint(&self, section_id: &str) -> Option<&TransitionHint> {
        self.sections
            .get(section_id)
            .and_then(|(entry, _)| entry.as_ref())
            .filter(|h| !h.is_snap())
    }

    fn exit_hint(&self, section_id: &str) -> Option<&TransitionHint> {
        self.sections
            .get(section_id)
            .and_then(|(_, exit)| exit.as_ref())
            .filter(|h| !h.is_snap())
    }

    fn limits_for(&self, fixture_id: &str) -> FixtureLimits {
        let calibration = self
            .rig
            .fixture(fixture_id)
            .map(|f| f.calibration)
            .unwrap_or_default();
        FixtureLimits::from_calibration(&calibration, self.config.soft_home)
    }

    /// Processes the sorted timeline: blends boundaries, fills gaps and
    /// returns the merged result sorted by `(fixture_id, t0_ms)`.
    #[must_use]
    pub fn process(
        &self,
        mut segments: Vec<FixtureSegment>,
        total_duration_ms: i64,
    ) -> Vec<FixtureSegment> {
        segments.sort_by(|a, b| {
            a.fixture_id
                .cmp(&b.fixture_id)
                .then(a.t0_ms.cmp(&b.t0_ms))
        });
        let boundaries = detect_boundaries(&segments, total_duration_ms);
        debug!(boundaries = boundaries.len(), "processing boundaries");

        let mut produced: Vec<FixtureSegment> = Vec::new();
        // Index -> (new_t0, new_t1) trims applied after the walk.
        let mut trims: BTreeMap<usize, (i64, i64)> = BTreeMap::new();

        for boundary in &boundaries {
            match boundary.kind {
                BoundaryKind::SectionBoundary => {
                    self.blend_adjacency(boundary, &segments, &mut produced, &mut trims);
                }
                BoundaryKind::StepBoundary => {
                    // Steps inside one section snap; the template already
                    // shaped their curves to meet.
                }
                BoundaryKind::Gap => {
                    self.fill_gap(boundary, &segments, &mut produced);
                }
                BoundaryKind::SequenceStart => {
                    self.fill_sequence_edge(boundary, &segments, &mut produced, true);
                }
                BoundaryKind::SequenceEnd => {
                    self.fill_sequence_edge(boundary, &segments, &mut produced, false);
                }
            }
        }

        let mut merged: Vec<FixtureSegment> = segments
            .into_iter()
            .enumerate()
            .filter_map(|(idx, mut segment)| {
                if let Some((t0, t1)) = trims.get(&idx) {
                    segment.t0_ms = *t0;
                    segment.t1_ms = *t1;
                }
                (segment.t1_ms > segment.t0_ms).then_some(segment)
            })
            .collect();
        merged.extend(produced);
        merged.sort_by(|a, b| {
            a.fixture_id
                .cmp(&b.fixture_id)
                .then(a.t0_ms.cmp(&b.t0_ms))
        });
        merged
    }

    /// Blends a zero-gap section boundary.
    ///
    /// When both an exit and an entry hint exist their windows abut, so they
    /// merge into one region carrying the out-config for the first half and
    /// the in-config for the second; the neighbors are trimmed by the region.
    fn blend_adjacency(
        &self,
        boundary: &Boundary,
        segments: &[FixtureSegment],
        produced: &mut Vec<FixtureSegment>,
        trims: &mut BTreeMap<usize, (i64, i64)>,
    ) {
        let (Some(left_idx), Some(right_idx)) = (boundary.left, boundary.right) else {
            return;
        };
        let left = &segments[left_idx];
        let right = &segments[right_idx];
        let exit = self.exit_hint(&left.section_id);
        let entry = self.entry_hint(&right.section_id);
        if exit.is_none() && entry.is_none() {
            return;
        }

        let boundary_ms = boundary.gap_start_ms;
        let d_out = exit
            .map(|h| (h.duration_bars * self.ms_per_bar) as i64)
            .unwrap_or(0)
            .min(left.duration_ms() / 2);
        let d_in = entry
            .map(|h| (h.duration_bars * self.ms_per_bar) as i64)
            .unwrap_or(0)
            .min(right.duration_ms() / 2);
        if d_out + d_in < 1 {
            return;
        }
        let t0 = boundary_ms - d_out;
        let t1 = boundary_ms + d_in;

        let segment =
            self.blended_transition_segment(&boundary.fixture_id, left, right, exit, entry, t0, t1);

        trims
            .entry(left_idx)
            .and_modify(|(_, t1_ms)| *t1_ms = (*t1_ms).min(t0))
            .or_insert((left.t0_ms, t0));
        trims
            .entry(right_idx)
            .and_modify(|(t0_ms, _)| *t0_ms = (*t0_ms).max(t1))
            .or_insert((t1, right.t1_ms));
        produced.push(segment);
    }

    /// Builds one blended region between two effects, honoring the out-config
    /// for the first half and the in-config for the second.
    #[allow(clippy::too_many_arguments)]
    fn blended_transition_segment(
        &self,
        fixture_id: &str,
        left: &FixtureSegment,
        right: &FixtureSegment,
        exit: Option<&TransitionHint>,
        entry: Option<&TransitionHint>,
        t0: i64,
        t1: i64,
    ) -> FixtureSegment {
        let limits = self.limits_for(fixture_id);
        let mut segment = FixtureSegment::new(
            right.section_id.clone(),
            "transition",
            "transition",
            format!("transition_{fixture_id}_{t0}"),
            fixture_id,
            t0,
            t1,
        )
        .expect("transition window is ordered");
        segment.allow_grouping = false;
        segment
            .metadata
            .insert("kind".to_owned(), "transition".to_owned());
        segment.metadata.insert(
            "between".to_owned(),
            format!("{}/{}", left.section_id, right.section_id),
        );

        let channels: Vec<ChannelName> = left
            .channels
            .keys()
            .chain(right.channels.keys())
            .copied()
            .unique()
            .collect();
        for channel in channels {
            let src = left
                .channel(channel)
                .map(|v| v.dmx_at(1.0))
                .unwrap_or_else(|| right.channel(channel).map_or(0.0, |v| v.dmx_at(0.0)));
            let tgt = right
                .channel(channel)
                .map(|v| v.dmx_at(0.0))
                .unwrap_or(src);

            let out_strategy = exit.or(entry).map(|h| h.strategy_for(channel));
            let in_strategy = entry.or(exit).map(|h| h.strategy_for(channel));
            let (Some(out_strategy), Some(in_strategy)) = (out_strategy, in_strategy) else {
                continue;
            };

            let clamp = match channel {
                ChannelName::Pan => limits.pan,
                ChannelName::Tilt => limits.tilt,
                ChannelName::Dimmer => limits.dimmer,
                _ => (0, 255),
            };
            let (lo, hi) = (f64::from(clamp.0), f64::from(clamp.1));
            let span = (hi - lo).max(1.0);
            let last = (self.config.n_samples.max(2) - 1) as f64;
            let points: Vec<CurvePoint> = (0..self.config.n_samples.max(2))
                .map(|i| {
                    let t = i as f64 / last;
                    let strategy = if t < 0.5 { out_strategy } else { in_strategy };
                    let dmx = blend_value(strategy, src, tgt, t).clamp(lo, hi);
                    CurvePoint::new(t, (dmx - lo) / span)
                })
                .collect();
            segment.set_channel(
                ChannelValue::absolute_curve(channel, Curve::Custom(points), clamp.0, clamp.1)
                    .expect("calibration clamp is ordered"),
            );
        }
        segment
    }

    /// Fills a hole between two segments.
    fn fill_gap(
        &self,
        boundary: &Boundary,
        segments: &[FixtureSegment],
        produced: &mut Vec<FixtureSegment>,
    ) {
        let gap = boundary.gap_ms();
        if gap <= 0 {
            return;
        }
        let prev = boundary.left.map(|i| &segments[i]);
        let next = boundary.right.map(|i| &segments[i]);
        let section_id = next
            .or(prev)
            .map(|s| s.section_id.clone())
            .unwrap_or_default();

        // Adjacent-gap collapse: when the hole is exactly the abutting exit
        // and entry windows the compiler reserved, the whole gap becomes one
        // blended region carrying both configs.
        if let (Some(left), Some(right)) = (prev, next) {
            let exit = self.exit_hint(&left.section_id);
            let entry = self.entry_hint(&right.section_id);
            let d_out = exit.map_or(0, |h| (h.duration_bars * self.ms_per_bar) as i64);
            let d_in = entry.map_or(0, |h| (h.duration_bars * self.ms_per_bar) as i64);
            if d_out + d_in > 0 && gap <= d_out + d_in + self.config.collapse_tolerance_ms {
                produced.push(self.blended_transition_segment(
                    &boundary.fixture_id,
                    left,
                    right,
                    exit,
                    entry,
                    boundary.gap_start_ms,
                    boundary.gap_end_ms,
                ));
                return;
            }
        }

        let hint = next.and_then(|n| self.entry_hint(&n.section_id));
        let curve = hint.map_or(self.config.default_curve, |h| h.curve);

        // Timing snap: a declared duration larger than the gap clamps to it, a
        // smaller one centers. Tiny gaps are filled entirely.
        let (start_ms, end_ms) = if gap < self.config.min_fill_ms
            || gap >= self.config.large_gap_threshold_ms
        {
            (boundary.gap_start_ms, boundary.gap_end_ms)
        } else {
            match hint {
                Some(h) => {
                    let declared = (h.duration_bars * self.ms_per_bar) as i64;
                    if declared >= gap {
                        (boundary.gap_start_ms, boundary.gap_end_ms)
                    } else {
                        let pad = (gap - declared) / 2;
                        (boundary.gap_start_ms + pad, boundary.gap_end_ms - pad)
                    }
                }
                None => (boundary.gap_start_ms, boundary.gap_end_ms),
            }
        };

        let ctx = GapContext {
            fixture_id: &boundary.fixture_id,
            section_id,
            limits: self.limits_for(&boundary.fixture_id),
            prev,
            next,
            start_ms,
            end_ms,
            curve,
            n_samples: self.config.n_samples,
            dip_fraction: self.config.dimmer_dip_fraction,
        };
        if gap >= self.config.large_gap_threshold_ms {
            produced.extend(render_large_gap(&ctx));
        } else {
            produced.extend(render_small_gap(&ctx));
        }
    }

    /// Fills the lead-in or tail-out against the song edges.
    fn fill_sequence_edge(
        &self,
        boundary: &Boundary,
        segments: &[FixtureSegment],
        produced: &mut Vec<FixtureSegment>,
        is_start: bool,
    ) {
        let gap = boundary.gap_ms();
        if gap <= 0 {
            return;
        }
        let prev = boundary.left.map(|i| &segments[i]);
        let next = boundary.right.map(|i| &segments[i]);
        let neighbor = if is_start { next } else { prev };
        let section_id = neighbor.map(|s| s.section_id.clone()).unwrap_or_default();

        let hint = if is_start {
            next.and_then(|n| self.entry_hint(&n.section_id))
        } else {
            prev.and_then(|p| self.exit_hint(&p.section_id))
        };
        let curve = hint.map_or(self.config.default_curve, |h| h.curve);
        // Anchor the easing against the neighboring effect: lead-ins end
        // exactly when the first effect starts, tail-outs start when the last
        // effect ends.
        let declared = hint
            .map(|h| (h.duration_bars * self.ms_per_bar) as i64)
            .unwrap_or(gap)
            .clamp(self.config.min_fill_ms.min(gap), gap);
        let (start_ms, end_ms) = if is_start {
            (boundary.gap_end_ms - declared, boundary.gap_end_ms)
        } else {
            (boundary.gap_start_ms, boundary.gap_start_ms + declared)
        };

        let ctx = GapContext {
            fixture_id: &boundary.fixture_id,
            section_id,
            limits: self.limits_for(&boundary.fixture_id),
            prev,
            next,
            start_ms,
            end_ms,
            curve,
            n_samples: self.config.n_samples,
            dip_fraction: self.config.dimmer_dip_fraction,
        };
        if is_start {
            produced.extend(render_sequence_start(&ctx));
        } else {
            produced.extend(render_sequence_end(&ctx));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::transition::TransitionMode;

    use super::*;

    fn rig() -> RigProfile {
        RigProfile::single("MH1", "Dmx MH1")
    }

    fn effect(section: &str, t0: i64, t1: i64) -> FixtureSegment {
        let mut segment = FixtureSegment::new(
            section,
            "step_1",
            "tpl",
            format!("{section}_{t0}"),
            "MH1",
            t0,
            t1,
        )
        .unwrap();
        segment.set_channel(ChannelValue::static_value(ChannelName::Pan, 180, 0, 255).unwrap());
        segment.set_channel(ChannelValue::static_value(ChannelName::Tilt, 100, 0, 255).unwrap());
        segment
            .set_channel(ChannelValue::static_value(ChannelName::Dimmer, 220, 0, 255).unwrap());
        segment
    }

    fn hints(section: &str, entry_bars: f64, exit_bars: f64) -> SectionTransitions {
        SectionTransitions {
            section_id: section.to_owned(),
            entry: (entry_bars > 0.0)
                .then(|| TransitionHint::new(TransitionMode::Crossfade, entry_bars)),
            exit: (exit_bars > 0.0)
                .then(|| TransitionHint::new(TransitionMode::Crossfade, exit_bars)),
        }
    }

    #[test]
    fn section_boundary_collapses_into_one_blended_region() {
        // Two sections meeting at 16000ms; 1-bar exit + 1-bar entry at
        // 2000ms/bar merge into a single 4000ms region.
        let rig = rig();
        let processor = TransitionProcessor::new(
            TransitionConfig::default(),
            &rig,
            2_000.0,
            vec![hints("a", 0.0, 1.0), hints("b", 1.0, 0.0)],
        );
        let timeline = vec![effect("a", 0, 16_000), effect("b", 16_000, 32_000)];
        let out = processor.process(timeline, 32_000);

        assert_eq!(out.len(), 3);
        assert_eq!((out[0].t0_ms, out[0].t1_ms), (0, 14_000));
        assert_eq!((out[1].t0_ms, out[1].t1_ms), (14_000, 18_000));
        assert_eq!((out[2].t0_ms, out[2].t1_ms), (18_000, 32_000));
        assert_eq!(out[1].metadata.get("kind").map(String::as_str), Some("transition"));
    }

    #[test]
    fn zero_gap_without_hints_is_untouched() {
        let rig = rig();
        let processor =
            TransitionProcessor::new(TransitionConfig::default(), &rig, 2_000.0, Vec::new());
        let timeline = vec![effect("a", 0, 16_000), effect("b", 16_000, 32_000)];
        let out = processor.process(timeline.clone(), 32_000);
        assert_eq!(out, timeline);
    }

    #[test]
    fn small_gap_centers_a_shorter_declared_transition() {
        let rig = rig();
        let processor = TransitionProcessor::new(
            TransitionConfig::default(),
            &rig,
            1_000.0,
            vec![hints("b", 1.0, 0.0)],
        );
        // 3000ms gap, declared 1 bar = 1000ms: centered with 1000ms padding.
        let timeline = vec![effect("a", 0, 4_000), effect("b", 7_000, 10_000)];
        let out = processor.process(timeline, 10_000);
        let fill = out
            .iter()
            .find(|s| s.metadata.get("kind").map(String::as_str) == Some("gap_fill"))
            .unwrap();
        assert_eq!((fill.t0_ms, fill.t1_ms), (5_000, 6_000));
    }

    #[test]
    fn small_gap_clamps_an_oversized_declared_transition() {
        let rig = rig();
        let processor = TransitionProcessor::new(
            TransitionConfig::default(),
            &rig,
            1_000.0,
            vec![hints("b", 4.0, 0.0)],
        );
        let timeline = vec![effect("a", 0, 4_000), effect("b", 5_000, 9_000)];
        let out = processor.process(timeline, 9_000);
        // The declared 4-bar transition clamps to the 1000ms hole, which is
        // then covered by a single blended region.
        let fill = out
            .iter()
            .find(|s| s.metadata.get("kind").map(String::as_str) == Some("transition"))
            .unwrap();
        assert_eq!((fill.t0_ms, fill.t1_ms), (4_000, 5_000));
    }

    #[test]
    fn large_gap_renders_three_phases() {
        let rig = rig();
        let processor =
            TransitionProcessor::new(TransitionConfig::default(), &rig, 2_000.0, Vec::new());
        // 6-second hole with effects on both sides.
        let timeline = vec![effect("a", 0, 4_000), effect("b", 10_000, 14_000)];
        let out = processor.process(timeline, 14_000);
        let fills: Vec<&FixtureSegment> = out
            .iter()
            .filter(|s| s.metadata.get("kind").map(String::as_str) == Some("gap_fill"))
            .collect();
        assert_eq!(fills.len(), 3);
        assert_eq!((fills[0].t0_ms, fills[0].t1_ms), (4_000, 6_400));
        assert_eq!((fills[1].t0_ms, fills[1].t1_ms), (6_400, 7_600));
        assert_eq!((fills[2].t0_ms, fills[2].t1_ms), (7_600, 10_000));
        // Middle phase holds a dipped, non-zero dimmer.
        let dip = fills[1].channel(ChannelName::Dimmer).unwrap().static_dmx.unwrap();
        assert!(dip > 0 && dip < 220);
    }

    #[test]
    fn sequence_edges_are_filled() {
        let rig = rig();
        let processor =
            TransitionProcessor::new(TransitionConfig::default(), &rig, 2_000.0, Vec::new());
        let timeline = vec![effect("a", 2_000, 6_000)];
        let out = processor.process(timeline, 8_000);
        let phases: Vec<&str> = out
            .iter()
            .filter_map(|s| s.metadata.get("phase").map(String::as_str))
            .collect();
        assert_eq!(phases, ["sequence_start", "sequence_end"]);
        assert_eq!((out[0].t0_ms, out[0].t1_ms), (0, 2_000));
        assert_eq!((out[2].t0_ms, out[2].t1_ms), (6_000, 8_000));
    }

    #[test]
    fn covered_song_produces_no_fills() {
        let rig = rig();
        let processor =
            TransitionProcessor::new(TransitionConfig::default(), &rig, 2_000.0, Vec::new());
        let timeline = vec![effect("a", 0, 8_000)];
        let out = processor.process(timeline.clone(), 8_000);
        assert_eq!(out, timeline);
    }
}
