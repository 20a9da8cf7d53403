//! Resolution of [`TimeRef`]s to milliseconds.

use std::collections::BTreeMap;

use tracing::warn;

use super::BeatGrid;

/// A moment in the song, addressed symbolically.
///
/// Bars, beats and subdivisions are 1-indexed bars / 1-indexed beats /
/// 0-indexed sixteenths-within-beat. The declared ordering (used by the
/// monotonicity property of resolution) is the derived [`PartialOrd`]:
/// comparable within a variant, incomparable across variants.
#[derive(Debug, Clone, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRef {
    /// An absolute millisecond offset from the song start.
    AbsoluteMs(i64),
    /// A musical position on the grid.
    BarBeat {
        /// 1-indexed bar.
        bar: u32,
        /// 1-indexed beat within the bar.
        beat: u32,
        /// Optional sixteenth-note offset within the beat (0..=3).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subdivision: Option<u32>,
    },
    /// An endpoint of a named plan section.
    Symbolic {
        /// The section to anchor at.
        section_id: String,
        /// `false` resolves to the section start, `true` to its end.
        #[serde(default)]
        end_of_section: bool,
    },
}

/// Millisecond span of one plan section, keyed by section id in the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SectionSpan {
    /// Section start (inclusive).
    pub start_ms: i64,
    /// Section end (exclusive).
    pub end_ms: i64,
}

/// The outcome of resolving a [`TimeRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved offset in milliseconds.
    pub ms: i64,
    /// Whether the reference was out of range and clamped to a boundary.
    pub clamped: bool,
}

impl Resolution {
    fn exact(ms: i64) -> Self {
        Self { ms, clamped: false }
    }

    fn clamped(ms: i64) -> Self {
        Self { ms, clamped: true }
    }
}

/// Pure resolver from [`TimeRef`] to milliseconds.
///
/// Borrows a [`BeatGrid`] and a `section_id -> span` map. Out-of-range
/// references clamp to the nearest boundary and record the clamp; resolution
/// never fails.
#[derive(Debug, Clone)]
pub struct TimeResolver<'g> {
    grid: &'g BeatGrid,
    sections: BTreeMap<String, SectionSpan>,
}

impl<'g> TimeResolver<'g> {
    /// Creates a resolver over a grid and a section span map.
    #[must_use]
    pub fn new(grid: &'g BeatGrid, sections: BTreeMap<String, SectionSpan>) -> Self {
        Self { grid, sections }
    }

    /// Resolves a reference to milliseconds.
    #[must_use]
    pub fn resolve(&self, time_ref: &TimeRef) -> Resolution {
        match time_ref {
            TimeRef::AbsoluteMs(ms) => {
                let clamped = (*ms).clamp(0, self.grid.duration_ms());
                if clamped == *ms {
                    Resolution::exact(*ms)
                } else {
                    warn!(ms, "absolute time reference outside song, clamping");
                    Resolution::clamped(clamped)
                }
            }
            TimeRef::BarBeat {
                bar,
                beat,
                subdivision,
            } => self.resolve_bar_beat(*bar, *beat, *subdivision),
            TimeRef::Symbolic {
                section_id,
                end_of_section,
            } => match self.sections.get(section_id) {
                Some(span) => Resolution::exact(if *end_of_section {
                    span.end_ms
                } else {
                    span.start_ms
                }),
                None => {
                    warn!(section_id, "unknown section in time reference, clamping");
                    Resolution::clamped(if *end_of_section {
                        self.grid.duration_ms()
                    } else {
                        0
                    })
                }
            },
        }
    }

    fn resolve_bar_beat(&self, bar: u32, beat: u32, subdivision: Option<u32>) -> Resolution {
        let total_bars = self.grid.total_bars();
        if bar == 0 || beat == 0 {
            warn!(bar, beat, "bar/beat are 1-indexed, clamping to start");
            return Resolution::clamped(0);
        }
        if bar > total_bars {
            warn!(bar, total_bars, "bar beyond song, clamping to song end");
            return Resolution::clamped(self.grid.duration_ms());
        }

        let mut clamped = false;
        let beats_per_bar = self.grid.beats_per_bar();
        let beat = if beat > beats_per_bar {
            warn!(beat, beats_per_bar, "beat beyond bar, clamping to last beat");
            clamped = true;
            beats_per_bar
        } else {
            beat
        };

        // bar_start is valid here: bar is within 1..=total_bars.
        let bar_ms = self.grid.bar_start(bar).unwrap_or(0);
        let ms_per_beat = self.grid.ms_per_beat_at(bar);
        let mut ms = bar_ms as f64 + f64::from(beat - 1) * ms_per_beat;

        if let Some(sub) = subdivision {
            let sub = if sub > 3 {
                warn!(sub, "subdivision beyond beat, clamping to last sixteenth");
                clamped = true;
                3
            } else {
                sub
            };
            ms += f64::from(sub) * ms_per_beat / 4.0;
        }

        let ms = (ms.round() as i64).min(self.grid.duration_ms());
        if clamped {
            Resolution::clamped(ms)
        } else {
            Resolution::exact(ms)
        }
    }

    /// Millisecond window of an inclusive 1-indexed bar range (end exclusive).
    #[must_use]
    pub fn bar_window(&self, start_bar: u32, end_bar: u32) -> (i64, i64) {
        self.grid.bar_window(start_bar, end_bar)
    }

    /// The grid this resolver reads from.
    #[must_use]
    pub fn grid(&self) -> &BeatGrid {
        self.grid
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn resolver_fixture(grid: &BeatGrid) -> TimeResolver<'_> {
        let mut sections = BTreeMap::new();
        sections.insert(
            "verse".to_owned(),
            SectionSpan {
                start_ms: 0,
                end_ms: 4_000,
            },
        );
        sections.insert(
            "chorus".to_owned(),
            SectionSpan {
                start_ms: 4_000,
                end_ms: 8_000,
            },
        );
        TimeResolver::new(grid, sections)
    }

    #[test]
    fn bar_beat_resolution_is_one_indexed() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let resolver = resolver_fixture(&grid);
        let first = resolver.resolve(&TimeRef::BarBeat {
            bar: 1,
            beat: 1,
            subdivision: None,
        });
        assert_eq!(first, Resolution { ms: 0, clamped: false });

        let third_beat_bar_two = resolver.resolve(&TimeRef::BarBeat {
            bar: 2,
            beat: 3,
            subdivision: None,
        });
        assert_eq!(third_beat_bar_two.ms, 3_000);
    }

    #[test]
    fn subdivision_adds_sixteenths() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let resolver = resolver_fixture(&grid);
        let r = resolver.resolve(&TimeRef::BarBeat {
            bar: 1,
            beat: 2,
            subdivision: Some(2),
        });
        // Beat 2 starts at 500ms; two sixteenths of a 500ms beat add 250ms.
        assert_eq!(r.ms, 750);
        assert!(!r.clamped);
    }

    #[test]
    fn out_of_range_clamps_and_flags() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let resolver = resolver_fixture(&grid);
        let past_end = resolver.resolve(&TimeRef::BarBeat {
            bar: 99,
            beat: 1,
            subdivision: None,
        });
        assert_eq!(past_end, Resolution { ms: 8_000, clamped: true });

        let bad_beat = resolver.resolve(&TimeRef::BarBeat {
            bar: 1,
            beat: 9,
            subdivision: None,
        });
        assert!(bad_beat.clamped);
        assert_eq!(bad_beat.ms, 1_500);
    }

    #[test]
    fn symbolic_resolution() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let resolver = resolver_fixture(&grid);
        let start = resolver.resolve(&TimeRef::Symbolic {
            section_id: "chorus".into(),
            end_of_section: false,
        });
        assert_eq!(start.ms, 4_000);
        let end = resolver.resolve(&TimeRef::Symbolic {
            section_id: "chorus".into(),
            end_of_section: true,
        });
        assert_eq!(end.ms, 8_000);

        let unknown = resolver.resolve(&TimeRef::Symbolic {
            section_id: "bridge".into(),
            end_of_section: false,
        });
        assert!(unknown.clamped);
    }

    #[test]
    fn resolution_is_monotone_over_bar_beat_order() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 16_000).unwrap();
        let resolver = resolver_fixture(&grid);
        let mut previous = i64::MIN;
        for bar in 1..=8 {
            for beat in 1..=4 {
                for sub in 0..4 {
                    let r = resolver.resolve(&TimeRef::BarBeat {
                        bar,
                        beat,
                        subdivision: Some(sub),
                    });
                    assert!(r.ms >= previous, "non-monotone at {bar}/{beat}/{sub}");
                    previous = r.ms;
                }
            }
        }
    }
}
