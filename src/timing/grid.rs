//! The [`BeatGrid`] tempo map.

use thiserror::Error;

/// A beat grid failed its construction invariants.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Tempo must be a positive, finite BPM.
    #[error("tempo must be positive and finite, got {0}")]
    NonPositiveTempo(f64),
    /// `beats_per_bar` must be at least 1.
    #[error("beats_per_bar must be >= 1")]
    ZeroBeatsPerBar,
    /// Duration must be positive.
    #[error("duration must be positive, got {0}ms")]
    NonPositiveDuration(i64),
    /// A boundary list was empty.
    #[error("{list} boundary list is empty")]
    EmptyBoundaries {
        /// Which list was empty.
        list: &'static str,
    },
    /// A boundary list was not strictly ascending.
    #[error("{list} boundaries not strictly ascending at index {index}")]
    NotAscending {
        /// Which list violated the ordering.
        list: &'static str,
        /// Index of the first offending entry.
        index: usize,
    },
    /// The first bar boundary must sit at 0 ms.
    #[error("first bar boundary must be 0ms, got {0}ms")]
    FirstBarNotZero(i64),
    /// A bar start did not coincide with its expected beat boundary.
    #[error("beat boundaries misaligned with bar {bar}")]
    MisalignedBeat {
        /// 1-indexed bar whose start disagrees with the beat list.
        bar: u32,
    },
}

/// Immutable tempo map for one song.
///
/// Holds four parallel ordered lists of millisecond offsets for bar, beat,
/// eighth and sixteenth boundaries. Built from audio analysis
/// ([`BeatGrid::from_boundaries`]) or synthesized from a constant BPM
/// ([`BeatGrid::from_constant_bpm`]).
///
/// Invariants (enforced at construction):
///
/// - every boundary list is strictly ascending;
/// - `bar_boundaries[0] == 0`;
/// - `beat_boundaries[k * beats_per_bar] == bar_boundaries[k]` exactly.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BeatGrid {
    tempo_bpm: f64,
    beats_per_bar: u32,
    duration_ms: i64,
    bar_boundaries: Vec<i64>,
    beat_boundaries: Vec<i64>,
    eighth_boundaries: Vec<i64>,
    sixteenth_boundaries: Vec<i64>,
}

fn check_ascending(list: &[i64], name: &'static str) -> Result<(), GridError> {
    if list.is_empty() {
        return Err(GridError::EmptyBoundaries { list: name });
    }
    for (index, pair) in list.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(GridError::NotAscending {
                list: name,
                index: index + 1,
            });
        }
    }
    Ok(())
}

impl BeatGrid {
    /// Synthesizes a grid from a constant tempo.
    ///
    /// Boundaries are generated on an exact fractional lattice and rounded per
    /// entry, so long songs do not accumulate drift.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] when the tempo, meter or duration is degenerate.
    pub fn from_constant_bpm(
        tempo_bpm: f64,
        beats_per_bar: u32,
        duration_ms: i64,
    ) -> Result<Self, GridError> {
        if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
            return Err(GridError::NonPositiveTempo(tempo_bpm));
        }
        if beats_per_bar == 0 {
            return Err(GridError::ZeroBeatsPerBar);
        }
        if duration_ms <= 0 {
            return Err(GridError::NonPositiveDuration(duration_ms));
        }

        let ms_per_beat = 60_000.0 / tempo_bpm;
        let lattice = |step_fraction: f64| -> Vec<i64> {
            let step = ms_per_beat * step_fraction;
            let count = (duration_ms as f64 / step).ceil() as i64;
            (0..count.max(1))
                .map(|k| (k as f64 * step).round() as i64)
                .filter(|&ms| ms < duration_ms)
                .collect()
        };

        let grid = Self {
            tempo_bpm,
            beats_per_bar,
            duration_ms,
            bar_boundaries: lattice(f64::from(beats_per_bar)),
            beat_boundaries: lattice(1.0),
            eighth_boundaries: lattice(0.5),
            sixteenth_boundaries: lattice(0.25),
        };
        grid.check_invariants()?;
        Ok(grid)
    }

    /// Builds a grid from externally analyzed boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] when any list is empty or unsorted, the first bar
    /// is not at 0 ms, or beats do not align with bars.
    pub fn from_boundaries(
        tempo_bpm: f64,
        beats_per_bar: u32,
        duration_ms: i64,
        bar_boundaries: Vec<i64>,
        beat_boundaries: Vec<i64>,
        eighth_boundaries: Vec<i64>,
        sixteenth_boundaries: Vec<i64>,
    ) -> Result<Self, GridError> {
        if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
            return Err(GridError::NonPositiveTempo(tempo_bpm));
        }
        if beats_per_bar == 0 {
            return Err(GridError::ZeroBeatsPerBar);
        }
        if duration_ms <= 0 {
            return Err(GridError::NonPositiveDuration(duration_ms));
        }
        let grid = Self {
            tempo_bpm,
            beats_per_bar,
            duration_ms,
            bar_boundaries,
            beat_boundaries,
            eighth_boundaries,
            sixteenth_boundaries,
        };
        grid.check_invariants()?;
        Ok(grid)
    }

    fn check_invariants(&self) -> Result<(), GridError> {
        check_ascending(&self.bar_boundaries, "bar")?;
        check_ascending(&self.beat_boundaries, "beat")?;
        check_ascending(&self.eighth_boundaries, "eighth")?;
        check_ascending(&self.sixteenth_boundaries, "sixteenth")?;
        if self.bar_boundaries[0] != 0 {
            return Err(GridError::FirstBarNotZero(self.bar_boundaries[0]));
        }
        for (k, &bar_ms) in self.bar_boundaries.iter().enumerate() {
            let beat_index = k * self.beats_per_bar as usize;
            match self.beat_boundaries.get(beat_index) {
                Some(&beat_ms) if beat_ms == bar_ms => {}
                _ => {
                    return Err(GridError::MisalignedBeat { bar: k as u32 + 1 });
                }
            }
        }
        Ok(())
    }

    /// The nominal tempo in beats per minute.
    #[must_use]
    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    /// Beats per bar (typically 4).
    #[must_use]
    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Total song duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Number of bars in the song.
    #[must_use]
    pub fn total_bars(&self) -> u32 {
        self.bar_boundaries.len() as u32
    }

    /// Ordered bar boundary offsets in milliseconds. Entry `k` is the start of
    /// bar `k + 1`.
    #[must_use]
    pub fn bar_boundaries(&self) -> &[i64] {
        &self.bar_boundaries
    }

    /// Ordered beat boundary offsets in milliseconds.
    #[must_use]
    pub fn beat_boundaries(&self) -> &[i64] {
        &self.beat_boundaries
    }

    /// Ordered eighth-note boundary offsets in milliseconds.
    #[must_use]
    pub fn eighth_boundaries(&self) -> &[i64] {
        &self.eighth_boundaries
    }

    /// Ordered sixteenth-note boundary offsets in milliseconds.
    #[must_use]
    pub fn sixteenth_boundaries(&self) -> &[i64] {
        &self.sixteenth_boundaries
    }

    /// Start of a 1-indexed bar, or `None` when the bar is out of range.
    #[must_use]
    pub fn bar_start(&self, bar: u32) -> Option<i64> {
        if bar == 0 {
            return None;
        }
        self.bar_boundaries.get(bar as usize - 1).copied()
    }

    /// Mean bar length in milliseconds.
    ///
    /// Read from the boundary list, not recomputed from tempo, so
    /// tempo-variable grids average correctly.
    #[must_use]
    pub fn ms_per_bar(&self) -> f64 {
        if self.bar_boundaries.len() >= 2 {
            let span = self.bar_boundaries[self.bar_boundaries.len() - 1] - self.bar_boundaries[0];
            span as f64 / (self.bar_boundaries.len() - 1) as f64
        } else {
            f64::from(self.beats_per_bar) * 60_000.0 / self.tempo_bpm
        }
    }

    /// Length of one beat within a 1-indexed bar, read from the grid.
    ///
    /// Out-of-range bars fall back to the nominal tempo.
    #[must_use]
    pub fn ms_per_beat_at(&self, bar: u32) -> f64 {
        let nominal = 60_000.0 / self.tempo_bpm;
        if bar == 0 {
            return nominal;
        }
        let first_beat = (bar as usize - 1) * self.beats_per_bar as usize;
        match (
            self.beat_boundaries.get(first_beat),
            self.beat_boundaries.get(first_beat + 1),
        ) {
            (Some(&a), Some(&b)) => (b - a) as f64,
            _ => nominal,
        }
    }

    /// Millisecond window covered by an inclusive 1-indexed bar range.
    ///
    /// The end is exclusive: `bar_window(s, e)` returns
    /// `(bar_boundaries[s - 1], bar_boundaries[e])` when bar `e + 1` exists,
    /// otherwise the window extends to the song end. Out-of-range bars clamp.
    #[must_use]
    pub fn bar_window(&self, start_bar: u32, end_bar: u32) -> (i64, i64) {
        let total = self.total_bars();
        let start = start_bar.clamp(1, total);
        let end = end_bar.clamp(start, total);
        let start_ms = self.bar_boundaries[start as usize - 1];
        let end_ms = if end < total {
            self.bar_boundaries[end as usize]
        } else {
            self.duration_ms
        };
        (start_ms, end_ms)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn grid_120() -> BeatGrid {
        // 120 BPM, 4/4: 500ms beats, 2000ms bars.
        BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap()
    }

    #[test]
    fn constant_grid_boundaries() {
        let grid = grid_120();
        assert_eq!(grid.bar_boundaries(), &[0, 2_000, 4_000, 6_000]);
        assert_eq!(grid.total_bars(), 4);
        assert_eq!(grid.beat_boundaries().len(), 16);
        assert_eq!(grid.beat_boundaries()[4], 2_000);
        assert_eq!(grid.sixteenth_boundaries().len(), 64);
    }

    #[test]
    fn bar_window_end_exclusive() {
        let grid = grid_120();
        assert_eq!(grid.bar_window(1, 2), (0, 4_000));
        assert_eq!(grid.bar_window(2, 4), (2_000, 8_000));
        assert_eq!(grid.bar_window(4, 4), (6_000, 8_000));
    }

    #[test]
    fn bar_window_clamps_out_of_range() {
        let grid = grid_120();
        assert_eq!(grid.bar_window(1, 99), (0, 8_000));
        assert_eq!(grid.bar_window(0, 2), (0, 4_000));
    }

    #[test]
    fn ms_per_bar_reads_boundaries() {
        let grid = grid_120();
        assert_eq!(grid.ms_per_bar(), 2_000.0);
        assert_eq!(grid.ms_per_beat_at(1), 500.0);
        assert_eq!(grid.ms_per_beat_at(4), 500.0);
    }

    #[test]
    fn rejects_misaligned_beats() {
        let err = BeatGrid::from_boundaries(
            120.0,
            4,
            4_000,
            vec![0, 2_000],
            vec![0, 500, 1_000, 1_500, 2_001, 2_500, 3_000, 3_500],
            vec![0],
            vec![0],
        )
        .unwrap_err();
        assert_eq!(err, GridError::MisalignedBeat { bar: 2 });
    }

    #[test]
    fn rejects_unsorted_bars() {
        let err = BeatGrid::from_boundaries(
            120.0,
            4,
            4_000,
            vec![0, 2_000, 1_999],
            vec![0],
            vec![0],
            vec![0],
        )
        .unwrap_err();
        assert_eq!(
            err,
            GridError::NotAscending {
                list: "bar",
                index: 2
            }
        );
    }

    #[test]
    fn rejects_nonzero_first_bar() {
        let err =
            BeatGrid::from_boundaries(120.0, 1, 4_000, vec![10], vec![10], vec![10], vec![10])
                .unwrap_err();
        assert_eq!(err, GridError::FirstBarNotZero(10));
    }

    #[test]
    fn long_song_does_not_drift() {
        // 117 BPM is not an integer divisor of 60000; check the last bar.
        let grid = BeatGrid::from_constant_bpm(117.0, 4, 600_000).unwrap();
        let ms_per_bar = 4.0 * 60_000.0 / 117.0;
        let last = *grid.bar_boundaries().last().unwrap();
        let expected = ((grid.total_bars() - 1) as f64 * ms_per_bar).round() as i64;
        assert_eq!(last, expected);
    }
}
