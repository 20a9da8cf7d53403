//! Boundary detection over a per-fixture timeline.

use itertools::Itertools;

use crate::segment::FixtureSegment;

/// What kind of adjacency a boundary represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BoundaryKind {
    /// Two segments from different sections touch.
    SectionBoundary,
    /// Two segments of the same section touch.
    StepBoundary,
    /// No previous effect: virtual left neighbor at the song start.
    SequenceStart,
    /// No next effect: virtual right neighbor at the song end.
    SequenceEnd,
    /// A hole between two segments on the same fixture.
    Gap,
}

/// A pair of adjacent segments (or one segment and a virtual song edge) on the
/// same fixture.
///
/// `left`/`right` index into the segment slice the boundary was detected over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    /// Fixture the boundary lives on.
    pub fixture_id: String,
    /// Boundary kind.
    pub kind: BoundaryKind,
    /// Index of the segment ending at the boundary, when one exists.
    pub left: Option<usize>,
    /// Index of the segment starting at the boundary, when one exists.
    pub right: Option<usize>,
    /// Start of the uncovered interval (equal to `gap_end_ms` for touching
    /// segments).
    pub gap_start_ms: i64,
    /// End of the uncovered interval.
    pub gap_end_ms: i64,
}

impl Boundary {
    /// Length of the uncovered interval.
    #[must_use]
    pub fn gap_ms(&self) -> i64 {
        self.gap_end_ms - self.gap_start_ms
    }
}

/// Detects all boundaries over a timeline sorted by `(fixture_id, t0_ms)`.
///
/// Per fixture: a virtual [`BoundaryKind::SequenceStart`] before the first
/// segment when the song does not begin covered, one boundary between each
/// adjacent pair (a [`BoundaryKind::Gap`] when a hole separates them), and a
/// virtual [`BoundaryKind::SequenceEnd`] when coverage stops before the song
/// ends.
#[must_use]
pub fn detect_boundaries(segments: &[FixtureSegment], total_duration_ms: i64) -> Vec<Boundary> {
    let mut boundaries = Vec::new();
    for (fixture_id, group) in &segments
        .iter()
        .enumerate()
        .chunk_by(|(_, s)| s.fixture_id.clone())
    {
        let indexed: Vec<(usize, &FixtureSegment)> = group.collect();
        let (first_idx, first) = indexed[0];
        if first.t0_ms > 0 {
            boundaries.push(Boundary {
                fixture_id: fixture_id.clone(),
                kind: BoundaryKind::SequenceStart,
                left: None,
                right: Some(first_idx),
                gap_start_ms: 0,
                gap_end_ms: first.t0_ms,
            });
        }
        for pair in indexed.windows(2) {
            let ((a_idx, a), (b_idx, b)) = (pair[0], pair[1]);
            let kind = if b.t0_ms > a.t1_ms {
                BoundaryKind::Gap
            } else if a.section_id == b.section_id {
                BoundaryKind::StepBoundary
            } else {
                BoundaryKind::SectionBoundary
            };
            boundaries.push(Boundary {
                fixture_id: fixture_id.clone(),
                kind,
                left: Some(a_idx),
                right: Some(b_idx),
                gap_start_ms: a.t1_ms,
                gap_end_ms: b.t0_ms.max(a.t1_ms),
            });
        }
        let (last_idx, last) = *indexed.last().unwrap();
        if last.t1_ms < total_duration_ms {
            boundaries.push(Boundary {
                fixture_id,
                kind: BoundaryKind::SequenceEnd,
                left: Some(last_idx),
                right: None,
                gap_start_ms: last.t1_ms,
                gap_end_ms: total_duration_ms,
            });
        }
    }
    boundaries
}
