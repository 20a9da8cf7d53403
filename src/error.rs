//! Error taxonomy of the compilation pipeline.
//!
//! Every fallible operation returns `Result<_, E>` where `E` is one of the
//! component error enums below; [`CoreError`] aggregates them at the pipeline
//! surface. Boundary violations (computed DMX outside a fixture's limits) are
//! deliberately absent: the clamp is the semantics, recorded at debug level
//! only.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    curve::CurveError,
    template::{GeometryError, TemplateError},
    timing::GridError,
    xsq::{EmissionError, XsqParseError},
};

/// An error occurred while compiling a choreography plan to an XSQ file.
///
/// Section- and pipeline-level failures abort compilation; there is no partial
/// output. Channel-level curve failures are recovered locally (a default flat
/// curve is substituted and a warning recorded) and never surface here.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CoreError {
    /// A plan, template, preset or fixture configuration failed structural checks.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    /// A curve operation failed outside the per-channel recovery path.
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    /// A geometry was unknown or misclassified. Misclassification is a
    /// correctness bug, not a runtime condition.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
    /// A template or preset could not be resolved or failed pattern validation.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    /// A beat grid failed its construction invariants.
    #[error("beat grid error: {0}")]
    Grid(#[from] GridError),
    /// The output XSQ could not be produced.
    #[error("emission error: {0}")]
    Emission(#[from] EmissionError),
    /// A template XSQ could not be parsed.
    #[error("XSQ parse error: {0}")]
    Parse(#[from] XsqParseError),
}

impl CoreError {
    /// Attaches section/step context to an error for diagnostics.
    #[must_use]
    pub fn in_section(self, section_id: &str, step_id: Option<&str>) -> Self {
        let location = match step_id {
            Some(step) => format!("{section_id}/{step}"),
            None => section_id.to_owned(),
        };
        match self {
            Self::Template(e) => Self::Template(e.with_location(location)),
            other => other,
        }
    }
}

/// Structural validation failure of a plan, segment or fixture configuration.
///
/// All variants are fatal and surfaced to the caller with enough location
/// information to point at the offending section or field.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The plan contains no sections.
    #[error("plan has no sections")]
    EmptyPlan,
    /// A section's bar range is inverted or outside the song.
    #[error("section '{section}' has invalid bar range {start_bar}..={end_bar} (song has {total_bars} bars)")]
    BarRange {
        /// Offending section name.
        section: String,
        /// Declared first bar.
        start_bar: u32,
        /// Declared last bar.
        end_bar: u32,
        /// Total bars in the beat grid.
        total_bars: u32,
    },
    /// Two sections overlap in bars. Named in plan order.
    #[error("sections '{first}' and '{second}' overlap at bar {bar}")]
    SectionOverlap {
        /// Earlier section.
        first: String,
        /// Later section.
        second: String,
        /// First overlapping bar.
        bar: u32,
    },
    /// Sections are not sorted by start bar.
    #[error("section '{second}' starts before '{first}' but is declared after it")]
    SectionsNotSorted {
        /// Earlier-declared section.
        first: String,
        /// Later-declared section.
        second: String,
    },
    /// A hole was left between two sections inside the song.
    #[error("gap between sections '{first}' and '{second}' (bars {from_bar}..{to_bar})")]
    SectionGap {
        /// Section before the gap.
        first: String,
        /// Section after the gap.
        second: String,
        /// First uncovered bar.
        from_bar: u32,
        /// First covered bar after the gap.
        to_bar: u32,
    },
    /// A plan target did not resolve against the rig profile.
    #[error("section '{section}' targets unknown {kind} '{id}'")]
    UnknownTarget {
        /// Section naming the target.
        section: String,
        /// Target kind (`group`, `zone` or `split`).
        kind: &'static str,
        /// The unresolved identifier.
        id: String,
    },
    /// A group references a fixture id absent from the rig.
    #[error("group '{group}' references unknown fixture '{fixture_id}'")]
    UnknownFixture {
        /// Offending group.
        group: String,
        /// The missing fixture id.
        fixture_id: String,
    },
    /// A channel value set neither `static_dmx` nor a curve.
    #[error("channel value for {channel} sets neither static_dmx nor curve")]
    ChannelValueEmpty {
        /// Offending channel.
        channel: String,
    },
    /// A channel value set both `static_dmx` and a curve.
    #[error("channel value for {channel} sets both static_dmx and curve")]
    ChannelValueConflict {
        /// Offending channel.
        channel: String,
    },
    /// `clamp_max` was below `clamp_min`.
    #[error("clamp_max {clamp_max} < clamp_min {clamp_min}")]
    ClampOrder {
        /// Declared lower clamp.
        clamp_min: u8,
        /// Declared upper clamp.
        clamp_max: u8,
    },
    /// A channel value was stored under a key that differs from its own tag.
    #[error("channel value tagged {value} stored under key {key}")]
    ChannelKeyMismatch {
        /// Map key.
        key: String,
        /// The value's own channel tag.
        value: String,
    },
    /// A segment's end time preceded its start time.
    #[error("segment '{segment_id}' ends at {t1_ms}ms before it starts at {t0_ms}ms")]
    SegmentTimeOrder {
        /// Offending segment.
        segment_id: String,
        /// Start time.
        t0_ms: i64,
        /// End time.
        t1_ms: i64,
    },
    /// A configuration file could not be read.
    #[error("cannot read {path}: {message}")]
    ConfigRead {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O message.
        message: String,
    },
    /// A configuration file was not valid JSON for its schema.
    #[error("cannot parse {path}: {message}")]
    ConfigParse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying decode message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_error_names_both_sections() {
        let err = ValidationError::SectionOverlap {
            first: "verse".into(),
            second: "chorus".into(),
            bar: 15,
        };
        let message = err.to_string();
        assert!(message.contains("verse"));
        assert!(message.contains("chorus"));
        assert!(message.contains("15"));
    }
}
