//! Musical timing: the beat grid and the time reference resolver.
//!
//! A [`BeatGrid`] is an immutable tempo map carrying ordered millisecond
//! boundary lists for bars, beats, eighths and sixteenths. A [`TimeRef`]
//! addresses a moment in the song symbolically (absolute milliseconds,
//! bar/beat position or a section endpoint) and is resolved to milliseconds by
//! a [`TimeResolver`] against a grid and a section map.
//!
//! Bars and beats are 1-indexed throughout. Resolution clamps out-of-range
//! positions to the nearest boundary and records the clamp; it never fails.

mod grid;
mod resolver;

pub use grid::{BeatGrid, GridError};
pub use resolver::{Resolution, SectionSpan, TimeRef, TimeResolver};
