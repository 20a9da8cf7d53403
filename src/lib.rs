//! Compiler from musical lighting choreography plans to xLights sequence (XSQ) files.
//!
//! A [`plan::ChoreographyPlan`] describes how a multi-fixture light show behaves
//! across a song: an ordered list of sections, each naming a template, a preset,
//! a bar range and a target group. This crate compiles such a plan — against a
//! [`timing::BeatGrid`] and a [`fixture::RigProfile`] — into a concrete,
//! bit-exact XSQ file that xLights can play back.
//!
//! The pipeline has five stages, run strictly in order:
//!
//! 1. **Time resolution** ([`timing`]): bars, beats and symbolic section
//!    references resolve to millisecond windows against the tempo map.
//! 2. **Curve generation** ([`curve`]): normalized `[0, 1]` design-space curves
//!    (sine, triangle, pulse, ...) and their mapping onto DMX integer ranges
//!    with per-channel clamps and inversions.
//! 3. **Template compilation** ([`template`]): a template plus preset plus
//!    compile context expands into per-fixture [`segment::FixtureSegment`]s,
//!    time-bounded bundles of per-channel static values and curves.
//! 4. **Transitions and gap fill** ([`transition`]): boundaries between adjacent
//!    segments blend smoothly, and holes in the timeline are filled (including
//!    the large-gap 40/20/40 phasing and sequence start/end soft-home easing).
//! 5. **Serialization** ([`xsq`]): the segment timeline becomes an xLights
//!    `<xsequence>` document with interned effect settings strings and
//!    clamp/inversion-correct byte values. The XSQ parser is the strict inverse.
//!
//! # Usage
//!
//! ```
//! use lumiseq::prelude::*;
//!
//! let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
//! let rig = RigProfile::single("MH1", "Dmx MH1");
//! let plan = ChoreographyPlan::new(
//!     vec![Section::new("opening", 1, 4, "pan_sweep", ["moving_heads"])],
//!     "demo",
//! );
//!
//! let registries = Registries::builtins();
//! let pipeline = RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());
//! let output = pipeline.render().unwrap();
//! assert!(!output.xsq.elements.is_empty());
//! ```
//!
//! The compilation pipeline is single-threaded and synchronous by design: it is
//! a pure batch compiler — plan in, file out, no hidden state. Registries are
//! built once at startup and thereafter read-only; compilation never mutates its
//! inputs. A failed run writes no XSQ.

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod curve;
pub mod error;
pub mod fixture;
pub mod pipeline;
pub mod plan;
pub mod prelude;
pub mod segment;
pub mod template;
pub mod timing;
pub mod transition;
pub mod xsq;

pub use error::{CoreError, ValidationError};
pub use pipeline::{PipelineOptions, Registries, RenderOutput, RenderingPipeline};
