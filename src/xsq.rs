//! The XSQ serializer and its strict-inverse parser.
//!
//! Emits xLights-compatible `<xsequence>` XML: a deduplicated `EffectDB` of
//! settings strings, declared display elements, and per-element effect layers.
//! Formatting is deterministic — stable ordering everywhere and truncating
//! (never rounding) fixed-point formatting — because value-curve strings are
//! compared byte-for-byte across the xLights ecosystem.

mod emit;
mod model;
mod parse;
mod settings;
mod value_curve;

use thiserror::Error;

pub use emit::{emit_xsq, write_xsq_file};
pub use model::{
    DisplayElement, Effect, EffectDb, EffectLayer, Element, ElementType, SequenceHead, XSequence,
};
pub use parse::parse_xsq;
pub use settings::DmxSettingsBuilder;
pub use value_curve::{custom_value_curve_string, fmt_trunc, native_value_curve_string};

/// The output XSQ could not be produced.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmissionError {
    /// The output file could not be written.
    #[error("cannot write '{path}': {message}")]
    Io {
        /// Target path.
        path: String,
        /// Underlying I/O message.
        message: String,
    },
    /// Two elements share a name.
    #[error("duplicate element name '{0}'")]
    DuplicateElement(String),
    /// The XML writer failed.
    #[error("xml write error: {0}")]
    Xml(String),
}

/// An XSQ document could not be parsed.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XsqParseError {
    /// The input was not well-formed XML.
    #[error("malformed XML: {0}")]
    MalformedXml(String),
    /// A required field was absent.
    #[error("missing required field '{0}'")]
    MissingRequired(String),
    /// The sequence version is unsupported.
    #[error("unknown version '{0}' (expected >= 2024)")]
    UnknownVersion(String),
}
