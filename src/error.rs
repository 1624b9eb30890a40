//! Error taxonomy for the toolchanger post-processor core.

use std::num::ParseIntError;

/// Errors that can arise while parsing or rewriting a G-code file.
///
/// The CLI boundary (`main.rs`) adapts these into the two user-facing
/// messages required by the spec, or into a generic `anyhow`-wrapped
/// report for anything unexpected.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed slicer input: {0}")]
    MalformedInput(String),

    #[error("missing required marker: {0}")]
    MissingMarker(String),

    #[error("failed to parse integer value: {0}")]
    ParseInt(#[from] ParseIntError),
}

pub type Result<T> = std::result::Result<T, Error>;
