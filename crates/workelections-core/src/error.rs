//! Domain errors raised by the core crate.

use thiserror::Error;

/// Errors that callers are expected to match on.
///
/// Anything else (I/O, database, remote service failures) travels as
/// `anyhow::Error`.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// A coordinate pair could not be parsed.
    #[error("invalid coordinates '{0}': expected two comma-separated numbers (x,y)")]
    InvalidCoordinates(String),

    /// A GeoJSON geometry was structurally invalid.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}
