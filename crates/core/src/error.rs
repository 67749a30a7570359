//! Error types for sunraster

use thiserror::Error;

/// Main error type for sunraster operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A date/time string could not be turned into calendar fields
    #[error("Invalid timestamp '{input}': {field} {reason}")]
    InvalidTimestamp {
        input: String,
        field: &'static str,
        reason: String,
    },

    /// An extent is malformed or reaches a pole
    #[error("Invalid extent: {field} = {value} ({reason})")]
    InvalidExtent {
        field: &'static str,
        value: f64,
        reason: String,
    },

    /// A named external dataset (DEM, time-zone layer) could not be loaded
    #[error("Dataset '{name}' could not be loaded: {reason}")]
    Dataset { name: String, reason: String },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sunraster operations
pub type Result<T> = std::result::Result<T, Error>;
