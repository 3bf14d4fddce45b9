// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur while validating a request, building the forward
/// model, inverting, or exporting results.
#[derive(Debug)]
pub enum TomographyError {
    /// A required request field is absent or null.
    MissingField(&'static str),
    /// A request field could not be interpreted as a number.
    InvalidNumber {
        /// The field name.
        field: &'static str,
        /// The offending value as received.
        value: String,
    },
    /// The truncation rank could not be coerced to an integer.
    InvalidRank(String),
    /// Source depth is not finite or lies outside the survey's depth range.
    InvalidSourceDepth {
        /// The requested source depth.
        depth: f64,
        /// The survey depth range.
        depth_range: f64,
    },
    /// A survey dimension is negative or not finite.
    InvalidDimension {
        /// The parameter name.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// Receivers would be placed above the top or below the bottom of the survey.
    ReceiverMarginTooLarge {
        /// The receiver margin.
        margin: f64,
        /// The survey depth range.
        depth_range: f64,
    },
    /// Grid shape is invalid (zero cells along an axis).
    InvalidGridShape {
        /// The axis index (0 = horizontal, 1 = vertical).
        axis: usize,
        /// The size provided.
        size: usize,
    },
    /// Grid has more cells than the configured limit allows.
    GridTooLarge {
        /// Number of cells requested.
        cells: usize,
        /// The limit.
        limit: usize,
    },
    /// Receiver count exceeds the configured limit.
    TooManyReceivers {
        /// Number of receivers requested.
        count: usize,
        /// The limit.
        limit: usize,
    },
    /// Array shape does not match expected shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// The singular value decomposition did not converge.
    DecompositionFailed {
        /// Rows of the decomposed matrix.
        rows: usize,
        /// Columns of the decomposed matrix.
        cols: usize,
    },
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// JSON encoding or decoding failed.
    Json(serde_json::Error),
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for TomographyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TomographyError::MissingField(name) => {
                write!(f, "missing required field '{}'", name)
            }
            TomographyError::InvalidNumber { field, value } => {
                write!(f, "invalid value for '{}': {} is not a number", field, value)
            }
            TomographyError::InvalidRank(value) => {
                write!(
                    f,
                    "invalid truncation rank: {} is not an integer",
                    value
                )
            }
            TomographyError::InvalidSourceDepth { depth, depth_range } => {
                write!(
                    f,
                    "invalid source depth: {} (must lie within [0, {}])",
                    depth, depth_range
                )
            }
            TomographyError::InvalidDimension { name, value } => {
                write!(
                    f,
                    "invalid {}: {} (must be non-negative and finite)",
                    name, value
                )
            }
            TomographyError::ReceiverMarginTooLarge {
                margin,
                depth_range,
            } => {
                write!(
                    f,
                    "receiver margin {} leaves no room for receivers in a survey {} deep",
                    margin, depth_range
                )
            }
            TomographyError::InvalidGridShape { axis, size } => {
                write!(
                    f,
                    "invalid grid shape: axis {} has size {} (must be >= 1)",
                    axis, size
                )
            }
            TomographyError::GridTooLarge { cells, limit } => {
                write!(f, "grid too large: {} cells (limit is {})", cells, limit)
            }
            TomographyError::TooManyReceivers { count, limit } => {
                write!(f, "too many receivers: {} (limit is {})", count, limit)
            }
            TomographyError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            TomographyError::DecompositionFailed { rows, cols } => {
                write!(
                    f,
                    "singular value decomposition of {}x{} matrix did not converge",
                    rows, cols
                )
            }
            TomographyError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            TomographyError::Json(e) => write!(f, "JSON error: {}", e),
            TomographyError::IoError(e) => write!(f, "I/O error: {}", e),
            TomographyError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TomographyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TomographyError::Json(e) => Some(e),
            TomographyError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TomographyError {
    fn from(e: std::io::Error) -> Self {
        TomographyError::IoError(e)
    }
}

impl From<serde_json::Error> for TomographyError {
    fn from(e: serde_json::Error) -> Self {
        TomographyError::Json(e)
    }
}

impl TomographyError {
    /// Returns true for errors caused by the caller's input, as opposed to
    /// numerical or I/O failures.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            TomographyError::MissingField(_)
                | TomographyError::InvalidNumber { .. }
                | TomographyError::InvalidRank(_)
                | TomographyError::InvalidSourceDepth { .. }
                | TomographyError::InvalidDimension { .. }
                | TomographyError::ReceiverMarginTooLarge { .. }
                | TomographyError::InvalidGridShape { .. }
                | TomographyError::GridTooLarge { .. }
                | TomographyError::TooManyReceivers { .. }
                | TomographyError::Json(_)
        )
    }
}

/// Convenience type alias for Results with TomographyError.
pub type Result<T> = std::result::Result<T, TomographyError>;
