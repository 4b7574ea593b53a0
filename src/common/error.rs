//! Error types for rust_chomp

use thiserror::Error;

/// Main error type for trajectory optimization
///
/// Every variant is a caller error raised at the violated precondition.
/// Nothing here is retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChompError {
    /// A configuration or trajectory vector has the wrong length
    #[error("Dimension error: {what} has {actual} components, expected {expected}")]
    DimensionError {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Waypoint or obstacle index out of range
    #[error("Index error: {what} index {index} out of range (len {len})")]
    IndexError {
        what: &'static str,
        index: usize,
        len: usize,
    },
    /// Degenerate trajectory length, the smoothness metric would be empty
    #[error("Singular metric: trajectory has {nq} waypoints")]
    SingularMetricError { nq: usize },
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ChompError {
    pub(crate) fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        ChompError::DimensionError { what, expected, actual }
    }

    pub(crate) fn index(what: &'static str, index: usize, len: usize) -> Self {
        ChompError::IndexError { what, index, len }
    }
}

/// Result type alias for optimizer operations
pub type ChompResult<T> = Result<T, ChompError>;
