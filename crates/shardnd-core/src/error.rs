//! Error Types - ShardND Core Error Handling
//!
//! Provides the unified error type for all operations within the ShardND
//! library, including axis validation failures, shape mismatches, and
//! partition-layout conflicts.
//!
//! All error conditions raised by the distributed engines are checked locally,
//! before any collective call is issued, so a failing rank never leaves its
//! peers blocked on an unmatched collective.
//!
//! # Key Features
//! - Unified error type for all ShardND operations
//! - Detailed error context for debugging
//! - Integration with `std::error::Error`
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// The main error type for ShardND operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Shape mismatch between arrays or buffers.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape.
        actual: Vec<usize>,
    },

    /// Invalid dimension index.
    #[error("Invalid dimension: index {index} for array with {ndim} dimensions")]
    InvalidDimension {
        /// The invalid dimension index.
        index: usize,
        /// Number of dimensions in the array.
        ndim: usize,
    },

    /// Index out of bounds.
    #[error("Index out of bounds: index {index} for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index.
        index: usize,
        /// The size of the dimension.
        size: usize,
    },

    /// Split-axis mismatch between arrays.
    #[error("Split mismatch: expected split {expected:?}, got {actual:?}")]
    SplitMismatch {
        /// The expected split axis.
        expected: Option<usize>,
        /// The actual split axis.
        actual: Option<usize>,
    },

    /// Rank outside the process group.
    #[error("Invalid rank: rank {rank} for group of size {size}")]
    InvalidRank {
        /// The invalid rank.
        rank: usize,
        /// The size of the process group.
        size: usize,
    },

    /// Operation not supported on an empty array.
    #[error("Operation not supported on empty array")]
    EmptyArray,

    /// Invalid operation for the given array.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Internal error (should not happen).
    #[error("Internal error: {message}")]
    InternalError {
        /// Description of the internal error.
        message: String,
    },
}

// =============================================================================
// Result Type
// =============================================================================

/// A specialized Result type for ShardND operations.
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// Helper Functions
// =============================================================================

impl Error {
    /// Creates a new shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Creates a new invalid dimension error.
    #[must_use]
    pub fn invalid_dimension(index: usize, ndim: usize) -> Self {
        Self::InvalidDimension { index, ndim }
    }

    /// Creates a new invalid operation error.
    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
