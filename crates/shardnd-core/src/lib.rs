//! ShardND Core - Foundation Layer for the ShardND Array Library
//!
//! This crate provides the core abstractions that underpin the distributed
//! partitioned-array library: the unified error type, the element-type system,
//! and the partition chunking rules that decide which process owns which
//! contiguous slice of global indices along the split axis.
//!
//! # Key Features
//! - Unified error type with detailed context
//! - Type-safe element system (f32, f64, signed/unsigned integers)
//! - Deterministic, balanced partition chunking
//!
//! # Example
//! ```rust
//! use shardnd_core::chunk;
//!
//! // 10 elements over 4 ranks: remainder goes to the lowest ranks first.
//! assert_eq!(chunk::chunk(&[10], 0, 0, 4).unwrap(), (0, 3));
//! assert_eq!(chunk::chunk(&[10], 0, 3, 4).unwrap(), (8, 2));
//! ```
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::uninlined_format_args)]

// =============================================================================
// Modules
// =============================================================================

pub mod chunk;
pub mod element;
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

pub use element::{DType, Element};
pub use error::{Error, Result};

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::chunk;
    pub use crate::element::{DType, Element};
    pub use crate::error::{Error, Result};
}
