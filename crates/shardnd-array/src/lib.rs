//! ShardND Array - Distributed Partitioned N-Dimensional Arrays
//!
//! The [`SplitArray`] container holds an n-dimensional array whose data is
//! partitioned along one axis (the "split axis") across a group of cooperating
//! processes, each owning a contiguous slice of global indices along that
//! axis. On top of it, this crate implements the two operations that need a
//! globally consistent answer from locally partitioned data without ever
//! materializing the full array on one process:
//!
//! - **Distributed sort** ([`ops::sort`]) - pivot-based redistribution when
//!   the sort axis coincides with the split axis, local sorting otherwise
//! - **Distributed unique** ([`ops::unique`]) - distinct elements or distinct
//!   slices across all processes, with optional inverse-index reconstruction
//!
//! # Example
//! ```rust
//! use shardnd_array::prelude::*;
//! use shardnd_comm::run_world;
//!
//! run_world(4, |pg| {
//!     let a = SplitArray::from_replicated_global(
//!         &[5_i64, 3, 1, 4, 2, 0, 7, 6], &[8], 0, pg,
//!     ).unwrap();
//!     let sorted = sort(&a, None, false).unwrap();
//!     assert_eq!(sorted.local_extent(0), 2);
//! });
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
#![allow(clippy::too_many_lines)]
#![allow(clippy::similar_names)]
#![allow(clippy::uninlined_format_args)]

// =============================================================================
// Modules
// =============================================================================

pub mod array;
pub mod layout;
pub mod ops;

// =============================================================================
// Re-exports
// =============================================================================

pub use array::SplitArray;
pub use layout::Shape;
pub use ops::{sort, sort_into, unique, unique_with_inverse, InverseMap};

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::array::SplitArray;
    pub use crate::layout::Shape;
    pub use crate::ops::{sort, sort_into, unique, unique_with_inverse, InverseMap};
    pub use shardnd_core::{DType, Element, Error, Result};
}
