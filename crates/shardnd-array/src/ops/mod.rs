//! Operations - Distributed Array Manipulation Primitives
//!
//! The two engines that need multi-phase collective communication:
//! [`sort`] and [`unique`]. Both consume a [`crate::SplitArray`] and produce a
//! new one; neither ever materializes the full array on one process when the
//! data is partitioned.
//!
//! Every rank of the group must call these functions together with identical
//! arguments. Argument validation happens locally before the first collective
//! call, so a validation failure on one rank cannot strand its peers.
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

mod sort;
mod unique;

pub use sort::{sort, sort_into};
pub use unique::{unique, unique_with_inverse, InverseMap};
