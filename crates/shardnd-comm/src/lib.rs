//! ShardND Comm - Communication Layer for Distributed Arrays
//!
//! Provides the communication primitives the distributed array engines are
//! built on: tagged blocking point-to-point transfers, broadcast, gather and
//! all-gather (fixed and variable counts), all-to-all (fixed and variable
//! counts), in-place all-reduce summation, and rank/size queries.
//!
//! # Collective contract
//!
//! Every collective operation is a synchronization point: it blocks the caller
//! until all members of the process group have issued the matching call, and
//! all ranks must issue collectives in identical order. A rank that skips a
//! collective deadlocks the whole group; there is no timeout or cancellation.
//!
//! # Backends
//!
//! - [`MockBackend`] - an in-process backend that runs one thread per rank
//!   with genuinely blocking collective semantics, used for testing
//! - Extensible [`Backend`] trait for real transports (MPI, TCP, ...)
//!
//! # Example
//! ```rust
//! use shardnd_comm::run_world;
//!
//! run_world(2, |pg| {
//!     let mut counts = vec![0_i64; 2];
//!     counts[pg.rank()] = 1;
//!     pg.all_reduce_sum_i64(&mut counts);
//!     assert_eq!(counts, vec![1, 1]);
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

pub mod backend;
pub mod process_group;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{Backend, MockBackend, USER_TAG_LIMIT};
pub use process_group::{run_world, ProcessGroup};

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::backend::{Backend, MockBackend};
    pub use crate::process_group::{run_world, ProcessGroup};
}
