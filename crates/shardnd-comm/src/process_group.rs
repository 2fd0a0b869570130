//! `ProcessGroup` - Typed Process Group Abstraction
//!
//! Wraps a [`Backend`] and exposes the collective primitives over typed
//! element slices. Buffers are cast to bytes through `bytemuck`, so any
//! plain-old-data element type moves over the same byte-oriented backend.
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use std::sync::Arc;
use std::thread;

use bytemuck::Pod;

use crate::backend::{Backend, MockBackend};

// =============================================================================
// ProcessGroup
// =============================================================================

/// A group of processes that can communicate with each other.
///
/// Cloning a `ProcessGroup` is cheap; clones share the underlying backend.
#[derive(Clone)]
pub struct ProcessGroup {
    backend: Arc<dyn Backend>,
}

impl ProcessGroup {
    /// Creates a new process group over the given backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Creates a single-rank mock process group for testing.
    #[must_use]
    pub fn mock() -> Self {
        Self::new(Arc::new(MockBackend::single()))
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Returns the rank of this process.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.backend.rank()
    }

    /// Returns the number of processes in the group.
    #[must_use]
    pub fn size(&self) -> usize {
        self.backend.size()
    }

    /// Checks whether this process is the root (rank 0).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.rank() == 0
    }

    /// Synchronizes all processes in the group.
    pub fn barrier(&self) {
        self.backend.barrier();
    }

    /// Sends a typed buffer to rank `dst`, blocking until matched.
    pub fn send<T: Pod>(&self, buf: &[T], dst: usize, tag: u64) {
        self.backend.send(bytemuck::cast_slice(buf), dst, tag);
    }

    /// Receives a typed buffer from rank `src`, blocking until matched.
    pub fn recv<T: Pod>(&self, buf: &mut [T], src: usize, tag: u64) {
        self.backend.recv(bytemuck::cast_slice_mut(buf), src, tag);
    }

    /// Broadcasts a typed buffer from rank `root`.
    pub fn broadcast<T: Pod>(&self, buf: &mut [T], root: usize) {
        self.backend.broadcast(bytemuck::cast_slice_mut(buf), root);
    }

    /// Gathers variable-length typed contributions to rank `root`.
    ///
    /// `counts` and `displs` are in elements and must be identical on every
    /// rank; `recv` is required (and only read) on `root`.
    pub fn gather_v<T: Pod>(
        &self,
        send: &[T],
        recv: Option<&mut [T]>,
        counts: &[usize],
        displs: &[usize],
        root: usize,
    ) {
        self.backend.gather_v(
            bytemuck::cast_slice(send),
            recv.map(|r| bytemuck::cast_slice_mut(r)),
            counts,
            displs,
            root,
            core::mem::size_of::<T>(),
        );
    }

    /// Gathers equal-length typed contributions to every rank.
    pub fn all_gather<T: Pod>(&self, send: &[T], recv: &mut [T]) {
        let size = self.size();
        let counts = vec![send.len(); size];
        let displs: Vec<usize> = (0..size).map(|r| r * send.len()).collect();
        self.all_gather_v(send, recv, &counts, &displs);
    }

    /// Gathers variable-length typed contributions to every rank.
    pub fn all_gather_v<T: Pod>(
        &self,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
        displs: &[usize],
    ) {
        self.backend.all_gather_v(
            bytemuck::cast_slice(send),
            bytemuck::cast_slice_mut(recv),
            counts,
            displs,
            core::mem::size_of::<T>(),
        );
    }

    /// Exchanges equal-sized typed chunks between all rank pairs.
    pub fn all_to_all<T: Pod>(&self, send: &[T], recv: &mut [T]) {
        let chunk = send.len() / self.size();
        self.backend.all_to_all(
            bytemuck::cast_slice(send),
            bytemuck::cast_slice_mut(recv),
            chunk * core::mem::size_of::<T>(),
        );
    }

    /// Exchanges variable-sized typed chunks between all rank pairs.
    pub fn all_to_all_v<T: Pod>(
        &self,
        send: &[T],
        send_counts: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
    ) {
        self.backend.all_to_all_v(
            bytemuck::cast_slice(send),
            send_counts,
            bytemuck::cast_slice_mut(recv),
            recv_counts,
            core::mem::size_of::<T>(),
        );
    }

    /// Elementwise in-place sum across all ranks.
    pub fn all_reduce_sum_i64(&self, data: &mut [i64]) {
        self.backend.all_reduce_sum_i64(data);
    }
}

// =============================================================================
// World Harness
// =============================================================================

/// Runs `f` once per rank of a mock world, each rank on its own thread, and
/// joins them all. Panics (including assertion failures) on any rank are
/// propagated to the caller, which makes this the standard harness for
/// multi-rank tests.
pub fn run_world<F>(size: usize, f: F)
where
    F: Fn(ProcessGroup) + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = MockBackend::create_world(size)
        .into_iter()
        .map(|backend| {
            let f = Arc::clone(&f);
            thread::Builder::new()
                .name(format!("rank-{}", backend.rank()))
                .spawn(move || f(ProcessGroup::new(Arc::new(backend))))
                .expect("failed to spawn rank thread")
        })
        .collect();
    for handle in handles {
        if let Err(panic) = handle.join() {
            std::panic::resume_unwind(panic);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_group_mock() {
        let pg = ProcessGroup::mock();
        assert_eq!(pg.rank(), 0);
        assert_eq!(pg.size(), 1);
        assert!(pg.is_root());
    }

    #[test]
    fn test_process_group_clone_shares_backend() {
        let pg = ProcessGroup::mock();
        let pg2 = pg.clone();
        assert_eq!(pg.rank(), pg2.rank());
        assert_eq!(pg.size(), pg2.size());
    }

    #[test]
    fn test_typed_send_recv() {
        run_world(2, |pg| {
            if pg.rank() == 0 {
                pg.send(&[1.5_f64, -2.5], 1, 3);
            } else {
                let mut buf = [0.0_f64; 2];
                pg.recv(&mut buf, 0, 3);
                assert_eq!(buf, [1.5, -2.5]);
            }
        });
    }

    #[test]
    fn test_typed_broadcast() {
        run_world(3, |pg| {
            let mut buf = if pg.is_root() { vec![4_i64, 2] } else { vec![0, 0] };
            pg.broadcast(&mut buf, 0);
            assert_eq!(buf, vec![4, 2]);
        });
    }

    #[test]
    fn test_typed_all_gather() {
        run_world(3, |pg| {
            let send = [pg.rank() as i64];
            let mut recv = vec![0_i64; 3];
            pg.all_gather(&send, &mut recv);
            assert_eq!(recv, vec![0, 1, 2]);
        });
    }

    #[test]
    fn test_typed_all_gather_v() {
        run_world(2, |pg| {
            let send: Vec<f32> = if pg.rank() == 0 { vec![1.0] } else { vec![2.0, 3.0] };
            let mut recv = vec![0.0_f32; 3];
            pg.all_gather_v(&send, &mut recv, &[1, 2], &[0, 1]);
            assert_eq!(recv, vec![1.0, 2.0, 3.0]);
        });
    }

    #[test]
    fn test_typed_all_to_all_v() {
        run_world(2, |pg| {
            if pg.rank() == 0 {
                let send = [0_i32, 10, 11];
                let mut recv = [0_i32; 1];
                pg.all_to_all_v(&send, &[1, 2], &mut recv, &[1, 0]);
                assert_eq!(recv, [0]);
            } else {
                let send: [i32; 0] = [];
                let mut recv = [0_i32; 2];
                pg.all_to_all_v(&send, &[0, 0], &mut recv, &[2, 0]);
                assert_eq!(recv, [10, 11]);
            }
        });
    }

    #[test]
    fn test_all_reduce_sum() {
        run_world(3, |pg| {
            let mut data = vec![1_i64, pg.rank() as i64];
            pg.all_reduce_sum_i64(&mut data);
            assert_eq!(data, vec![3, 3]);
        });
    }
}
