//! Backend - Communication Backend Abstractions
//!
//! Provides the backend trait and implementations for distributed
//! communication. Primitives are byte-oriented: the typed surface lives in
//! [`crate::process_group::ProcessGroup`], which casts element buffers through
//! `bytemuck`. Variable-count operations take counts and displacements in
//! element units together with the element size, mirroring the classic
//! `v`-suffixed collective signatures.
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use tracing::trace;

// =============================================================================
// Tag Namespace
// =============================================================================

/// Upper bound (exclusive) for user-supplied point-to-point tags.
///
/// Tags at or above this value are reserved for internal collective traffic,
/// so application tags can never collide with a collective round.
pub const USER_TAG_LIMIT: u64 = 1 << 63;

// =============================================================================
// Backend Trait
// =============================================================================

/// Trait for distributed communication backends.
///
/// All collective methods must be invoked by every rank of the group in
/// identical order; divergence deadlocks the group. Point-to-point `send` and
/// `recv` block until the transfer is matched and complete.
pub trait Backend: Send + Sync {
    /// Returns the name of the backend.
    fn name(&self) -> &str;

    /// Returns the rank of this process.
    fn rank(&self) -> usize;

    /// Returns the total number of processes in the group.
    fn size(&self) -> usize;

    /// Sends `buf` to rank `dst`. The tag must be below [`USER_TAG_LIMIT`].
    fn send(&self, buf: &[u8], dst: usize, tag: u64);

    /// Receives into `buf` from rank `src`, blocking until the matching send
    /// has been issued. The tag must be below [`USER_TAG_LIMIT`].
    fn recv(&self, buf: &mut [u8], src: usize, tag: u64);

    /// Broadcasts `buf` from rank `root` to all ranks.
    fn broadcast(&self, buf: &mut [u8], root: usize);

    /// Gathers variable-length contributions to rank `root`.
    ///
    /// `counts` and `displs` are in element units and must be identical on
    /// every rank; `recv` is only read on `root`.
    fn gather_v(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        counts: &[usize],
        displs: &[usize],
        root: usize,
        elem_size: usize,
    );

    /// Gathers variable-length contributions to every rank.
    fn all_gather_v(
        &self,
        send: &[u8],
        recv: &mut [u8],
        counts: &[usize],
        displs: &[usize],
        elem_size: usize,
    );

    /// Exchanges equal-sized chunks between all rank pairs: the chunk at
    /// `send[d * chunk_bytes ..]` goes to rank `d`, and the chunk received
    /// from rank `s` lands at `recv[s * chunk_bytes ..]`.
    fn all_to_all(&self, send: &[u8], recv: &mut [u8], chunk_bytes: usize);

    /// Exchanges variable-sized chunks between all rank pairs.
    ///
    /// `send_counts[d]` elements go to rank `d`; `recv_counts[s]` elements are
    /// expected from rank `s`. Both buffers are laid out in rank order.
    fn all_to_all_v(
        &self,
        send: &[u8],
        send_counts: &[usize],
        recv: &mut [u8],
        recv_counts: &[usize],
        elem_size: usize,
    );

    /// Elementwise in-place sum of `data` across all ranks.
    fn all_reduce_sum_i64(&self, data: &mut [i64]);

    /// Synchronizes all ranks.
    fn barrier(&self);
}

// =============================================================================
// SharedState for Mock Backend
// =============================================================================

/// Shared state for mock distributed communication.
#[derive(Debug, Default)]
struct SharedState {
    /// In-flight messages keyed by (src, dst, tag).
    mailbox: HashMap<(usize, usize, u64), Vec<u8>>,
    /// Ranks currently waiting at the barrier.
    barrier_count: usize,
    /// Barrier generation, bumped when the last rank arrives.
    barrier_gen: u64,
}

// =============================================================================
// Mock Backend
// =============================================================================

/// An in-process backend for testing distributed operations.
///
/// One `MockBackend` is created per rank and each rank runs on its own thread
/// (see [`crate::process_group::run_world`]). Point-to-point receives and the
/// barrier genuinely block on a condition variable, so ordering bugs in
/// collective pipelines surface as deadlocks in tests exactly as they would on
/// a real transport. Sends are buffered.
pub struct MockBackend {
    rank: usize,
    size: usize,
    /// Per-rank collective round counter. Because every rank must issue
    /// collectives in identical order, equal round numbers across ranks
    /// identify the same collective; the round is used as an internal tag in
    /// the reserved namespace above [`USER_TAG_LIMIT`].
    round: AtomicU64,
    state: Arc<(Mutex<SharedState>, Condvar)>,
}

impl MockBackend {
    /// Creates a connected collection of mock backends, one per rank.
    #[must_use]
    pub fn create_world(size: usize) -> Vec<Self> {
        assert!(size > 0, "world size must be at least 1");
        let state = Arc::new((Mutex::new(SharedState::default()), Condvar::new()));

        (0..size)
            .map(|rank| MockBackend {
                rank,
                size,
                round: AtomicU64::new(0),
                state: Arc::clone(&state),
            })
            .collect()
    }

    /// Creates a single mock backend (rank 0, world size 1).
    #[must_use]
    pub fn single() -> Self {
        MockBackend::create_world(1).pop().unwrap()
    }

    /// Reserves the internal tag for the next collective round.
    fn collective_tag(&self) -> u64 {
        USER_TAG_LIMIT | self.round.fetch_add(1, Ordering::Relaxed)
    }

    /// Deposits a message into the mailbox and wakes waiting receivers.
    fn deposit(&self, buf: &[u8], dst: usize, tag: u64) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        let prev = state.mailbox.insert((self.rank, dst, tag), buf.to_vec());
        debug_assert!(prev.is_none(), "duplicate message for (src, dst, tag)");
        cvar.notify_all();
    }

    /// Blocks until the message keyed by (src, this rank, tag) arrives, then
    /// copies it into `buf`.
    fn collect(&self, buf: &mut [u8], src: usize, tag: u64) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        loop {
            if let Some(msg) = state.mailbox.remove(&(src, self.rank, tag)) {
                let n = msg.len().min(buf.len());
                buf[..n].copy_from_slice(&msg[..n]);
                return;
            }
            state = cvar.wait(state).unwrap();
        }
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, buf: &[u8], dst: usize, tag: u64) {
        debug_assert!(tag < USER_TAG_LIMIT, "tag {tag} is in the reserved range");
        trace!(src = self.rank, dst, tag, bytes = buf.len(), "send");
        self.deposit(buf, dst, tag);
    }

    fn recv(&self, buf: &mut [u8], src: usize, tag: u64) {
        debug_assert!(tag < USER_TAG_LIMIT, "tag {tag} is in the reserved range");
        self.collect(buf, src, tag);
        trace!(src, dst = self.rank, tag, bytes = buf.len(), "recv");
    }

    fn broadcast(&self, buf: &mut [u8], root: usize) {
        let tag = self.collective_tag();
        if self.rank == root {
            for dst in 0..self.size {
                if dst != root {
                    self.deposit(buf, dst, tag);
                }
            }
        } else {
            self.collect(buf, root, tag);
        }
    }

    fn gather_v(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        counts: &[usize],
        displs: &[usize],
        root: usize,
        elem_size: usize,
    ) {
        let tag = self.collective_tag();
        if self.rank == root {
            let recv = recv.expect("gather_v on root requires a receive buffer");
            for src in 0..self.size {
                let start = displs[src] * elem_size;
                let end = start + counts[src] * elem_size;
                if src == root {
                    recv[start..end].copy_from_slice(send);
                } else {
                    self.collect(&mut recv[start..end], src, tag);
                }
            }
        } else {
            self.deposit(send, root, tag);
        }
    }

    fn all_gather_v(
        &self,
        send: &[u8],
        recv: &mut [u8],
        counts: &[usize],
        displs: &[usize],
        elem_size: usize,
    ) {
        let tag = self.collective_tag();
        for dst in 0..self.size {
            if dst != self.rank {
                self.deposit(send, dst, tag);
            }
        }
        for src in 0..self.size {
            let start = displs[src] * elem_size;
            let end = start + counts[src] * elem_size;
            if src == self.rank {
                recv[start..end].copy_from_slice(send);
            } else {
                self.collect(&mut recv[start..end], src, tag);
            }
        }
    }

    fn all_to_all(&self, send: &[u8], recv: &mut [u8], chunk_bytes: usize) {
        let tag = self.collective_tag();
        for dst in 0..self.size {
            let chunk = &send[dst * chunk_bytes..(dst + 1) * chunk_bytes];
            if dst != self.rank {
                self.deposit(chunk, dst, tag);
            }
        }
        for src in 0..self.size {
            let start = src * chunk_bytes;
            let end = start + chunk_bytes;
            if src == self.rank {
                recv[start..end].copy_from_slice(&send[start..end]);
            } else {
                self.collect(&mut recv[start..end], src, tag);
            }
        }
    }

    fn all_to_all_v(
        &self,
        send: &[u8],
        send_counts: &[usize],
        recv: &mut [u8],
        recv_counts: &[usize],
        elem_size: usize,
    ) {
        let tag = self.collective_tag();

        let mut offset = 0;
        let mut self_chunk: &[u8] = &[];
        for dst in 0..self.size {
            let bytes = send_counts[dst] * elem_size;
            let chunk = &send[offset..offset + bytes];
            if dst == self.rank {
                self_chunk = chunk;
            } else {
                self.deposit(chunk, dst, tag);
            }
            offset += bytes;
        }

        let mut offset = 0;
        for src in 0..self.size {
            let bytes = recv_counts[src] * elem_size;
            if src == self.rank {
                recv[offset..offset + bytes].copy_from_slice(self_chunk);
            } else {
                self.collect(&mut recv[offset..offset + bytes], src, tag);
            }
            offset += bytes;
        }
    }

    fn all_reduce_sum_i64(&self, data: &mut [i64]) {
        let tag = self.collective_tag();
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let owned = bytes.to_vec();
        for dst in 0..self.size {
            if dst != self.rank {
                self.deposit(&owned, dst, tag);
            }
        }

        let mut scratch = vec![0_u8; owned.len()];
        for src in 0..self.size {
            if src == self.rank {
                continue;
            }
            self.collect(&mut scratch, src, tag);
            let incoming: &[i64] = bytemuck::cast_slice(&scratch);
            for (acc, &val) in data.iter_mut().zip(incoming) {
                *acc += val;
            }
        }
    }

    fn barrier(&self) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        let gen = state.barrier_gen;
        state.barrier_count += 1;
        if state.barrier_count == self.size {
            state.barrier_count = 0;
            state.barrier_gen += 1;
            cvar.notify_all();
        } else {
            while state.barrier_gen == gen {
                state = cvar.wait(state).unwrap();
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Runs `f` on one thread per rank and joins them all.
    fn with_world<F>(size: usize, f: F)
    where
        F: Fn(MockBackend) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handles: Vec<_> = MockBackend::create_world(size)
            .into_iter()
            .map(|backend| {
                let f = Arc::clone(&f);
                thread::spawn(move || f(backend))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_mock_backend_identity() {
        let backends = MockBackend::create_world(4);
        for (i, b) in backends.iter().enumerate() {
            assert_eq!(b.rank(), i);
            assert_eq!(b.size(), 4);
            assert_eq!(b.name(), "mock");
        }
    }

    #[test]
    fn test_send_recv_blocks_until_matched() {
        with_world(2, |backend| {
            if backend.rank() == 0 {
                // Give the receiver a head start so recv really blocks.
                thread::sleep(std::time::Duration::from_millis(20));
                backend.send(&[1, 2, 3], 1, 7);
            } else {
                let mut buf = [0_u8; 3];
                backend.recv(&mut buf, 0, 7);
                assert_eq!(buf, [1, 2, 3]);
            }
        });
    }

    #[test]
    fn test_tags_disambiguate_concurrent_transfers() {
        with_world(2, |backend| {
            if backend.rank() == 0 {
                backend.send(&[10], 1, 1);
                backend.send(&[20], 1, 2);
            } else {
                let mut a = [0_u8; 1];
                let mut b = [0_u8; 1];
                // Receive in the opposite order of sending.
                backend.recv(&mut b, 0, 2);
                backend.recv(&mut a, 0, 1);
                assert_eq!(a, [10]);
                assert_eq!(b, [20]);
            }
        });
    }

    #[test]
    fn test_broadcast() {
        with_world(3, |backend| {
            let mut buf = if backend.rank() == 1 {
                vec![5_u8, 6, 7]
            } else {
                vec![0_u8; 3]
            };
            backend.broadcast(&mut buf, 1);
            assert_eq!(buf, vec![5, 6, 7]);
        });
    }

    #[test]
    fn test_gather_v_with_empty_contribution() {
        with_world(3, |backend| {
            let rank = backend.rank();
            // Rank 1 contributes nothing.
            let counts = [2_usize, 0, 1];
            let displs = [0_usize, 2, 2];
            let send: Vec<u8> = match rank {
                0 => vec![1, 2],
                1 => vec![],
                _ => vec![9],
            };
            if rank == 0 {
                let mut recv = vec![0_u8; 3];
                backend.gather_v(&send, Some(&mut recv), &counts, &displs, 0, 1);
                assert_eq!(recv, vec![1, 2, 9]);
            } else {
                backend.gather_v(&send, None, &counts, &displs, 0, 1);
            }
        });
    }

    #[test]
    fn test_all_gather_v() {
        with_world(3, |backend| {
            let rank = backend.rank();
            let counts = [1_usize, 2, 1];
            let displs = [0_usize, 1, 3];
            let send: Vec<u8> = match rank {
                0 => vec![1],
                1 => vec![2, 3],
                _ => vec![4],
            };
            let mut recv = vec![0_u8; 4];
            backend.all_gather_v(&send, &mut recv, &counts, &displs, 1);
            assert_eq!(recv, vec![1, 2, 3, 4]);
        });
    }

    #[test]
    fn test_all_to_all() {
        with_world(2, |backend| {
            let rank = backend.rank() as u8;
            let send = vec![rank * 10, rank * 10 + 1];
            let mut recv = vec![0_u8; 2];
            backend.all_to_all(&send, &mut recv, 1);
            // Rank r receives chunk r from every rank.
            assert_eq!(recv, vec![rank, 10 + rank]);
        });
    }

    #[test]
    fn test_all_to_all_v_uneven() {
        with_world(2, |backend| {
            if backend.rank() == 0 {
                // Sends 3 elements to rank 1, keeps 1 for itself.
                let send = [7_u8, 1, 2, 3];
                let mut recv = vec![0_u8; 1];
                backend.all_to_all_v(&send, &[1, 3], &mut recv, &[1, 0], 1);
                assert_eq!(recv, vec![7]);
            } else {
                let send: [u8; 0] = [];
                let mut recv = vec![0_u8; 3];
                backend.all_to_all_v(&send, &[0, 0], &mut recv, &[3, 0], 1);
                assert_eq!(recv, vec![1, 2, 3]);
            }
        });
    }

    #[test]
    fn test_all_reduce_sum_i64() {
        with_world(4, |backend| {
            let mut data = vec![backend.rank() as i64, 1];
            backend.all_reduce_sum_i64(&mut data);
            assert_eq!(data, vec![6, 4]);
        });
    }

    #[test]
    fn test_barrier_reusable() {
        with_world(3, |backend| {
            for _ in 0..5 {
                backend.barrier();
            }
        });
    }

    #[test]
    fn test_collectives_in_lockstep_sequence() {
        // Back-to-back collectives must not cross-talk between rounds.
        with_world(2, |backend| {
            for round in 0..10_i64 {
                let mut data = vec![round + backend.rank() as i64];
                backend.all_reduce_sum_i64(&mut data);
                assert_eq!(data, vec![2 * round + 1]);
            }
        });
    }
}
