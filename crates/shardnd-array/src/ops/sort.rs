//! Distributed Sort Engine
//!
//! Sorts a partitioned array along a chosen axis. When the axis differs from
//! the split axis (or the array is replicated), values along the axis never
//! cross rank boundaries and each rank sorts its local slice independently.
//! When the axis coincides with the split axis, the engine runs a pivot-based
//! redistribution pipeline, all ranks in lockstep:
//!
//! local sort -> pivot sample -> pivot gather -> global pivot compute ->
//! pivot broadcast -> classify -> exchange counts -> exchange data ->
//! rebalance -> finalize
//!
//! Pivots are computed independently per lane (per fixed position along the
//! non-split dimensions), so a 2-D array split along axis 0 sorts each column
//! with its own pivot set. The rebalance phase restores each rank's original
//! chunk length with a single closed-form `all_to_all_v` derived from prefix
//! sums of the globally known partition matrix; no iterative element-by-element
//! fix-up is needed.
//!
//! Ranks owning zero elements along the split axis enter every collective as
//! no-op participants; skipping one would deadlock the group.
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use core::cmp::Ordering;

use tracing::{debug, trace};

use shardnd_core::{chunk, Element, Error, Result};

use crate::array::SplitArray;
use crate::layout::{lane_count, lane_tag, sanitize_axis, transpose_from_front, transpose_to_front, Shape};

// =============================================================================
// Public Interface
// =============================================================================

/// Sorts `a` along `axis` (defaulting to the last axis), ascending or
/// descending. The result has the same global shape, split axis and dtype as
/// the input, and restores the exact per-rank local extent along the split
/// axis.
///
/// Must be called by every rank of the group with identical arguments.
pub fn sort<T: Element>(
    a: &SplitArray<T>,
    axis: Option<usize>,
    descending: bool,
) -> Result<SplitArray<T>> {
    let ndim = a.ndim();
    if ndim == 0 {
        return Err(Error::invalid_operation(
            "cannot sort a zero-dimensional array",
        ));
    }
    let axis = match axis {
        Some(ax) => sanitize_axis(ndim, ax)?,
        None => ndim - 1,
    };

    if a.split() == Some(axis) {
        distributed_sort(a, axis, descending)
    } else {
        // Values along `axis` are never split across ranks here, so a purely
        // local sort is globally correct.
        Ok(local_sort(a, axis, descending))
    }
}

/// Sorts `a` along `axis` into an existing destination array, which must have
/// the same global shape and split axis as `a`.
pub fn sort_into<T: Element>(
    a: &SplitArray<T>,
    axis: Option<usize>,
    descending: bool,
    out: &mut SplitArray<T>,
) -> Result<()> {
    if out.gshape() != a.gshape() {
        return Err(Error::shape_mismatch(a.gshape(), out.gshape()));
    }
    if out.split() != a.split() {
        return Err(Error::SplitMismatch {
            expected: a.split(),
            actual: out.split(),
        });
    }
    let sorted = sort(a, axis, descending)?;
    out.local_mut().copy_from_slice(sorted.local());
    Ok(())
}

// =============================================================================
// Local Path
// =============================================================================

/// Sorts each lane of the local slice along `axis`; no communication.
fn local_sort<T: Element>(a: &SplitArray<T>, axis: usize, descending: bool) -> SplitArray<T> {
    let lshape = a.lshape();
    let lanes = lane_count(lshape, axis);
    let mut front = transpose_to_front(a.local(), lshape, axis);
    sort_lanes(&mut front, lshape[axis], lanes, descending);
    let data = transpose_from_front(&front, lshape, axis);
    SplitArray::from_parts(
        data,
        Shape::from_slice(a.gshape()),
        Shape::from_slice(lshape),
        a.split(),
        a.pg().clone(),
    )
}

/// Sorts every lane of a work-view buffer independently.
fn sort_lanes<T: Element>(front: &mut [T], rows: usize, lanes: usize, descending: bool) {
    let mut column: Vec<T> = Vec::with_capacity(rows);
    for lane in 0..lanes {
        column.clear();
        column.extend((0..rows).map(|r| front[r * lanes + lane]));
        column.sort_unstable_by(|x, y| x.total_order(y));
        if descending {
            column.reverse();
        }
        for (r, &v) in column.iter().enumerate() {
            front[r * lanes + lane] = v;
        }
    }
}

// =============================================================================
// Distributed Path
// =============================================================================

fn distributed_sort<T: Element>(
    a: &SplitArray<T>,
    axis: usize,
    descending: bool,
) -> Result<SplitArray<T>> {
    let pg = a.pg().clone();
    let size = pg.size();
    let rank = pg.rank();
    let gshape = Shape::from_slice(a.gshape());
    let lshape = Shape::from_slice(a.lshape());
    let llen = lshape[axis];
    let lanes = lane_count(&lshape, axis);

    // Nothing crosses rank boundaries for degenerate extents. Every rank
    // computes this from the global shape, so no rank diverges.
    if gshape[axis] <= 1 || lanes == 0 {
        return Ok(local_sort(a, axis, descending));
    }

    // Original per-rank chunk lengths along the split axis; these are the
    // rebalance targets.
    let (targets, _) = chunk::counts_displs(gshape[axis], size);

    debug!(rank, axis, llen, lanes, descending, "sort: distributed path");

    // Phase 1: LOCAL_SORT.
    let mut work = transpose_to_front(a.local(), &lshape, axis);
    sort_lanes(&mut work, llen, lanes, descending);
    trace!(rank, phase = "local_sort", "sort");

    // Phase 2: PIVOT_SAMPLE. `size` evenly spaced oversample rows per lane;
    // ranks owning nothing contribute nothing.
    let mut samples: Vec<T> = Vec::with_capacity(if llen > 0 { size * lanes } else { 0 });
    if llen > 0 {
        for x in 1..=size {
            let row = x * llen / (size + 1);
            samples.extend_from_slice(&work[row * lanes..(row + 1) * lanes]);
        }
    }
    trace!(rank, phase = "pivot_sample", count = samples.len(), "sort");

    // Phase 3: PIVOT_GATHER. Only ranks with elements contribute rows; the
    // contribution pattern is derived from the chunk table, identically on
    // every rank.
    let gather_counts: Vec<usize> = targets
        .iter()
        .map(|&t| if t > 0 { size * lanes } else { 0 })
        .collect();
    let gather_displs = exclusive_prefix(&gather_counts);
    let total_samples: usize = gather_counts.iter().sum();
    let mut sample_buffer = if rank == 0 {
        vec![T::zeroed(); total_samples]
    } else {
        Vec::new()
    };
    pg.gather_v(
        &samples,
        if rank == 0 {
            Some(&mut sample_buffer)
        } else {
            None
        },
        &gather_counts,
        &gather_displs,
        0,
    );

    // Phase 4: GLOBAL_PIVOT_COMPUTE. Root picks `size - 1` evenly spaced
    // values per lane from the sorted oversample.
    let n_pivots = size - 1;
    let mut pivots = vec![T::zeroed(); n_pivots * lanes];
    if rank == 0 {
        let sample_rows = total_samples / lanes;
        sort_lanes(&mut sample_buffer, sample_rows, lanes, descending);
        for x in 1..size {
            let row = x * sample_rows / size;
            let dst = (x - 1) * lanes;
            pivots[dst..dst + lanes].copy_from_slice(&sample_buffer[row * lanes..(row + 1) * lanes]);
        }
    }

    // Phase 5: PIVOT_BROADCAST.
    pg.broadcast(&mut pivots, 0);
    trace!(rank, phase = "pivot_broadcast", "sort");

    // Phase 6: CLASSIFY. Destination of a value is the first bucket whose
    // pivot it does not exceed (ascending; does not fall below, descending).
    // Boundary ties land in the lower-index bucket.
    let mut dest = vec![0_u32; llen * lanes];
    let mut send_matrix = vec![0_i64; size * lanes]; // [dest rank][lane]
    for r in 0..llen {
        for lane in 0..lanes {
            let v = &work[r * lanes + lane];
            let mut d = size - 1;
            for i in 0..n_pivots {
                let fits = if descending {
                    v.total_order(&pivots[i * lanes + lane]) != Ordering::Less
                } else {
                    v.total_order(&pivots[i * lanes + lane]) != Ordering::Greater
                };
                if fits {
                    d = i;
                    break;
                }
            }
            dest[r * lanes + lane] = d as u32;
            send_matrix[d * lanes + lane] += 1;
        }
    }
    trace!(rank, phase = "classify", "sort");

    // Phase 7: EXCHANGE_COUNTS. The summed partition matrix tells every rank
    // how many elements each rank holds per lane after the exchange; the
    // all-to-all tells each rank how many to expect from every peer.
    let mut partition_matrix = send_matrix.clone();
    pg.all_reduce_sum_i64(&mut partition_matrix);
    let mut recv_matrix = vec![0_i64; size * lanes]; // [src rank][lane]
    pg.all_to_all(&send_matrix, &mut recv_matrix);
    trace!(rank, phase = "exchange_counts", "sort");

    // Phase 8: EXCHANGE_DATA. One tagged message per (destination, lane);
    // the lane tag keeps concurrent per-lane transfers to the same rank apart.
    let mut outgoing: Vec<Vec<T>> = vec![Vec::new(); size * lanes];
    for r in 0..llen {
        for lane in 0..lanes {
            let d = dest[r * lanes + lane] as usize;
            outgoing[d * lanes + lane].push(work[r * lanes + lane]);
        }
    }
    for d in 0..size {
        if d == rank {
            continue;
        }
        for lane in 0..lanes {
            let buf = &outgoing[d * lanes + lane];
            if !buf.is_empty() {
                pg.send(buf, d, lane_tag(lane));
            }
        }
    }
    let mut buckets: Vec<Vec<T>> = (0..lanes)
        .map(|lane| Vec::with_capacity(partition_matrix[rank * lanes + lane] as usize))
        .collect();
    for src in 0..size {
        for lane in 0..lanes {
            if src == rank {
                buckets[lane].extend_from_slice(&outgoing[rank * lanes + lane]);
            } else {
                let count = recv_matrix[src * lanes + lane] as usize;
                if count > 0 {
                    let mut buf = vec![T::zeroed(); count];
                    pg.recv(&mut buf, src, lane_tag(lane));
                    buckets[lane].extend_from_slice(&buf);
                }
            }
        }
    }
    trace!(rank, phase = "exchange_data", "sort");

    // Phase 9: REBALANCE. Classification rarely hits the target chunk lengths
    // exactly. Per lane, the buckets held across ranks form one globally
    // ordered sequence; rank r holds global positions [S_r, S_r + c_r) of it
    // and must end up with [T_r, T_r + t_r). Both prefix tables are known on
    // every rank from the partition matrix, so each pairwise move count is the
    // overlap of two intervals and one all_to_all_v settles everything.
    for bucket in &mut buckets {
        bucket.sort_unstable_by(|x, y| x.total_order(y));
        if descending {
            bucket.reverse();
        }
    }

    let held = |r: usize, lane: usize| partition_matrix[r * lanes + lane] as usize;
    let held_prefix = |r: usize, lane: usize| -> usize {
        (0..r).map(|q| held(q, lane)).sum()
    };
    let target_prefix: Vec<usize> = exclusive_prefix(&targets);
    let moves = |from: usize, to: usize, lane: usize| -> usize {
        let s = held_prefix(from, lane);
        let c = held(from, lane);
        let t = target_prefix[to];
        interval_overlap(s, s + c, t, t + targets[to])
    };

    let mut send_buf: Vec<T> = Vec::new();
    let mut send_counts = vec![0_usize; size];
    for q in 0..size {
        for lane in 0..lanes {
            let s = held_prefix(rank, lane);
            let lo = s.max(target_prefix[q]);
            let hi = (s + held(rank, lane)).min(target_prefix[q] + targets[q]);
            if hi > lo {
                send_buf.extend_from_slice(&buckets[lane][lo - s..hi - s]);
                send_counts[q] += hi - lo;
            }
        }
    }
    let recv_counts: Vec<usize> = (0..size)
        .map(|p| (0..lanes).map(|lane| moves(p, rank, lane)).sum())
        .collect();
    let mut recv_buf = vec![T::zeroed(); recv_counts.iter().sum()];
    pg.all_to_all_v(&send_buf, &send_counts, &mut recv_buf, &recv_counts);
    trace!(rank, phase = "rebalance", "sort");

    // Phase 10: FINALIZE. Reassemble lanes in (source rank, position) order,
    // sort once more and transpose back. The target extent equals the input's
    // local extent, which is the rebalance invariant.
    let tlen = targets[rank];
    let mut final_lanes: Vec<Vec<T>> = vec![Vec::with_capacity(tlen); lanes];
    let mut offset = 0;
    for p in 0..size {
        for lane in 0..lanes {
            let n = moves(p, rank, lane);
            final_lanes[lane].extend_from_slice(&recv_buf[offset..offset + n]);
            offset += n;
        }
    }

    let mut out_front = vec![T::zeroed(); tlen * lanes];
    for lane in 0..lanes {
        debug_assert_eq!(final_lanes[lane].len(), tlen);
        for r in 0..tlen {
            out_front[r * lanes + lane] = final_lanes[lane][r];
        }
    }
    sort_lanes(&mut out_front, tlen, lanes, descending);
    let data = transpose_from_front(&out_front, &lshape, axis);
    trace!(rank, phase = "finalize", "sort");

    Ok(SplitArray::from_parts(
        data,
        gshape,
        lshape,
        Some(axis),
        pg,
    ))
}

// =============================================================================
// Helpers
// =============================================================================

/// Exclusive prefix sum.
fn exclusive_prefix(counts: &[usize]) -> Vec<usize> {
    let mut displs = Vec::with_capacity(counts.len());
    let mut acc = 0;
    for &c in counts {
        displs.push(acc);
        acc += c;
    }
    displs
}

/// Size of the overlap of the half-open intervals `[a, b)` and `[c, d)`.
fn interval_overlap(a: usize, b: usize, c: usize, d: usize) -> usize {
    b.min(d).saturating_sub(a.max(c))
}

// =============================================================================
// Tests
// =============================================================================
