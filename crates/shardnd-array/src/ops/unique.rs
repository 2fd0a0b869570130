//! Distributed Unique Engine
//!
//! Computes the distinct elements of a partitioned array - or the distinct
//! slices along an axis - across all ranks, optionally with an inverse index
//! map satisfying `result[inverse[i]] == a[i]` for every original position.
//!
//! Three layouts, three strategies:
//!
//! - **Replicated input**: a single local pass, no communication.
//! - **`axis` unset or equal to the split axis**: duplicates may appear on any
//!   rank, so local distinct lists are concatenated with a variable-count
//!   all-gather and deduplicated a second time; inverse indices compose the
//!   local map, the rank's displacement in the concatenation and the second
//!   pass's map.
//! - **`axis` set and different from the split axis**: slices along `axis`
//!   straddle ranks, so no rank can compare two slices locally. Each rank
//!   fingerprints its portion of every slice, the fingerprint matrix is
//!   all-gathered, and every rank independently keeps the first occurrence of
//!   each combined fingerprint - a deterministic, coordinator-free selection
//!   that all ranks agree on. For this layout the result keeps the slices in
//!   first-occurrence order; the `sorted` flag does not reorder them, since
//!   no rank holds complete slices to compare by value.
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use core::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::hash::Hasher;

use rustc_hash::{FxHashMap, FxHasher};
use tracing::{debug, trace};

use shardnd_core::{chunk, Element, Error, Result};

use crate::array::SplitArray;
use crate::layout::{
    lane_count, numel, sanitize_axis, transpose_from_front, transpose_to_front, Shape,
};

// =============================================================================
// Inverse Index Map
// =============================================================================

/// Maps each original element (or slice position along the unique axis) to its
/// position in the unique result. Replicated on every rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InverseMap {
    shape: Shape,
    data: Vec<i64>,
}

impl InverseMap {
    fn new(shape: Shape, data: Vec<i64>) -> Self {
        debug_assert_eq!(numel(&shape), data.len());
        Self { shape, data }
    }

    /// Returns the shape of the map (the original global shape for
    /// whole-array unique, or `[axis extent]` for axis-wise unique).
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the flat row-major index values.
    #[must_use]
    pub fn values(&self) -> &[i64] {
        &self.data
    }

    /// Returns the number of mapped positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// =============================================================================
// Public Interface
// =============================================================================

/// Returns the distinct elements of `a` (or the distinct slices along `axis`).
///
/// With `axis = None` the array is treated as flat and the result is a
/// replicated one-dimensional array. With `axis` equal to the split axis the
/// result stays split along that axis. `sorted` selects ascending order where
/// slices can be compared by value; otherwise first-occurrence order is used.
///
/// Must be called by every rank of the group with identical arguments.
pub fn unique<T: Element>(
    a: &SplitArray<T>,
    sorted: bool,
    axis: Option<usize>,
) -> Result<SplitArray<T>> {
    Ok(unique_impl(a, sorted, axis, false)?.0)
}

/// Like [`unique`], additionally returning the inverse index map.
pub fn unique_with_inverse<T: Element>(
    a: &SplitArray<T>,
    sorted: bool,
    axis: Option<usize>,
) -> Result<(SplitArray<T>, InverseMap)> {
    let (result, inverse) = unique_impl(a, sorted, axis, true)?;
    let inverse = inverse.ok_or_else(|| Error::internal("unique produced no inverse map"))?;
    Ok((result, inverse))
}

fn unique_impl<T: Element>(
    a: &SplitArray<T>,
    sorted: bool,
    axis: Option<usize>,
    want_inverse: bool,
) -> Result<(SplitArray<T>, Option<InverseMap>)> {
    if let Some(ax) = axis {
        sanitize_axis(a.ndim(), ax)?;
    }

    match (a.split(), axis) {
        (None, _) => Ok(local_unique(a, sorted, axis, want_inverse)),
        (Some(split), None) => merged_unique_flat(a, split, sorted, want_inverse),
        (Some(split), Some(ax)) if ax == split => {
            merged_unique_rows(a, split, sorted, want_inverse)
        }
        (Some(split), Some(ax)) => fingerprint_unique(a, split, ax, sorted, want_inverse),
    }
}

// =============================================================================
// Replicated Path
// =============================================================================

fn local_unique<T: Element>(
    a: &SplitArray<T>,
    sorted: bool,
    axis: Option<usize>,
    want_inverse: bool,
) -> (SplitArray<T>, Option<InverseMap>) {
    let pg = a.pg().clone();
    match axis {
        None => {
            let (uniques, inverse) = unique_values(a.local(), sorted);
            let k = uniques.len();
            let result = SplitArray::from_parts(
                uniques,
                Shape::from_slice(&[k]),
                Shape::from_slice(&[k]),
                None,
                pg,
            );
            let map = want_inverse
                .then(|| InverseMap::new(Shape::from_slice(a.gshape()), inverse));
            (result, map)
        }
        Some(ax) => {
            let lshape = a.lshape();
            let rows = lshape[ax];
            let width = lane_count(lshape, ax);
            let front = transpose_to_front(a.local(), lshape, ax);
            let (urows, k, inverse) = unique_rows(&front, rows, width, sorted);

            let mut out_shape = Shape::from_slice(a.gshape());
            out_shape[ax] = k;
            let data = transpose_from_front(&urows, &out_shape, ax);
            let result =
                SplitArray::from_parts(data, out_shape.clone(), out_shape, None, pg);
            let map = want_inverse.then(|| InverseMap::new(Shape::from_slice(&[rows]), inverse));
            (result, map)
        }
    }
}

// =============================================================================
// Merged Path (axis unset, flat result)
// =============================================================================

fn merged_unique_flat<T: Element>(
    a: &SplitArray<T>,
    split: usize,
    sorted: bool,
    want_inverse: bool,
) -> Result<(SplitArray<T>, Option<InverseMap>)> {
    let pg = a.pg().clone();
    let size = pg.size();
    debug!(rank = pg.rank(), split, "unique: merged flat path");

    // First pass: local distinct elements. A zero-length rank contributes an
    // empty list but still enters every collective below.
    let (local_distinct, local_inverse) = unique_values(a.local(), sorted);

    let (candidate, displs) = gather_candidates(&pg, &local_distinct, 1);
    trace!(phase = "candidate_gather", total = candidate.len(), "unique");

    // Second pass resolves duplicates that existed across ranks but not
    // within one.
    let (global_distinct, global_inverse) = unique_values(&candidate, sorted);
    let k = global_distinct.len();
    let result = SplitArray::from_parts(
        global_distinct,
        Shape::from_slice(&[k]),
        Shape::from_slice(&[k]),
        None,
        pg.clone(),
    );

    let map = if want_inverse {
        // Compose: original element -> local distinct position -> candidate
        // position (local displacement) -> final position.
        let my_displ = displs[pg.rank()];
        let piece: Vec<i64> = local_inverse
            .iter()
            .map(|&l| global_inverse[my_displ + l as usize])
            .collect();

        // Assemble the global map along the split axis. Displacements must be
        // in flattened-element units: a chunk of `c` indices along the split
        // axis holds `c * lanes` elements of the work view.
        let gshape = Shape::from_slice(a.gshape());
        let lanes = lane_count(&gshape, split);
        let (axis_counts, _) = chunk::counts_displs(gshape[split], size);
        let elem_counts: Vec<usize> = axis_counts.iter().map(|&c| c * lanes).collect();
        let elem_displs = exclusive_prefix(&elem_counts);

        let piece_front = transpose_to_front(&piece, a.lshape(), split);
        let mut global_front = vec![0_i64; numel(&gshape)];
        pg.all_gather_v(&piece_front, &mut global_front, &elem_counts, &elem_displs);
        let data = transpose_from_front(&global_front, &gshape, split);
        Some(InverseMap::new(gshape, data))
    } else {
        None
    };

    Ok((result, map))
}

// =============================================================================
// Merged Path (axis equals the split axis)
// =============================================================================

fn merged_unique_rows<T: Element>(
    a: &SplitArray<T>,
    split: usize,
    sorted: bool,
    want_inverse: bool,
) -> Result<(SplitArray<T>, Option<InverseMap>)> {
    let pg = a.pg().clone();
    let size = pg.size();
    let lshape = a.lshape();
    let llen = lshape[split];
    let lanes = lane_count(lshape, split);
    debug!(rank = pg.rank(), split, llen, lanes, "unique: merged rows path");

    // Zero-width rows (some non-split extent is 0) all compare equal; handle
    // them without communication. Every rank derives this from the global
    // shape, so no rank diverges.
    if lanes == 0 {
        let k = usize::from(a.gshape()[split] > 0);
        let mut out_gshape = Shape::from_slice(a.gshape());
        out_gshape[split] = k;
        let result = SplitArray::from_replicated_global(&[], &out_gshape, split, pg)?;
        let map = want_inverse
            .then(|| InverseMap::new(Shape::from_slice(&[a.gshape()[split]]), vec![0; a.gshape()[split]]));
        return Ok((result, map));
    }

    let front = transpose_to_front(a.local(), lshape, split);
    let (local_rows, _, local_inverse) = unique_rows(&front, llen, lanes, sorted);

    let (candidate, row_displs) = gather_candidates(&pg, &local_rows, lanes);
    let total_rows = candidate.len() / lanes;
    trace!(phase = "candidate_gather", total_rows, "unique");

    let (global_rows, k, global_inverse) = unique_rows(&candidate, total_rows, lanes, sorted);

    // Every rank now holds the full result; re-split it along the original
    // axis through the normal chunking path.
    let mut out_gshape = Shape::from_slice(a.gshape());
    out_gshape[split] = k;
    let full = transpose_from_front(&global_rows, &out_gshape, split);
    let result = SplitArray::from_replicated_global(&full, &out_gshape, split, pg.clone())?;

    let map = if want_inverse {
        let my_displ = row_displs[pg.rank()];
        let piece: Vec<i64> = local_inverse
            .iter()
            .map(|&l| global_inverse[my_displ + l as usize])
            .collect();

        let (axis_counts, axis_displs) = chunk::counts_displs(a.gshape()[split], size);
        let mut data = vec![0_i64; a.gshape()[split]];
        pg.all_gather_v(&piece, &mut data, &axis_counts, &axis_displs);
        Some(InverseMap::new(Shape::from_slice(&[a.gshape()[split]]), data))
    } else {
        None
    };

    Ok((result, map))
}

/// Shares per-rank distinct counts, then concatenates all local distinct lists
/// into one candidate buffer via a variable-count all-gather. Returns the
/// candidate buffer and the per-rank displacements in `row_width` units.
fn gather_candidates<T: Element>(
    pg: &shardnd_comm::ProcessGroup,
    local: &[T],
    row_width: usize,
) -> (Vec<T>, Vec<usize>) {
    let size = pg.size();
    let my_count = [(local.len() / row_width) as i64];
    let mut all_counts = vec![0_i64; size];
    pg.all_gather(&my_count, &mut all_counts);

    let counts: Vec<usize> = all_counts.iter().map(|&c| c as usize * row_width).collect();
    let displs = exclusive_prefix(&counts);
    let total: usize = counts.iter().sum();

    let mut candidate = vec![T::zeroed(); total];
    pg.all_gather_v(local, &mut candidate, &counts, &displs);

    let row_displs = all_counts
        .iter()
        .scan(0_usize, |acc, &c| {
            let d = *acc;
            *acc += c as usize;
            Some(d)
        })
        .collect();
    (candidate, row_displs)
}

// =============================================================================
// Fingerprint Path (axis differs from the split axis)
// =============================================================================

fn fingerprint_unique<T: Element>(
    a: &SplitArray<T>,
    split: usize,
    axis: usize,
    _sorted: bool,
    want_inverse: bool,
) -> Result<(SplitArray<T>, Option<InverseMap>)> {
    let pg = a.pg().clone();
    let size = pg.size();
    let rank = pg.rank();
    let lshape = a.lshape();
    let axis_len = a.gshape()[axis];
    let width = lane_count(lshape, axis);
    debug!(rank, split, axis, axis_len, "unique: fingerprint path");

    // Fingerprint this rank's portion of every slice along `axis`.
    let front = transpose_to_front(a.local(), lshape, axis);
    let local_fp: Vec<u64> = (0..axis_len)
        .map(|p| {
            let mut hasher = FxHasher::default();
            hasher.write(bytemuck::cast_slice(&front[p * width..(p + 1) * width]));
            hasher.finish()
        })
        .collect();

    // Every rank learns every rank's fingerprint vector, then combines them
    // per position. All ranks scan identical data, so all ranks keep the same
    // positions - no coordinator and no assumption that any single rank has
    // seen every distinct slice.
    let mut fp_matrix = vec![0_u64; size * axis_len];
    pg.all_gather(&local_fp, &mut fp_matrix);
    trace!(rank, phase = "fingerprint_gather", "unique");

    let mut first_seen: FxHashMap<u64, i64> = FxHashMap::default();
    let mut kept: Vec<usize> = Vec::new();
    let mut inverse = vec![0_i64; axis_len];
    for p in 0..axis_len {
        let mut hasher = FxHasher::default();
        for r in 0..size {
            hasher.write_u64(fp_matrix[r * axis_len + p]);
        }
        let combined = hasher.finish();
        match first_seen.entry(combined) {
            Entry::Vacant(slot) => {
                let id = kept.len() as i64;
                slot.insert(id);
                inverse[p] = id;
                kept.push(p);
            }
            Entry::Occupied(slot) => inverse[p] = *slot.get(),
        }
    }
    trace!(rank, phase = "fingerprint_dedup", kept = kept.len(), "unique");

    // Extract this rank's rows at the kept positions; the split layout and
    // per-rank chunk lengths along the split axis are unchanged.
    let mut out_front = Vec::with_capacity(kept.len() * width);
    for &p in &kept {
        out_front.extend_from_slice(&front[p * width..(p + 1) * width]);
    }
    let mut out_gshape = Shape::from_slice(a.gshape());
    out_gshape[axis] = kept.len();
    let mut out_lshape = Shape::from_slice(lshape);
    out_lshape[axis] = kept.len();
    let data = transpose_from_front(&out_front, &out_lshape, axis);
    let result = SplitArray::from_parts(data, out_gshape, out_lshape, Some(split), pg);

    let map = want_inverse.then(|| InverseMap::new(Shape::from_slice(&[axis_len]), inverse));
    Ok((result, map))
}

// =============================================================================
// Local Kernels
// =============================================================================

/// Distinct elements of `data` with the inverse map from each original
/// position to its unique index. `sorted` returns ascending total order;
/// otherwise first-occurrence order.
fn unique_values<T: Element>(data: &[T], sorted: bool) -> (Vec<T>, Vec<i64>) {
    group_by(data.len(), sorted, |i, j| data[i].total_order(&data[j]))
        .map_uniques(|i| data[i])
}

/// Distinct rows of a `[rows, width]` row-major buffer. Rows compare
/// lexicographically. Returns the unique rows (concatenated), their count and
/// the inverse map.
fn unique_rows<T: Element>(
    data: &[T],
    rows: usize,
    width: usize,
    sorted: bool,
) -> (Vec<T>, usize, Vec<i64>) {
    let grouped = group_by(rows, sorted, |i, j| {
        compare_rows(&data[i * width..(i + 1) * width], &data[j * width..(j + 1) * width])
    });
    let k = grouped.reps.len();
    let mut uniques = Vec::with_capacity(k * width);
    for &rep in &grouped.reps {
        uniques.extend_from_slice(&data[rep * width..(rep + 1) * width]);
    }
    (uniques, k, grouped.inverse)
}

fn compare_rows<T: Element>(a: &[T], b: &[T]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x.total_order(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Result of grouping `n` items under a total order: one representative
/// original index per distinct group plus the inverse map.
struct Grouped {
    reps: Vec<usize>,
    inverse: Vec<i64>,
}

impl Grouped {
    fn map_uniques<T>(self, get: impl Fn(usize) -> T) -> (Vec<T>, Vec<i64>) {
        (self.reps.iter().map(|&i| get(i)).collect(), self.inverse)
    }
}

fn group_by(n: usize, sorted: bool, cmp: impl Fn(usize, usize) -> Ordering) -> Grouped {
    let mut order: Vec<usize> = (0..n).collect();
    // Tie-break on the original index so each group's representative is its
    // first occurrence.
    order.sort_unstable_by(|&i, &j| cmp(i, j).then(i.cmp(&j)));

    let mut inverse = vec![0_i64; n];
    let mut reps: Vec<usize> = Vec::new();
    for &i in &order {
        if let Some(&rep) = reps.last() {
            if cmp(rep, i) == Ordering::Equal {
                inverse[i] = (reps.len() - 1) as i64;
                continue;
            }
        }
        inverse[i] = reps.len() as i64;
        reps.push(i);
    }

    if !sorted {
        // Reorder groups by first occurrence and remap the inverse.
        let mut perm: Vec<usize> = (0..reps.len()).collect();
        perm.sort_unstable_by_key(|&g| reps[g]);
        let mut new_id = vec![0_i64; reps.len()];
        for (new_g, &old_g) in perm.iter().enumerate() {
            new_id[old_g] = new_g as i64;
        }
        reps = perm.iter().map(|&g| reps[g]).collect();
        for id in &mut inverse {
            *id = new_id[*id as usize];
        }
    }

    Grouped { reps, inverse }
}

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

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shardnd_comm::ProcessGroup;

    #[test]
    fn test_unique_values_sorted() {
        let (u, inv) = unique_values(&[3_i64, 1, 3, 2, 1], true);
        assert_eq!(u, vec![1, 2, 3]);
        assert_eq!(inv, vec![2, 0, 2, 1, 0]);
    }

    #[test]
    fn test_unique_values_first_occurrence() {
        let (u, inv) = unique_values(&[3_i64, 1, 3, 2, 1], false);
        assert_eq!(u, vec![3, 1, 2]);
        assert_eq!(inv, vec![0, 1, 0, 2, 1]);
    }

    #[test]
    fn test_unique_values_empty() {
        let (u, inv) = unique_values::<f32>(&[], true);
        assert!(u.is_empty());
        assert!(inv.is_empty());
    }

    #[test]
    fn test_unique_values_round_trip() {
        let data = [5_i32, 5, 2, 9, 2, 2];
        for sorted in [false, true] {
            let (u, inv) = unique_values(&data, sorted);
            for (i, &v) in data.iter().enumerate() {
                assert_eq!(u[inv[i] as usize], v);
            }
        }
    }

    #[test]
    fn test_unique_rows_sorted() {
        // Rows: [3,2], [1,3], [3,2].
        let data = [3_i64, 2, 1, 3, 3, 2];
        let (u, k, inv) = unique_rows(&data, 3, 2, true);
        assert_eq!(k, 2);
        assert_eq!(u, vec![1, 3, 3, 2]);
        assert_eq!(inv, vec![1, 0, 1]);
    }

    #[test]
    fn test_unique_rows_zero_width() {
        // Degenerate rows all compare equal.
        let (u, k, inv) = unique_rows::<i64>(&[], 3, 0, true);
        assert!(u.is_empty());
        assert_eq!(k, 1);
        assert_eq!(inv, vec![0, 0, 0]);
    }

    #[test]
    fn test_compare_rows_lexicographic() {
        assert_eq!(compare_rows(&[1_i64, 5], &[1, 7]), Ordering::Less);
        assert_eq!(compare_rows(&[2_i64, 0], &[1, 9]), Ordering::Greater);
        assert_eq!(compare_rows(&[4_i64, 4], &[4, 4]), Ordering::Equal);
    }

    #[test]
    fn test_unique_replicated_flat() {
        let pg = ProcessGroup::mock();
        let a = SplitArray::replicated(vec![3_i64, 2, 1, 3], &[2, 2], pg).unwrap();
        let u = unique(&a, true, None).unwrap();
        assert_eq!(u.local(), &[1, 2, 3]);
        assert_eq!(u.gshape(), &[3]);
        assert_eq!(u.split(), None);
    }

    #[test]
    fn test_unique_replicated_axis() {
        let pg = ProcessGroup::mock();
        // Rows [3,2], [1,3], [3,2].
        let a = SplitArray::replicated(vec![3_i64, 2, 1, 3, 3, 2], &[3, 2], pg).unwrap();
        let (u, inv) = unique_with_inverse(&a, true, Some(0)).unwrap();
        assert_eq!(u.gshape(), &[2, 2]);
        assert_eq!(u.local(), &[1, 3, 3, 2]);
        assert_eq!(inv.values(), &[1, 0, 1]);
    }

    #[test]
    fn test_unique_invalid_axis_fails_locally() {
        let pg = ProcessGroup::mock();
        let a = SplitArray::replicated(vec![1_i64, 2], &[2], pg).unwrap();
        assert!(unique(&a, true, Some(5)).is_err());
    }

    #[test]
    fn test_inverse_map_accessors() {
        let map = InverseMap::new(Shape::from_slice(&[2, 2]), vec![0, 1, 1, 0]);
        assert_eq!(map.shape(), &[2, 2]);
        assert_eq!(map.values(), &[0, 1, 1, 0]);
        assert_eq!(map.len(), 4);
        assert!(!map.is_empty());
    }
}
