//! Layout - Shape and Work-View Helpers
//!
//! The distributed engines operate on a "work view" of the local buffer: the
//! axis of interest transposed to position 0, so rows index positions along
//! that axis and every fixed combination of the remaining coordinates forms a
//! "lane". Lanes are numbered by the row-major linear index of the non-axis
//! coordinate tuple, which doubles as a collision-free point-to-point tag (a
//! fixed mixed-radix encoding of the tuple).
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use smallvec::SmallVec;

use shardnd_core::{Element, Error, Result};

// =============================================================================
// Type Aliases
// =============================================================================

/// Shape type - dimensions of an array.
/// Uses `SmallVec` for stack allocation of small shapes (up to 6 dimensions).
pub type Shape = SmallVec<[usize; 6]>;

// =============================================================================
// Shape Utilities
// =============================================================================

/// Computes the total number of elements from a shape.
#[must_use]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Validates an axis index against the number of dimensions.
pub fn sanitize_axis(ndim: usize, axis: usize) -> Result<usize> {
    if axis >= ndim {
        return Err(Error::invalid_dimension(axis, ndim));
    }
    Ok(axis)
}

/// Number of lanes of a shape with respect to `axis`: the product of all
/// extents except `shape[axis]`.
#[must_use]
pub fn lane_count(shape: &[usize], axis: usize) -> usize {
    shape
        .iter()
        .enumerate()
        .filter(|&(d, _)| d != axis)
        .map(|(_, &e)| e)
        .product()
}

/// Canonical point-to-point tag for a lane.
///
/// The lane index is already the row-major linear index of the non-axis
/// coordinate tuple - a bijective fixed mixed-radix encoding - so distinct
/// lanes can never collide, regardless of how many digits their coordinates
/// have.
#[must_use]
pub fn lane_tag(lane: usize) -> u64 {
    lane as u64
}

// =============================================================================
// Work-View Transposition
// =============================================================================

/// Copies `data` (row-major, shape `shape`) into the work view with `axis`
/// transposed to position 0: element `(row, lane)` of the result lives at
/// `row * lanes + lane`.
#[must_use]
pub fn transpose_to_front<T: Element>(data: &[T], shape: &[usize], axis: usize) -> Vec<T> {
    debug_assert_eq!(data.len(), numel(shape));
    let lanes = lane_count(shape, axis);
    let mut out = vec![T::zeroed(); data.len()];
    for_each_position(shape, axis, |linear, row, lane| {
        out[row * lanes + lane] = data[linear];
    });
    out
}

/// Inverse of [`transpose_to_front`]: copies a work-view buffer back into
/// row-major order for the original `shape`.
#[must_use]
pub fn transpose_from_front<T: Element>(front: &[T], shape: &[usize], axis: usize) -> Vec<T> {
    debug_assert_eq!(front.len(), numel(shape));
    let lanes = lane_count(shape, axis);
    let mut out = vec![T::zeroed(); front.len()];
    for_each_position(shape, axis, |linear, row, lane| {
        out[linear] = front[row * lanes + lane];
    });
    out
}

/// Walks all positions of `shape` in row-major order, reporting for each the
/// linear index, the coordinate along `axis`, and the lane index of the
/// remaining coordinates.
fn for_each_position(shape: &[usize], axis: usize, mut f: impl FnMut(usize, usize, usize)) {
    let n = numel(shape);
    if n == 0 {
        return;
    }
    let ndim = shape.len();
    let mut coords = vec![0_usize; ndim];
    for linear in 0..n {
        let mut lane = 0;
        for d in 0..ndim {
            if d != axis {
                lane = lane * shape[d] + coords[d];
            }
        }
        f(linear, coords[axis], lane);

        for d in (0..ndim).rev() {
            coords[d] += 1;
            if coords[d] < shape[d] {
                break;
            }
            coords[d] = 0;
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
    fn test_numel() {
        assert_eq!(numel(&[2, 3, 4]), 24);
        assert_eq!(numel(&[]), 1);
        assert_eq!(numel(&[5, 0]), 0);
    }

    #[test]
    fn test_sanitize_axis() {
        assert_eq!(sanitize_axis(3, 2).unwrap(), 2);
        assert!(sanitize_axis(2, 2).is_err());
    }

    #[test]
    fn test_lane_count() {
        assert_eq!(lane_count(&[4, 3, 2], 0), 6);
        assert_eq!(lane_count(&[4, 3, 2], 1), 8);
        assert_eq!(lane_count(&[7], 0), 1);
    }

    #[test]
    fn test_transpose_axis0_is_identity() {
        let data = vec![1_i32, 2, 3, 4, 5, 6];
        let front = transpose_to_front(&data, &[3, 2], 0);
        assert_eq!(front, data);
    }

    #[test]
    fn test_transpose_to_front_axis1() {
        // Shape [2, 3]: rows of the work view index axis 1.
        let data = vec![1_i32, 2, 3, 4, 5, 6];
        let front = transpose_to_front(&data, &[2, 3], 1);
        // Work view is [3, 2]: row r holds column r of the original.
        assert_eq!(front, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_transpose_round_trip_3d() {
        let shape = [2_usize, 3, 4];
        let data: Vec<i64> = (0..24).collect();
        for axis in 0..3 {
            let front = transpose_to_front(&data, &shape, axis);
            let back = transpose_from_front(&front, &shape, axis);
            assert_eq!(back, data, "axis {axis}");
        }
    }

    #[test]
    fn test_transpose_empty() {
        let data: Vec<f32> = Vec::new();
        let front = transpose_to_front(&data, &[0, 3], 0);
        assert!(front.is_empty());
    }

    #[test]
    fn test_lane_tags_unique_across_mixed_extents() {
        // Shapes like [2, 11] vs [21, 1] produced colliding tags under naive
        // digit concatenation; linear lane indices cannot collide.
        let shape = [5_usize, 2, 11];
        let lanes = lane_count(&shape, 0);
        let tags: std::collections::HashSet<u64> = (0..lanes).map(lane_tag).collect();
        assert_eq!(tags.len(), lanes);
    }
}
