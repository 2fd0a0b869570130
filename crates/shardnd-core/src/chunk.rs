//! Partition Chunking - Split-Axis Ownership Rules
//!
//! Given a global shape and a split axis, these functions deterministically
//! compute each rank's contiguous slice of global indices along that axis.
//! Chunks are balanced to within one element, with any remainder assigned to
//! the lowest ranks first. Every rank computes identical chunk tables from the
//! same inputs, which is what lets the distributed engines derive send and
//! receive counts without extra communication.
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use crate::error::{Error, Result};

// =============================================================================
// Chunk Computation
// =============================================================================

/// Computes this rank's contiguous `(offset, length)` along `axis`.
///
/// # Arguments
/// * `global` - The global shape
/// * `axis` - The split axis
/// * `rank` - The calling process's rank
/// * `size` - The process-group size
///
/// # Returns
/// `(offset, length)` of the slice of global indices owned by `rank`.
pub fn chunk(global: &[usize], axis: usize, rank: usize, size: usize) -> Result<(usize, usize)> {
    if axis >= global.len() {
        return Err(Error::invalid_dimension(axis, global.len()));
    }
    if rank >= size {
        return Err(Error::InvalidRank { rank, size });
    }

    let extent = global[axis];
    let base = extent / size;
    let remainder = extent % size;

    let length = base + usize::from(rank < remainder);
    let offset = rank * base + rank.min(remainder);

    Ok((offset, length))
}

/// Computes per-rank counts and exclusive-prefix displacements along an axis
/// of length `extent`.
///
/// # Returns
/// `(counts, displs)` where `counts[r]` is the number of indices owned by rank
/// `r` and `displs[r]` is the global index at which rank `r`'s chunk begins.
#[must_use]
pub fn counts_displs(extent: usize, size: usize) -> (Vec<usize>, Vec<usize>) {
    let base = extent / size;
    let remainder = extent % size;

    let counts: Vec<usize> = (0..size)
        .map(|r| base + usize::from(r < remainder))
        .collect();

    let mut displs = Vec::with_capacity(size);
    let mut acc = 0;
    for &c in &counts {
        displs.push(acc);
        acc += c;
    }

    (counts, displs)
}

/// Computes the local shape of `rank`'s slice of an array with shape `global`
/// split along `axis`.
pub fn local_extents(
    global: &[usize],
    axis: usize,
    rank: usize,
    size: usize,
) -> Result<Vec<usize>> {
    let (_, length) = chunk(global, axis, rank, size)?;
    let mut local = global.to_vec();
    local[axis] = length;
    Ok(local)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_even_split() {
        // 8 elements over 4 ranks: 2 each.
        for rank in 0..4 {
            assert_eq!(chunk(&[8], 0, rank, 4).unwrap(), (rank * 2, 2));
        }
    }

    #[test]
    fn test_chunk_remainder_to_lowest_ranks() {
        // 10 over 4: 3, 3, 2, 2.
        assert_eq!(chunk(&[10], 0, 0, 4).unwrap(), (0, 3));
        assert_eq!(chunk(&[10], 0, 1, 4).unwrap(), (3, 3));
        assert_eq!(chunk(&[10], 0, 2, 4).unwrap(), (6, 2));
        assert_eq!(chunk(&[10], 0, 3, 4).unwrap(), (8, 2));
    }

    #[test]
    fn test_chunk_zero_length_ranks() {
        // 3 over 4: the highest rank owns nothing.
        assert_eq!(chunk(&[3], 0, 3, 4).unwrap(), (3, 0));
        assert_eq!(chunk(&[3], 0, 0, 4).unwrap(), (0, 1));
    }

    #[test]
    fn test_chunk_invalid_axis() {
        assert!(chunk(&[4, 4], 2, 0, 2).is_err());
    }

    #[test]
    fn test_counts_displs_sum_to_extent() {
        let (counts, displs) = counts_displs(11, 3);
        assert_eq!(counts, vec![4, 4, 3]);
        assert_eq!(displs, vec![0, 4, 8]);
        assert_eq!(counts.iter().sum::<usize>(), 11);
    }

    #[test]
    fn test_counts_displs_balanced_within_one() {
        let (counts, _) = counts_displs(13, 5);
        let max = counts.iter().max().unwrap();
        let min = counts.iter().min().unwrap();
        assert!(max - min <= 1);
    }

    #[test]
    fn test_local_extents() {
        let local = local_extents(&[10, 4], 0, 2, 4).unwrap();
        assert_eq!(local, vec![2, 4]);
    }
}
