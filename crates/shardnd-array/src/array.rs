//! `SplitArray` - Distributed Partitioned Array Container
//!
//! A `SplitArray` is an n-dimensional array whose data is either replicated on
//! every rank (`split == None`) or partitioned along one axis across the
//! process group, each rank owning a contiguous, chunk-balanced slice of
//! global indices along that axis.
//!
//! Invariant: the local extents along the split axis sum to the global extent
//! over all ranks, and every other extent equals the global one. Constructors
//! validate local buffers against the partition chunking rules, so an array
//! that exists is an array whose layout every rank agrees on.
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use core::fmt;

use shardnd_comm::ProcessGroup;
use shardnd_core::{chunk, DType, Element, Error, Result};

use crate::layout::{self, numel, Shape};

// =============================================================================
// SplitArray Struct
// =============================================================================

/// An n-dimensional array partitioned along one axis across a process group.
#[derive(Clone)]
pub struct SplitArray<T: Element> {
    /// Global shape.
    gshape: Shape,
    /// This rank's local slice shape.
    lshape: Shape,
    /// The split axis, or `None` for a replicated array.
    split: Option<usize>,
    /// Local buffer, row-major.
    data: Vec<T>,
    /// The process group this array lives on.
    pg: ProcessGroup,
}

impl<T: Element> SplitArray<T> {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates an array from this rank's local slice of the global data.
    ///
    /// `data` must hold exactly this rank's chunk along `split` (or the full
    /// global buffer when `split` is `None`).
    pub fn from_global(
        data: Vec<T>,
        gshape: &[usize],
        split: Option<usize>,
        pg: ProcessGroup,
    ) -> Result<Self> {
        let lshape: Shape = match split {
            Some(axis) => {
                Shape::from_vec(chunk::local_extents(gshape, axis, pg.rank(), pg.size())?)
            }
            None => Shape::from_slice(gshape),
        };
        if data.len() != numel(&lshape) {
            return Err(Error::shape_mismatch(&lshape, &[data.len()]));
        }
        Ok(Self {
            gshape: Shape::from_slice(gshape),
            lshape,
            split,
            data,
            pg,
        })
    }

    /// Creates a replicated (unsplit) array holding `data` on every rank.
    pub fn replicated(data: Vec<T>, gshape: &[usize], pg: ProcessGroup) -> Result<Self> {
        Self::from_global(data, gshape, None, pg)
    }

    /// Creates a split array from a full global buffer present on every rank:
    /// each rank keeps only its chunk along `split`.
    pub fn from_replicated_global(
        full: &[T],
        gshape: &[usize],
        split: usize,
        pg: ProcessGroup,
    ) -> Result<Self> {
        layout::sanitize_axis(gshape.len(), split)?;
        if full.len() != numel(gshape) {
            return Err(Error::shape_mismatch(gshape, &[full.len()]));
        }

        let (offset, length) = chunk::chunk(gshape, split, pg.rank(), pg.size())?;
        let lanes = layout::lane_count(gshape, split);
        let front = layout::transpose_to_front(full, gshape, split);
        let local_front = front[offset * lanes..(offset + length) * lanes].to_vec();

        let mut lshape = Shape::from_slice(gshape);
        lshape[split] = length;
        let data = layout::transpose_from_front(&local_front, &lshape, split);

        Ok(Self {
            gshape: Shape::from_slice(gshape),
            lshape,
            split: Some(split),
            data,
            pg,
        })
    }

    /// Assembles an array from parts already known to satisfy the layout
    /// invariant. Used by the engines, which construct results whose shapes
    /// they have computed from the chunk tables themselves.
    pub(crate) fn from_parts(
        data: Vec<T>,
        gshape: Shape,
        lshape: Shape,
        split: Option<usize>,
        pg: ProcessGroup,
    ) -> Self {
        debug_assert_eq!(data.len(), numel(&lshape));
        Self {
            gshape,
            lshape,
            split,
            data,
            pg,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the global shape.
    #[must_use]
    pub fn gshape(&self) -> &[usize] {
        &self.gshape
    }

    /// Returns this rank's local slice shape.
    #[must_use]
    pub fn lshape(&self) -> &[usize] {
        &self.lshape
    }

    /// Returns the split axis, or `None` for a replicated array.
    #[must_use]
    pub fn split(&self) -> Option<usize> {
        self.split
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.gshape.len()
    }

    /// Returns the local extent along `axis`.
    #[must_use]
    pub fn local_extent(&self, axis: usize) -> usize {
        self.lshape[axis]
    }

    /// Returns the runtime dtype of the elements.
    #[must_use]
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Returns the local buffer (row-major).
    #[must_use]
    pub fn local(&self) -> &[T] {
        &self.data
    }

    /// Returns the local buffer mutably.
    pub fn local_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns the process group this array lives on.
    #[must_use]
    pub fn pg(&self) -> &ProcessGroup {
        &self.pg
    }

    /// Validates `axis` against this array's dimensionality. Purely local;
    /// safe to fail before any collective call.
    pub fn check_axis(&self, axis: usize) -> Result<usize> {
        layout::sanitize_axis(self.ndim(), axis)
    }
}

impl<T: Element> fmt::Debug for SplitArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitArray")
            .field("gshape", &self.gshape)
            .field("lshape", &self.lshape)
            .field("split", &self.split)
            .field("dtype", &T::DTYPE)
            .field("rank", &self.pg.rank())
            .field("size", &self.pg.size())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shardnd_comm::run_world;

    #[test]
    fn test_replicated_single_rank() {
        let pg = ProcessGroup::mock();
        let a = SplitArray::replicated(vec![1_i64, 2, 3, 4], &[2, 2], pg).unwrap();
        assert_eq!(a.gshape(), &[2, 2]);
        assert_eq!(a.lshape(), &[2, 2]);
        assert_eq!(a.split(), None);
        assert_eq!(a.dtype().name(), "i64");
    }

    #[test]
    fn test_from_global_length_mismatch() {
        let pg = ProcessGroup::mock();
        let err = SplitArray::from_global(vec![1.0_f32; 3], &[2, 2], None, pg);
        assert!(err.is_err());
    }

    #[test]
    fn test_from_replicated_global_slices_chunks() {
        run_world(2, |pg| {
            let rank = pg.rank();
            let full = [1_i32, 2, 3, 4, 5, 6];
            let a = SplitArray::from_replicated_global(&full, &[3, 2], 0, pg).unwrap();
            // 3 rows over 2 ranks: rank 0 gets 2 rows, rank 1 gets 1.
            if rank == 0 {
                assert_eq!(a.lshape(), &[2, 2]);
                assert_eq!(a.local(), &[1, 2, 3, 4]);
            } else {
                assert_eq!(a.lshape(), &[1, 2]);
                assert_eq!(a.local(), &[5, 6]);
            }
        });
    }

    #[test]
    fn test_from_replicated_global_along_axis1() {
        run_world(2, |pg| {
            let rank = pg.rank();
            let full = [1_i32, 2, 3, 4, 5, 6];
            let a = SplitArray::from_replicated_global(&full, &[2, 3], 1, pg).unwrap();
            if rank == 0 {
                assert_eq!(a.lshape(), &[2, 2]);
                assert_eq!(a.local(), &[1, 2, 4, 5]);
            } else {
                assert_eq!(a.lshape(), &[2, 1]);
                assert_eq!(a.local(), &[3, 6]);
            }
        });
    }

    #[test]
    fn test_check_axis() {
        let pg = ProcessGroup::mock();
        let a = SplitArray::replicated(vec![0_u8; 4], &[4], pg).unwrap();
        assert!(a.check_axis(0).is_ok());
        assert!(a.check_axis(1).is_err());
    }

    #[test]
    fn test_zero_length_chunk_is_valid() {
        run_world(4, |pg| {
            let rank = pg.rank();
            let full = [7_i64, 8, 9];
            let a = SplitArray::from_replicated_global(&full, &[3], 0, pg).unwrap();
            if rank == 3 {
                assert_eq!(a.local_extent(0), 0);
                assert!(a.local().is_empty());
            } else {
                assert_eq!(a.local_extent(0), 1);
            }
        });
    }
}
