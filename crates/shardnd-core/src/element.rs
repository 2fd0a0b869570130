//! Element Types - ShardND Type System
//!
//! Defines the element types that partitioned arrays can hold and the trait
//! bounds the distributed engines rely on. Every element type is plain-old-data
//! (so buffers can be moved over the wire byte-for-byte) and carries a total
//! order (so sorting and pivot classification never hit an incomparable pair,
//! floats included).
//!
//! # Key Features
//! - Runtime dtype information via the `DType` enum
//! - Total ordering for every supported type (`total_cmp` for floats)
//! - `bytemuck::Pod` bound for zero-copy byte transfers
//!
//! @version 0.1.0
//! @author `ShardND` Development Team

use bytemuck::{Pod, Zeroable};

use core::cmp::Ordering;
use core::fmt::Debug;

// =============================================================================
// DType Enum
// =============================================================================

/// Runtime representation of array element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
}

impl DType {
    /// Returns the size in bytes of this element type.
    #[must_use]
    pub const fn size_of(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F64 | Self::I64 | Self::U64 => 8,
        }
    }

    /// Returns true if this is a floating point type.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Returns the name of this element type as a string.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
        }
    }
}

impl core::fmt::Display for DType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Element Trait
// =============================================================================

/// Trait for all element types that can be stored in a partitioned array.
///
/// The `total_order` method must be a total order consistent with `PartialOrd`
/// wherever the latter is defined. Integers use their natural order; floats use
/// the IEEE 754 `totalOrder` predicate, so NaN values sort deterministically
/// instead of poisoning comparisons.
pub trait Element:
    Copy + Clone + Debug + Default + PartialOrd + Send + Sync + Pod + Zeroable + 'static
{
    /// The runtime dtype for this element type.
    const DTYPE: DType;

    /// Returns the dtype for this type.
    #[must_use]
    fn dtype() -> DType {
        Self::DTYPE
    }

    /// Compares two values under this type's total order.
    fn total_order(&self, other: &Self) -> Ordering;
}

macro_rules! impl_element_int {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;

                fn total_order(&self, other: &Self) -> Ordering {
                    Ord::cmp(self, other)
                }
            }
        )*
    };
}

macro_rules! impl_element_float {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;

                fn total_order(&self, other: &Self) -> Ordering {
                    self.total_cmp(other)
                }
            }
        )*
    };
}

impl_element_int! {
    i8 => DType::I8,
    i16 => DType::I16,
    i32 => DType::I32,
    i64 => DType::I64,
    u8 => DType::U8,
    u16 => DType::U16,
    u32 => DType::U32,
    u64 => DType::U64,
}

impl_element_float! {
    f32 => DType::F32,
    f64 => DType::F64,
}

// =============================================================================
// Tests
// =============================================================================
