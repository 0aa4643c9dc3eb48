// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

use std::fmt::Debug;

use num_traits::{
    Float as NumFloat, PrimInt, ToPrimitive, WrappingAdd, WrappingMul, WrappingNeg, WrappingSub,
};

/// Trait for types valid as float elements in flat arrays.
///
/// Useful when specifying `my_fn::<T: Float>() {}`.
///
/// Extends and constrains the *num-traits* `Float` implementation to fit the crate's type universe.
pub trait Float: NumFloat + Copy + Default + Debug + ToPrimitive + PartialEq + 'static {}
impl Float for f32 {}
impl Float for f64 {}

/// Trait for types valid as integer elements in flat arrays.
///
/// Element arithmetic wraps on overflow, so the wrapping operators are part of the bound.
pub trait Integer:
    PrimInt + WrappingAdd + WrappingSub + WrappingMul + WrappingNeg + Default + Debug + 'static
{
    /// Absolute value, wrapping at the minimum of signed types.
    fn wrapping_abs_val(self) -> Self;
}

macro_rules! impl_integer {
    (signed: $($s:ty),+; unsigned: $($u:ty),+) => {
        $(
            impl Integer for $s {
                #[inline]
                fn wrapping_abs_val(self) -> Self {
                    self.wrapping_abs()
                }
            }
        )+
        $(
            impl Integer for $u {
                #[inline]
                fn wrapping_abs_val(self) -> Self {
                    self
                }
            }
        )+
    };
}

impl_integer!(signed: i32, i64; unsigned: u32, u64);
