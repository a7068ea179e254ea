//! A trait for the numeric type a [`Metric`](crate::Metric) returns.

use core::fmt::Debug;

use num_traits::Bounded;

/// A trait for types that can be used as distance values in the tree.
///
/// We provide a blanket implementation for every type that satisfies the
/// trait bounds, which includes all primitive numeric types.
#[must_use]
pub trait DistanceValue: PartialOrd + Copy + Debug + Default + num_traits::Num + num_traits::Bounded {
    /// A practical stand-in for `+∞`.
    ///
    /// For floating-point types this is the type's maximum finite value
    /// (not actual infinity, so that arithmetic on it stays well-defined);
    /// for integer types it is simply [`num_traits::Bounded::max_value`].
    #[must_use]
    fn infinity() -> Self {
        Self::max_value()
    }
}

impl<T> DistanceValue for T where T: PartialOrd + Copy + Debug + Default + num_traits::Num + num_traits::Bounded {}
