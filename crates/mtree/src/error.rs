//! The crate's error type.

use core::fmt;

/// Errors that can occur while building or configuring an [`MTree`](crate::MTree).
///
/// The algorithmic operations (`insert`, `knn`) are infallible by design
/// (§7): an invalid `k` simply yields an empty result rather than an error,
/// and a metric that violates its contract is undefined behavior that the
/// tree cannot detect locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MTreeError {
    /// The requested node capacity was less than 2.
    ///
    /// A capacity-1 node cannot be split into two non-empty halves, so the
    /// balanced-halving partition policy (§4.3.1) could never make
    /// progress.
    CapacityTooSmall {
        /// The capacity that was requested.
        requested: usize,
    },
}

impl fmt::Display for MTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityTooSmall { requested } => {
                write!(f, "node capacity must be at least 2, got {requested}")
            }
        }
    }
}

impl std::error::Error for MTreeError {}
