//! An in-memory M-tree index for exact k-nearest-neighbor search under an arbitrary
//! user-supplied distance function.
//!
//! The tree is a dynamic, insert-only metric-space index: every internal node's entries carry a
//! covering radius, and search descends only into subtrees a query could still possibly fall
//! within, so `knn` returns exact results without ever comparing the query against every stored
//! object.
//!
//! ```
//! use mtree::MTree;
//!
//! let metric = |a: &(f64, f64), b: &(f64, f64)| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
//! let mut tree = MTree::new(4, metric).expect("capacity 4 is valid");
//!
//! for point in [(0.0, 0.0), (1.0, 0.0), (5.0, 5.0), (5.0, 6.0)] {
//!     tree.insert(point);
//! }
//!
//! let nearest = tree.knn(&(0.0, 0.0), 2);
//! assert_eq!(nearest.len(), 2);
//! ```
//!
//! ## Non-goals
//!
//! This crate indexes an in-memory, insert-only collection: it does not persist a tree to disk,
//! does not support concurrent mutation, does not support deleting an inserted object, does not
//! support range queries or approximate search, and does not offer a bulk-load constructor that
//! builds a tree from a whole dataset at once (build one by repeated [`MTree::insert`] instead).

mod distance_value;
mod entry;
mod error;
mod metric;
mod nnlist;
mod node;
mod promotion;
mod split;
mod tree;

pub use distance_value::DistanceValue;
pub use error::MTreeError;
pub use metric::Metric;
pub use nnlist::NNList;
pub use promotion::PromotionPolicy;
pub use tree::MTree;
