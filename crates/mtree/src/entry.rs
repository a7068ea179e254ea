//! `TreeObject` entries: the leaf and routing entries that live inside a [`Node`](crate::node::Node).

use core::cell::RefCell;

use num_traits::Zero;

use crate::node::NodeKey;
use crate::{DistanceValue, Metric};

/// An entry that carries user data, living inside a leaf node.
#[derive(Debug, Clone)]
pub(crate) struct LeafEntry<T, D> {
    /// The object this entry stores.
    pub(crate) representative: T,
    /// Distance from `representative` to the representative of the parent
    /// routing entry, or `0` when this entry's node is the root (§3).
    pub(crate) distance_to_parent: D,
}

/// An entry that carries subtree-pointing metadata, living inside an internal node.
#[derive(Debug)]
pub(crate) struct RoutingEntry<T, D> {
    /// The pivot object of this entry's subtree.
    pub(crate) representative: T,
    /// Upper bound on the distance from `representative` to any object in `subtree`.
    pub(crate) covering_radius: D,
    /// Distance from `representative` to the representative of the parent routing entry.
    pub(crate) distance_to_parent: D,
    /// The node rooted at `representative`.
    pub(crate) subtree: NodeKey,
    /// Per-query distance cache (§4.2): memoizes `distance(query, representative)` across the
    /// multiple pruning tests performed on different descent paths during a single `knn` call.
    query_cache: RefCell<Option<(T, D)>>,
}

impl<T: Clone + PartialEq, D: DistanceValue> RoutingEntry<T, D> {
    pub(crate) fn new(representative: T, covering_radius: D, distance_to_parent: D, subtree: NodeKey) -> Self {
        Self {
            representative,
            covering_radius,
            distance_to_parent,
            subtree,
            query_cache: RefCell::new(None),
        }
    }

    /// Returns the cached distance to `query` if the cache holds a value for
    /// an equal query, otherwise computes it, caches it, and returns it.
    ///
    /// This cache is never invalidated by `insert`: `search` never mutates
    /// the tree's structure, so a cache populated during one `knn` call is
    /// simply stale data to overwrite (not corrupt data to protect against)
    /// on the next call with a different query.
    pub(crate) fn distance_to_query<M: Metric<T, Distance = D>>(&self, query: &T, metric: &M) -> D {
        if let Some((cached_query, cached_distance)) = self.query_cache.borrow().as_ref() {
            if cached_query == query {
                return *cached_distance;
            }
        }
        let distance = metric.distance(query, &self.representative);
        *self.query_cache.borrow_mut() = Some((query.clone(), distance));
        distance
    }
}

/// A uniform view over [`LeafEntry`] and [`RoutingEntry`] for the parts of the split protocol
/// (promote, partition, adopt) that do not care which kind of entry they are moving.
pub(crate) trait TreeEntry<T, D> {
    /// The object this entry stores or routes through.
    fn representative(&self) -> &T;

    /// Overwrites this entry's distance to its (new) parent routing entry.
    fn set_distance_to_parent(&mut self, distance: D);

    /// The covering radius to fold into a new parent's covering radius during adopt (§4.3.1),
    /// `0` for leaf entries and `covering_radius` for routing entries.
    fn subtree_radius(&self) -> D;

    /// The child node this entry points at, if any, so that split's post-pass (§4.3.1, §9) can
    /// repair that child's back-link after this entry moves to a new resident node.
    fn child_key(&self) -> Option<NodeKey>;
}

impl<T, D: DistanceValue> TreeEntry<T, D> for LeafEntry<T, D> {
    fn representative(&self) -> &T {
        &self.representative
    }

    fn set_distance_to_parent(&mut self, distance: D) {
        self.distance_to_parent = distance;
    }

    fn subtree_radius(&self) -> D {
        D::zero()
    }

    fn child_key(&self) -> Option<NodeKey> {
        None
    }
}

impl<T, D: DistanceValue> TreeEntry<T, D> for RoutingEntry<T, D> {
    fn representative(&self) -> &T {
        &self.representative
    }

    fn set_distance_to_parent(&mut self, distance: D) {
        self.distance_to_parent = distance;
    }

    fn subtree_radius(&self) -> D {
        self.covering_radius
    }

    fn child_key(&self) -> Option<NodeKey> {
        Some(self.subtree)
    }
}
