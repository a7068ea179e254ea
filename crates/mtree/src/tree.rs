//! [`MTree`]: the public facade over the arena, the metric, and the split/search machinery.

use core::cell::Cell;
use core::cmp::Ordering;

use num_traits::Zero;
use rand::rngs::StdRng;
use rand::SeedableRng;
use slotmap::SlotMap;

use crate::entry::{LeafEntry, RoutingEntry, TreeEntry};
use crate::error::MTreeError;
use crate::metric::CountingMetric;
use crate::node::{self, NodeData, NodeEntries, NodeKey};
use crate::promotion::PromotionPolicy;
use crate::split;
use crate::{DistanceValue, Metric, NNList};

/// An in-memory M-tree index over objects of type `T` under a user-supplied [`Metric`].
///
/// Mutation is insert-only (§1's Non-goals: no deletion, no concurrent mutation, no
/// persistence); `knn` never modifies the tree, so any number of searches may run against a
/// snapshot of a tree no one else is inserting into at the same time.
pub struct MTree<T, D, M: Metric<T, Distance = D>> {
    capacity: usize,
    metric: CountingMetric<T, M>,
    promotion_policy: PromotionPolicy,
    rng: StdRng,
    arena: SlotMap<NodeKey, NodeData<T, D>>,
    root: NodeKey,
    size: usize,
    last_search_nodes_accessed: Cell<u64>,
}

impl<T, D, M> MTree<T, D, M>
where
    T: Clone + PartialEq,
    D: DistanceValue,
    M: Metric<T, Distance = D>,
{
    /// Builds an empty tree with the given node `capacity` and `metric`, using the default
    /// random promotion policy (§4.3.1).
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::CapacityTooSmall`] if `capacity < 2` (§7).
    pub fn new(capacity: usize, metric: M) -> Result<Self, MTreeError> {
        Self::with_promotion_policy(capacity, metric, PromotionPolicy::default())
    }

    /// As [`MTree::new`], but with an explicit [`PromotionPolicy`] instead of the default.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::CapacityTooSmall`] if `capacity < 2` (§7).
    pub fn with_promotion_policy(capacity: usize, metric: M, promotion_policy: PromotionPolicy) -> Result<Self, MTreeError> {
        if capacity < 2 {
            return Err(MTreeError::CapacityTooSmall { requested: capacity });
        }

        let mut arena = SlotMap::with_key();
        let root = arena.insert(NodeData::new_leaf(true, None));

        Ok(Self {
            capacity,
            metric: CountingMetric::new(metric),
            promotion_policy,
            rng: StdRng::from_entropy(),
            arena,
            root,
            size: 0,
            last_search_nodes_accessed: Cell::new(0),
        })
    }

    /// Replaces the tree's random source, for reproducible [`PromotionPolicy::Random`] splits in
    /// tests. Has no effect under [`PromotionPolicy::Fixed`].
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// The number of objects inserted so far (§6).
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// The number of nodes currently in the tree (§6).
    #[must_use]
    pub fn total_nodes(&self) -> usize {
        self.arena.len()
    }

    /// The tree's height: `1` for a single (root) leaf, growing by one per split that
    /// propagates all the way to a new root (§6).
    #[must_use]
    pub fn height(&self) -> usize {
        self.depth(self.root)
    }

    fn depth(&self, key: NodeKey) -> usize {
        match &self.arena[key].entries {
            NodeEntries::Leaf(_) => 1,
            NodeEntries::Internal(entries) => 1 + entries.iter().map(|entry| self.depth(entry.subtree)).max().unwrap_or(0),
        }
    }

    /// The number of nodes visited by the most recent [`MTree::knn`] call (§6), or `0` if none
    /// has run yet.
    #[must_use]
    pub fn nodes_accessed(&self) -> u64 {
        self.last_search_nodes_accessed.get()
    }

    /// The number of times the metric has been invoked since the tree was built or since the
    /// last [`MTree::reset_calls`] (§3, §6).
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.metric.calls()
    }

    /// Resets the metric invocation counter to zero (§6).
    pub fn reset_calls(&self) {
        self.metric.reset_calls();
    }

    /// Inserts `object` into the tree (§4.3).
    ///
    /// Descends to a leaf via the minimal-enlargement routing policy, growing every covering
    /// radius passed through along the way, then appends; a leaf that overflows its capacity
    /// splits, possibly propagating a split up to a new root.
    pub fn insert(&mut self, object: T) {
        self.size += 1;

        let mut current = self.root;
        let mut dist_to_pivot = D::zero();

        loop {
            let is_root = self.arena[current].is_root;

            match &mut self.arena[current].entries {
                NodeEntries::Leaf(leaf_entries) => {
                    let distance_to_parent = if is_root { D::zero() } else { dist_to_pivot };
                    leaf_entries.push(LeafEntry {
                        representative: object,
                        distance_to_parent,
                    });
                    if leaf_entries.len() > self.capacity {
                        self.split(current);
                    }
                    return;
                }
                NodeEntries::Internal(routing_entries) => {
                    let (index, distance) = node::choose_subtree(routing_entries, &object, &self.metric);
                    let entry = &mut routing_entries[index];
                    if distance > entry.covering_radius {
                        entry.covering_radius = distance;
                    }
                    current = entry.subtree;
                    dist_to_pivot = distance;
                }
            }
        }
    }

    /// Finds the `k` nearest neighbors of `query` by a best-first, pruned descent (§4.4, §5).
    ///
    /// Returns up to `k` `(object, distance)` pairs in ascending distance order; fewer than `k`
    /// if the tree holds fewer than `k` objects; an empty vector if `k == 0` (§7).
    pub fn knn(&self, query: &T, k: usize) -> Vec<(T, D)> {
        let mut nn = NNList::new(k);
        if k == 0 {
            return nn.into_results();
        }

        let mut frontier: Vec<(NodeKey, D, D)> = vec![(self.root, D::zero(), D::zero())];
        let mut nodes_accessed = 0_u64;

        while let Some(best_index) = Self::best_candidate(&frontier) {
            let (node_key, lower_bound, dist_to_pivot) = frontier.swap_remove(best_index);
            nodes_accessed += 1;

            // The candidate was pruneable by the time its turn came up: the threshold only ever
            // tightens while candidates wait in the frontier. It still counts as dequeued (§4.5).
            if lower_bound > nn.max_distance() {
                continue;
            }

            node::visit(&self.arena[node_key], query, &self.metric, dist_to_pivot, &mut nn, &mut frontier);
        }

        self.last_search_nodes_accessed.set(nodes_accessed);
        nn.into_results()
    }

    fn best_candidate(frontier: &[(NodeKey, D, D)]) -> Option<usize> {
        frontier
            .iter()
            .enumerate()
            .min_by(|(_, (_, a, _)), (_, (_, b, _))| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .map(|(index, _)| index)
    }

    /// Splits an overflowing node (§4.3.1), installing the two resulting halves into its parent
    /// (or, for the root, into a freshly created new root) and recursing upward if that insertion
    /// itself overflows the parent.
    fn split(&mut self, key: NodeKey) {
        ftlog::debug!("splitting an overflowing node holding {} entries", self.arena[key].len());
        let parent = self.arena[key].parent;
        let entries = core::mem::replace(&mut self.arena[key].entries, NodeEntries::Leaf(Vec::new()));

        match entries {
            NodeEntries::Leaf(leaf_entries) => {
                let (pivot_a, radius_a, group_a, pivot_b, radius_b, group_b) = self.split_entries(leaf_entries);
                self.install_split(key, parent, pivot_a, radius_a, NodeEntries::Leaf(group_a), pivot_b, radius_b, NodeEntries::Leaf(group_b));
            }
            NodeEntries::Internal(routing_entries) => {
                let (pivot_a, radius_a, group_a, pivot_b, radius_b, group_b) = self.split_entries(routing_entries);
                self.install_split(
                    key,
                    parent,
                    pivot_a,
                    radius_a,
                    NodeEntries::Internal(group_a),
                    pivot_b,
                    radius_b,
                    NodeEntries::Internal(group_b),
                );
            }
        }
    }

    fn split_entries<E: TreeEntry<T, D>>(&mut self, entries: Vec<E>) -> (T, D, Vec<E>, T, D, Vec<E>) {
        let (pivot_a_index, pivot_b_index) = split::promote(&entries, self.promotion_policy, &mut self.rng);
        let pivot_a = entries[pivot_a_index].representative().clone();
        let pivot_b = entries[pivot_b_index].representative().clone();

        let (group_a, group_b) = split::partition(entries, pivot_a_index, pivot_b_index, &self.metric);
        let (group_a, radius_a) = split::adopt(&pivot_a, group_a, &self.metric);
        let (group_b, radius_b) = split::adopt(&pivot_b, group_b, &self.metric);

        (pivot_a, radius_a, group_a, pivot_b, radius_b, group_b)
    }

    /// Installs the two halves of a split, reusing `key` (the node that overflowed) as the home
    /// of the first half and allocating a fresh node for the second.
    #[allow(clippy::too_many_arguments)]
    fn install_split(
        &mut self,
        key: NodeKey,
        parent: Option<(NodeKey, usize)>,
        pivot_a: T,
        radius_a: D,
        entries_a: NodeEntries<T, D>,
        pivot_b: T,
        radius_b: D,
        entries_b: NodeEntries<T, D>,
    ) {
        let Some((parent_key, parent_index)) = parent else {
            ftlog::debug!("old root split: creating a new root to hold the two promoted pivots");
            self.install_root_split(key, pivot_a, radius_a, entries_a, pivot_b, radius_b, entries_b);
            return;
        };

        let key_b = self.arena.insert(NodeData {
            is_root: false,
            parent: Some((parent_key, parent_index + 1)),
            entries: entries_b,
        });
        self.relink_if_internal(key_b);

        self.arena[key].entries = entries_a;
        self.relink_if_internal(key);

        let grandparent_pivot = self.parent_pivot(parent_key);
        let dist_a = grandparent_pivot.as_ref().map_or(D::zero(), |pivot| self.metric.distance(&pivot_a, pivot));
        let dist_b = grandparent_pivot.as_ref().map_or(D::zero(), |pivot| self.metric.distance(&pivot_b, pivot));

        let entry_a = RoutingEntry::new(pivot_a, radius_a, dist_a, key);
        let entry_b = RoutingEntry::new(pivot_b, radius_b, dist_b, key_b);

        let NodeEntries::Internal(parent_entries) = &mut self.arena[parent_key].entries else {
            unreachable!("a node's parent entry lives in an internal node");
        };
        parent_entries[parent_index] = entry_a;
        parent_entries.insert(parent_index + 1, entry_b);

        // `insert` above can have shifted every entry after `parent_index`; repair all of the
        // parent's children back-links rather than reasoning about exactly which ones moved.
        let links = node::subtree_links(parent_entries);
        node::relink_children(&mut self.arena, parent_key, &links);

        if self.arena[parent_key].len() > self.capacity {
            ftlog::debug!("split propagated into an already-full parent, recursing upward");
            self.split(parent_key);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn install_root_split(
        &mut self,
        key: NodeKey,
        pivot_a: T,
        radius_a: D,
        entries_a: NodeEntries<T, D>,
        pivot_b: T,
        radius_b: D,
        entries_b: NodeEntries<T, D>,
    ) {
        let new_root = self.arena.insert(NodeData {
            is_root: true,
            parent: None,
            entries: NodeEntries::Internal(Vec::new()),
        });

        let key_b = self.arena.insert(NodeData {
            is_root: false,
            parent: Some((new_root, 1)),
            entries: entries_b,
        });
        self.relink_if_internal(key_b);

        self.arena[key].is_root = false;
        self.arena[key].parent = Some((new_root, 0));
        self.arena[key].entries = entries_a;
        self.relink_if_internal(key);

        let entry_a = RoutingEntry::new(pivot_a, radius_a, D::zero(), key);
        let entry_b = RoutingEntry::new(pivot_b, radius_b, D::zero(), key_b);
        self.arena[new_root].entries = NodeEntries::Internal(vec![entry_a, entry_b]);

        self.root = new_root;
    }

    /// If `key` now holds routing entries, repairs those children's back-links to point at
    /// `key` (used right after a fresh set of entries is installed into it).
    fn relink_if_internal(&mut self, key: NodeKey) {
        let links = match &self.arena[key].entries {
            NodeEntries::Internal(entries) => node::subtree_links(entries),
            NodeEntries::Leaf(_) => return,
        };
        node::relink_children(&mut self.arena, key, &links);
    }

    /// The representative object of the routing entry (in `key`'s parent) that points at `key`,
    /// or `None` if `key` is the root.
    fn parent_pivot(&self, key: NodeKey) -> Option<T> {
        let (parent_key, index) = self.arena[key].parent?;
        let NodeEntries::Internal(entries) = &self.arena[parent_key].entries else {
            unreachable!("a node's parent entry lives in an internal node");
        };
        Some(entries[index].representative.clone())
    }
}

/// White-box structural invariant checking (§8 I1-I4): walks the private arena directly, which a
/// black-box test in `tests/` cannot do through `spec.md` §6's deliberately narrow public surface
/// (`insert`/`knn`/the four counters, nothing that exposes a node). Specialized to `D = f64`
/// since every caller in this crate's test suite uses floating-point distances and an exact
/// floating-point equality check in (I2) would be too strict.
#[cfg(test)]
impl<T, M> MTree<T, f64, M>
where
    T: Clone + PartialEq,
    M: Metric<T, Distance = f64>,
{
    /// Checks I1 (covering radii bound every descendant), I2 (`distance_to_parent` is exact),
    /// I3 (all leaves at equal depth), and I4 (non-root node sizes are in `1..=capacity`).
    pub(crate) fn validate(&self) -> Result<(), String> {
        let mut leaf_depths = Vec::new();
        self.validate_node(self.root, None, 0, &mut leaf_depths)?;
        if let Some(&first) = leaf_depths.first() {
            if leaf_depths.iter().any(|&depth| depth != first) {
                return Err(format!("I3 violated: leaves at unequal depths {leaf_depths:?}"));
            }
        }
        Ok(())
    }

    fn validate_node(&self, key: NodeKey, parent_repr: Option<&T>, depth: usize, leaf_depths: &mut Vec<usize>) -> Result<(), String> {
        let node = &self.arena[key];
        if !node.is_root && !(1..=self.capacity).contains(&node.len()) {
            return Err(format!("I4 violated: non-root node has {} entries (capacity {})", node.len(), self.capacity));
        }

        match &node.entries {
            NodeEntries::Leaf(entries) => {
                leaf_depths.push(depth);
                for entry in entries {
                    if let Some(parent) = parent_repr {
                        let expected = self.metric.distance(&entry.representative, parent);
                        if node::abs_diff(expected, entry.distance_to_parent) > 1e-6 {
                            return Err(format!("I2 violated: leaf distance_to_parent {} != {expected}", entry.distance_to_parent));
                        }
                    }
                }
            }
            NodeEntries::Internal(entries) => {
                for entry in entries {
                    if let Some(parent) = parent_repr {
                        let expected = self.metric.distance(&entry.representative, parent);
                        if node::abs_diff(expected, entry.distance_to_parent) > 1e-6 {
                            return Err(format!("I2 violated: routing distance_to_parent {} != {expected}", entry.distance_to_parent));
                        }
                    }
                    self.validate_covering(entry.subtree, &entry.representative, entry.covering_radius)?;
                    self.validate_node(entry.subtree, Some(&entry.representative), depth + 1, leaf_depths)?;
                }
            }
        }
        Ok(())
    }

    /// I1: every leaf reachable under `subtree` lies within `radius` of `pivot`.
    fn validate_covering(&self, subtree: NodeKey, pivot: &T, radius: f64) -> Result<(), String> {
        match &self.arena[subtree].entries {
            NodeEntries::Leaf(entries) => {
                for entry in entries {
                    let distance = self.metric.distance(pivot, &entry.representative);
                    if distance > radius + 1e-6 {
                        return Err(format!("I1 violated: leaf at distance {distance} exceeds covering radius {radius}"));
                    }
                }
            }
            NodeEntries::Internal(entries) => {
                for entry in entries {
                    self.validate_covering(entry.subtree, pivot, radius)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::MTree;

    fn abs_diff(a: &f64, b: &f64) -> f64 {
        (a - b).abs()
    }

    #[test]
    fn empty_tree_has_zero_size_and_height_one() {
        let tree = MTree::new(4, abs_diff).expect("capacity 4 is valid");
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.total_nodes(), 1);
        assert!(tree.knn(&42.0, 3).is_empty());
        tree.validate().expect("an empty tree trivially satisfies every invariant");
    }

    #[test]
    fn rejects_capacity_below_two() {
        assert!(MTree::new(1, abs_diff).is_err());
        assert!(MTree::new(0, abs_diff).is_err());
    }

    #[test]
    fn forced_split_keeps_every_invariant() {
        let mut tree = MTree::new(3, abs_diff).expect("capacity 3 is valid");
        for value in [1.0, 2.0, 3.0, 4.0] {
            tree.insert(value);
            tree.validate().unwrap_or_else(|error| panic!("invariant violated after inserting {value}: {error}"));
        }
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.size(), 4);
    }

    #[test]
    fn random_insertion_sequences_preserve_invariants() {
        let mut rng = StdRng::seed_from_u64(11);
        for capacity in [2, 3, 4, 5] {
            let mut tree = MTree::new(capacity, abs_diff).expect("capacity >= 2 is valid");
            for _ in 0..200 {
                let value = rng.gen_range(-100.0..100.0);
                tree.insert(value);
                tree.validate().unwrap_or_else(|error| panic!("invariant violated at capacity {capacity}: {error}"));
            }
        }
    }

    #[test]
    fn split_propagates_and_repairs_back_links_several_levels_up() {
        let mut tree = MTree::new(2, abs_diff).expect("capacity 2 is valid");
        for value in 0..40 {
            tree.insert(f64::from(value));
        }
        tree.validate().expect("deep split propagation must not corrupt back-links");
        assert!(tree.height() >= 3, "height should have grown past a single split: {}", tree.height());
    }
}
