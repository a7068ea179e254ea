//! `Node`: a leaf or internal node of the tree, and the arena key that names it.
//!
//! The tree in `spec.md` is described recursively (a node owns its children), but a recursive
//! owned representation in Rust would fight the borrow checker the moment `insert`'s split needs
//! to walk back up to a parent it does not own. Instead every node lives in a [`slotmap::SlotMap`]
//! arena owned by [`crate::MTree`], addressed by the generational [`NodeKey`] below — the same
//! arena-of-keys shape the teacher uses for its own cluster tree (`tree/mod.rs`).

use num_traits::Zero;
use slotmap::SlotMap;

use crate::entry::{LeafEntry, RoutingEntry};
use crate::metric::CountingMetric;
use crate::{DistanceValue, Metric, NNList};

slotmap::new_key_type! {
    /// An arena handle to a [`NodeData`]. Never exposed outside the crate: the public API
    /// reports node counts and heights (§6), never node identities.
    pub(crate) struct NodeKey;
}

/// The entries a node holds, tagged by whether this node is a leaf or internal node.
///
/// A node is homogeneous by construction (§2): it never mixes leaf and routing entries, so this
/// enum — rather than a trait object or a shared struct with unused fields — is the direct
/// translation of that invariant into the type.
pub(crate) enum NodeEntries<T, D> {
    Leaf(Vec<LeafEntry<T, D>>),
    Internal(Vec<RoutingEntry<T, D>>),
}

/// A single node of the tree, resident in the arena.
pub(crate) struct NodeData<T, D> {
    /// `true` for the tree's current root. A root's entries use `0` as their
    /// `distance_to_parent` (§3) and are never pruned by the parent-distance test (§4.4), since
    /// there is no parent to measure from.
    pub(crate) is_root: bool,
    /// The parent routing entry that points at this node, identified by the parent node's key
    /// and this node's index within the parent's entries. `None` only for the root.
    pub(crate) parent: Option<(NodeKey, usize)>,
    pub(crate) entries: NodeEntries<T, D>,
}

impl<T, D: DistanceValue> NodeData<T, D> {
    pub(crate) fn new_leaf(is_root: bool, parent: Option<(NodeKey, usize)>) -> Self {
        Self {
            is_root,
            parent,
            entries: NodeEntries::Leaf(Vec::new()),
        }
    }

    pub(crate) fn new_internal(is_root: bool, parent: Option<(NodeKey, usize)>, entries: Vec<RoutingEntry<T, D>>) -> Self {
        Self {
            is_root,
            parent,
            entries: NodeEntries::Internal(entries),
        }
    }

    pub(crate) const fn is_leaf(&self) -> bool {
        matches!(self.entries, NodeEntries::Leaf(_))
    }

    pub(crate) fn len(&self) -> usize {
        match &self.entries {
            NodeEntries::Leaf(entries) => entries.len(),
            NodeEntries::Internal(entries) => entries.len(),
        }
    }
}

/// `|a - b|` without assuming `D` supports signed subtraction (unsigned integer distance types
/// are legal `DistanceValue`s and would otherwise overflow on the smaller-minus-larger branch).
pub(crate) fn abs_diff<D: DistanceValue>(a: D, b: D) -> D {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// `max(a - b, 0)`, the lower bound on distance-into-subtree a covering radius buys us (§4.4).
pub(crate) fn sub_clamped<D: DistanceValue>(a: D, b: D) -> D {
    if a >= b {
        a - b
    } else {
        D::zero()
    }
}

/// Picks the routing entry `object` should descend through on insert (§4.3).
///
/// Prefers an entry whose covering radius already contains `object`, breaking ties toward the
/// closest such entry; if none contains it, picks the entry needing the least covering-radius
/// enlargement. Mirrors the teacher's "minimal enlargement" insertion policy
/// (`tree/partition/strategy`), generalized from a bulk-build split choice to a per-insert
/// routing choice.
///
/// Returns the chosen index together with `distance(object, entries[index].representative)`,
/// since the caller (`MTree::insert`) needs that same distance both to grow the entry's covering
/// radius and as the `distance_to_parent` basis for whatever gets appended below it.
pub(crate) fn choose_subtree<T, D, M>(entries: &[RoutingEntry<T, D>], object: &T, metric: &CountingMetric<T, M>) -> (usize, D)
where
    D: DistanceValue,
    M: Metric<T, Distance = D>,
{
    // (index, distance, enlargement-or-zero) — `enlargement` only orders the non-covering
    // candidates against each other, never against a covering one.
    let mut best_covering: Option<(usize, D)> = None;
    let mut best_enlargement: Option<(usize, D, D)> = None;

    for (index, entry) in entries.iter().enumerate() {
        let distance = metric.distance(object, &entry.representative);
        if distance <= entry.covering_radius {
            if best_covering.map_or(true, |(_, best)| distance < best) {
                best_covering = Some((index, distance));
            }
        } else {
            let enlargement = distance - entry.covering_radius;
            if best_enlargement.map_or(true, |(_, _, best)| enlargement < best) {
                best_enlargement = Some((index, distance, enlargement));
            }
        }
    }

    best_covering.map_or_else(
        || best_enlargement.map_or((0, D::zero()), |(index, distance, _)| (index, distance)),
        |found| found,
    )
}

/// Scans one node during a `knn` descent: materializes hits from a leaf, or pushes live
/// subtrees of an internal node onto the candidate frontier for the best-first driver in
/// `tree.rs` to pick up.
///
/// `dist_to_pivot` is `distance(query, p)` where `p` is the representative of the routing entry
/// that led here — already paid for by the caller in order to compute this node's lower bound,
/// and reused here for the parent-distance pruning test (§4.4). It is meaningless for the root,
/// whose entries carry `distance_to_parent == 0` and are therefore exempt from that test.
pub(crate) fn visit<T, D, M>(
    node: &NodeData<T, D>,
    query: &T,
    metric: &CountingMetric<T, M>,
    dist_to_pivot: D,
    nn: &mut NNList<T, D>,
    frontier: &mut Vec<(NodeKey, D, D)>,
) where
    T: Clone + PartialEq,
    D: DistanceValue,
    M: Metric<T, Distance = D>,
{
    match &node.entries {
        NodeEntries::Leaf(entries) => {
            for entry in entries {
                if !node.is_root && abs_diff(dist_to_pivot, entry.distance_to_parent) > nn.max_distance() {
                    ftlog::trace!("parent-distance pruned a leaf entry without a distance call");
                    continue;
                }
                let distance = metric.distance(query, &entry.representative);
                nn.insert(entry.representative.clone(), distance);
            }
        }
        NodeEntries::Internal(entries) => {
            for entry in entries {
                if !node.is_root && abs_diff(dist_to_pivot, entry.distance_to_parent) > nn.max_distance() + entry.covering_radius {
                    ftlog::trace!("parent-distance pruned a routing entry without a distance call");
                    continue;
                }
                let distance = entry.distance_to_query(query, metric);
                let lower_bound = sub_clamped(distance, entry.covering_radius);
                if lower_bound <= nn.max_distance() {
                    frontier.push((entry.subtree, lower_bound, distance));
                }
                // The subtree is guaranteed to hold at least one object no farther than
                // `upper_bound` (§4.4): tighten the pruning threshold with it even though no
                // object has actually been examined yet.
                let upper_bound = distance + entry.covering_radius;
                if upper_bound < nn.max_distance() {
                    nn.insert_virtual(upper_bound);
                }
            }
        }
    }
}

/// Captures each entry's `(index, subtree)` as a plain, arena-independent pair, so its caller can
/// drop the borrow on `entries` before taking the `&mut SlotMap` that [`relink_children`] needs —
/// `entries` and the arena it points into are usually the same `NodeData`'s own storage.
pub(crate) fn subtree_links<T, D>(entries: &[RoutingEntry<T, D>]) -> Vec<(usize, NodeKey)> {
    entries.iter().enumerate().map(|(index, entry)| (index, entry.subtree)).collect()
}

/// Repairs the `(owner, index)` back-link of every child named in `links`, after the routing
/// entries pointing at them were moved into a (possibly new) resident node at `owner`. Used by
/// `MTree`'s split installation, whose partition can relocate routing entries — and the subtrees
/// they point at — into either half of a split.
pub(crate) fn relink_children<T, D>(arena: &mut SlotMap<NodeKey, NodeData<T, D>>, owner: NodeKey, links: &[(usize, NodeKey)]) {
    for &(index, child) in links {
        if let Some(child) = arena.get_mut(child) {
            child.parent = Some((owner, index));
        }
    }
}
