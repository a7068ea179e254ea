//! The generic split protocol: promote, partition, adopt (§4.3.1).
//!
//! Both a leaf overflow and an internal (routing) node overflow are the same shape of problem —
//! a node with too many entries needs to become two nodes with a balanced share of them, each
//! re-rooted at a freshly promoted pivot. [`TreeEntry`] lets this module implement that shape
//! once and drive it with either [`crate::entry::LeafEntry`] or [`crate::entry::RoutingEntry`].

use num_traits::Zero;
use rand::Rng;

use crate::entry::TreeEntry;
use crate::metric::CountingMetric;
use crate::promotion::PromotionPolicy;
use crate::{DistanceValue, Metric};

/// Picks two distinct entries to promote into the pivots of the two halves of a split.
pub(crate) fn promote<T, D, E>(entries: &[E], policy: PromotionPolicy, rng: &mut impl Rng) -> (usize, usize)
where
    E: TreeEntry<T, D>,
{
    policy.choose(entries.len(), rng)
}

/// Assigns every entry to whichever of the two promoted pivots it is closer to, subject to a
/// balanced-halving capacity on each side (§4.3.1): each half receives at most `ceil(n / 2)`
/// entries, so that one pivot's popularity cannot starve the other half down to a single entry.
///
/// `original_source`'s own balanced split instead caps each half at `floor(n / 2)` and hands any
/// odd leftover to whichever half is processed first; `ceil` is used here instead so that an odd
/// `n` can still split into two non-empty halves when both caps are `floor(n / 2)` and one is
/// zero only for `n <= 1` (never reached: splitting requires `n >= capacity >= 2`). See
/// `DESIGN.md`.
pub(crate) fn partition<T, D, E, M>(entries: Vec<E>, pivot_a: usize, pivot_b: usize, metric: &CountingMetric<T, M>) -> (Vec<E>, Vec<E>)
where
    E: TreeEntry<T, D>,
    T: Clone,
    D: DistanceValue,
    M: Metric<T, Distance = D>,
{
    let repr_a = entries[pivot_a].representative().clone();
    let repr_b = entries[pivot_b].representative().clone();

    let n = entries.len();
    let cap_a = n.div_ceil(2);
    let cap_b = n - cap_a;

    struct Scored<E, D> {
        entry: E,
        prefers_a: bool,
        margin: D,
    }

    let mut scored: Vec<Scored<E, D>> = entries
        .into_iter()
        .map(|entry| {
            let dist_a = metric.distance(entry.representative(), &repr_a);
            let dist_b = metric.distance(entry.representative(), &repr_b);
            let prefers_a = dist_a <= dist_b;
            let margin = if prefers_a { dist_b - dist_a } else { dist_a - dist_b };
            Scored { entry, prefers_a, margin }
        })
        .collect();

    // Entries with the clearest preference are assigned first, so a capacity limit (when it
    // binds) falls on the entries closest to indifferent between the two pivots.
    scored.sort_by(|x, y| y.margin.partial_cmp(&x.margin).unwrap_or(core::cmp::Ordering::Equal));

    let mut group_a = Vec::with_capacity(cap_a);
    let mut group_b = Vec::with_capacity(cap_b);

    for Scored { entry, prefers_a, .. } in scored {
        let goes_to_a = if group_a.len() >= cap_a {
            false
        } else if group_b.len() >= cap_b {
            true
        } else {
            prefers_a
        };

        if goes_to_a {
            group_a.push(entry);
        } else {
            group_b.push(entry);
        }
    }

    (group_a, group_b)
}

/// Re-roots a partitioned half at its new pivot: overwrites every entry's `distance_to_parent`
/// and returns the covering radius the pivot's new routing entry must advertise — the farthest
/// any entry's own reach (`distance_to_parent + subtree_radius`) extends (§4.3.1).
pub(crate) fn adopt<T, D, E, M>(pivot: &T, mut entries: Vec<E>, metric: &CountingMetric<T, M>) -> (Vec<E>, D)
where
    E: TreeEntry<T, D>,
    D: DistanceValue,
    M: Metric<T, Distance = D>,
{
    let mut radius = D::zero();
    for entry in &mut entries {
        let distance = metric.distance(pivot, entry.representative());
        entry.set_distance_to_parent(distance);
        let reach = distance + entry.subtree_radius();
        if reach > radius {
            radius = reach;
        }
    }
    (entries, radius)
}

#[cfg(test)]
mod tests {
    use super::{adopt, partition};
    use crate::entry::{LeafEntry, TreeEntry};
    use crate::metric::CountingMetric;

    fn leaf(x: i64) -> LeafEntry<i64, i64> {
        LeafEntry {
            representative: x,
            distance_to_parent: 0,
        }
    }

    fn metric() -> CountingMetric<i64, impl Fn(&i64, &i64) -> i64> {
        CountingMetric::new(|a: &i64, b: &i64| (a - b).abs())
    }

    #[test]
    fn partition_splits_into_balanced_halves_by_proximity() {
        let entries = vec![leaf(0), leaf(1), leaf(10), leaf(11)];
        let metric = metric();
        let (group_a, group_b) = partition(entries, 0, 2, &metric);
        assert_eq!(group_a.len(), 2);
        assert_eq!(group_b.len(), 2);
        let values_a: Vec<i64> = group_a.iter().map(TreeEntry::representative).copied().collect();
        assert!(values_a.contains(&0) && values_a.contains(&1));
    }

    #[test]
    fn adopt_computes_covering_radius_as_max_reach() {
        let entries = vec![leaf(1), leaf(4), leaf(-2)];
        let metric = metric();
        let (entries, radius) = adopt(&0_i64, entries, &metric);
        assert_eq!(radius, 4);
        assert_eq!(entries[0].distance_to_parent, 1);
        assert_eq!(entries[2].distance_to_parent, 2);
    }
}
