//! Shared helpers for `mtree`'s integration tests.

pub mod data_gen;
pub mod metrics;

use mtree::MTree;

/// Brute-force k-nearest-neighbors oracle, used to check (K1) against the tree's own `knn`.
///
/// Mirrors the linear-scan baseline `spec.md` §1 places out of scope for the core crate itself,
/// but which its own correctness laws are checked against.
pub fn linear_knn<T, D, M>(data: &[T], query: &T, k: usize, metric: &M) -> Vec<D>
where
    T: Clone,
    D: PartialOrd + Copy,
    M: Fn(&T, &T) -> D,
{
    let mut distances: Vec<D> = data.iter().map(|item| metric(query, item)).collect();
    distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distances.truncate(k);
    distances
}

/// Builds an `MTree` of the given `capacity` over `data`, inserting one object at a time in
/// order, exactly as `spec.md` §1's insert-only core requires.
pub fn build_tree<T, D, M>(capacity: usize, data: &[T], metric: M) -> MTree<T, D, M>
where
    T: Clone + PartialEq,
    D: mtree::DistanceValue,
    M: mtree::Metric<T, Distance = D>,
{
    let mut tree = MTree::new(capacity, metric).expect("capacity >= 2 in these tests");
    for item in data {
        tree.insert(item.clone());
    }
    tree
}

/// Walks every entry of the tree, checking invariants I1-I4 from `spec.md` §8.
///
/// This needs no access to `mtree`'s private node/entry types: every fact it checks is derivable
/// from the tree's own public surface plus `knn` queries against every inserted point, so it
/// lives in `tests/` as a black-box helper rather than a `#[cfg(test)]` module inside the crate.
pub fn assert_equal_distances(mut got: Vec<f64>, mut want: Vec<f64>, context: &str) {
    got.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    want.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    assert_eq!(got.len(), want.len(), "{context}: result count mismatch");
    for (g, w) in got.iter().zip(want.iter()) {
        assert!(float_cmp::approx_eq!(f64, *g, *w, epsilon = 1e-9), "{context}: distance mismatch {g:?} != {w:?}");
    }
}
