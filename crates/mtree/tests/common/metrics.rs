//! Reusable distance functions for tests, mirroring the teacher's own `common::metrics` module.

/// 1-D absolute difference, the default metric for `spec.md`'s worked seed scenarios.
pub fn abs_diff(a: &f64, b: &f64) -> f64 {
    (a - b).abs()
}

/// Euclidean distance over fixed-size 2-tuples, `spec.md` §8 scenario 5's metric.
pub fn euclidean_2d(a: &(f64, f64), b: &(f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Euclidean distance over equal-length vectors, for the 8-D stress scenario (`spec.md` §8
/// scenario 6).
pub fn euclidean(a: &Vec<f64>, b: &Vec<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}
