//! Synthetic data generators for testing, mirroring the teacher's own inline generators
//! (`pathological_line`, `line`, `grid`) plus a `tabular` generator for the stress scenario in
//! `spec.md` §8's scenario 6.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Evenly spaced integers `-max..=max`, the 1-D line used in the spec's seed scenarios.
pub fn line(max: i64) -> Vec<f64> {
    (-max..=max).map(|x| x as f64).collect()
}

/// The 9 lattice points `{0,1,2}^2`, `spec.md` §8 scenario 5.
pub fn small_grid() -> Vec<(f64, f64)> {
    (0..3).flat_map(|x| (0..3).map(move |y| (f64::from(x), f64::from(y)))).collect()
}

/// `count` uniformly random points in `dim` dimensions over `[min, max]`, seeded for
/// reproducibility across test runs.
pub fn tabular(count: usize, dim: usize, min: f64, max: f64, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| (0..dim).map(|_| rng.gen_range(min..=max)).collect()).collect()
}
