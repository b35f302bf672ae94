//! Seeded particle clouds.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// `n` points uniform in the box `[lo, hi)`, flattened row-major (3 per
/// point). Every `lo[d]` must be below `hi[d]`.
pub fn random_positions(seed: u64, n: usize, lo: [f64; 3], hi: [f64; 3]) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n * 3);
    for _ in 0..n {
        for d in 0..3 {
            out.push(rng.random_range(lo[d]..hi[d]));
        }
    }
    out
}
