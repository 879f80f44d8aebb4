// ============================================================
// Layer 6 — Random Seed
// ============================================================
// Two sources of randomness exist in a run:
//   - the Burn backend RNG (parameter initialisation)
//   - host-side choices (negative sampling, synthetic data)
//
// Both are derived from the single SOLVER.SEED value here,
// once, at start-up.

use burn::tensor::backend::Backend;
use rand::{rngs::StdRng, SeedableRng};

/// Seed the backend and return the host RNG for everything else.
pub fn set_seed<B: Backend>(seed: u64) -> StdRng {
    B::seed(seed);
    tracing::debug!("Seeded backend and host RNG with {}", seed);
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use rand::Rng;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = set_seed::<NdArray>(2020);
        let mut b = set_seed::<NdArray>(2020);
        let xs: Vec<u32> = (0..5).map(|_| a.gen()).collect();
        let ys: Vec<u32> = (0..5).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }
}
