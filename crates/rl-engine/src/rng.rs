//! Per-call random sources. The engine never touches a process-global RNG;
//! callers pass a generator (or a seed) into every entry point.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Builds the engine's generator: reproducible when seeded, OS entropy otherwise.
pub fn engine_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}
