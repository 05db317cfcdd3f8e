use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::prelude::*;

/// Waits for `n_cycles` rising edges of `signal`.
pub async fn clock_cycles(signal: SimObject, n_cycles: u32) -> TbResult {
    for _ in 0..n_cycles {
        signal.rising_edge().await?;
    }
    Ok(())
}

/// Deterministic random source for stimulus, so a failing seed can be replayed.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
