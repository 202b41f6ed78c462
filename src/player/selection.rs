//! Random asset selection without immediate repeats

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks the next asset index
///
/// Draws uniformly and redraws while the draw equals the previous index.
/// The expected number of redraws is below one for any list of two or more
/// entries, but the loop is unbounded in theory. A single-entry list never
/// draws at all, so it cannot spin.
#[derive(Debug, Clone)]
pub struct Selector {
    rng: StdRng,
}

impl Selector {
    /// Selector seeded from the platform's entropy source
    pub fn from_entropy() -> Self {
        Self { rng: entropy_rng() }
    }

    /// Deterministic selector
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an index in `0..len` different from `previous` when `len > 1`
    ///
    /// Returns `None` for an empty list.
    pub fn next_index(&mut self, previous: Option<usize>, len: usize) -> Option<usize> {
        match len {
            0 => None,
            1 => Some(0),
            _ => loop {
                let candidate = self.rng.random_range(0..len);
                if Some(candidate) != previous {
                    break Some(candidate);
                }
            },
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy_rng() -> StdRng {
    StdRng::from_os_rng()
}

#[cfg(target_arch = "wasm32")]
fn entropy_rng() -> StdRng {
    StdRng::seed_from_u64((js_sys::Math::random() * u64::MAX as f64) as u64)
}
