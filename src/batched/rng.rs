//! Counter-based stateless PRNG for per-world initial-condition
//! randomization (§4.9).
//!
//! Given the same `(base_seed, world_index, counter)` triple this always
//! produces the same stream, regardless of call order or how many other
//! worlds were touched first — required for the batched reset-determinism
//! property (§8 Scenario E).

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

/// Mix three integers into one 64-bit seed (splitmix64), then use it to
/// seed a [`Pcg32`]. This is the "derive a seed, don't carry state between
/// worlds" half of the counter-based design; `Pcg32` itself supplies the
/// actual stream once seeded.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn derive_seed(base_seed: u64, world_index: u64, counter: u64) -> u64 {
    let a = splitmix64(base_seed ^ world_index);
    splitmix64(a ^ counter.wrapping_mul(0x2545F4914F6CDD1D))
}

/// A PRNG handle for exactly one `(base_seed, world_index, counter)`
/// triple, used once to initialize a world and then discarded.
pub struct BatchRng(Pcg32);

impl BatchRng {
    pub fn new(base_seed: u64, world_index: u64, counter: u64) -> Self {
        let seed = derive_seed(base_seed, world_index, counter);
        Self(Pcg32::seed_from_u64(seed))
    }

    /// A uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.0.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// A uniform value in `[low, high)`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + self.next_f64() * (high - low)
    }
}
