//! Deterministic world RNG
//!
//! A 31-bit linear congruential generator owned by the game state. It plugs
//! into the `rand` traits so call sites can use `random_range` and friends.

use rand::rand_core::impls;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// `state = (state * 1103515245 + 12345) & 0x7fffffff`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lcg32 {
    state: u32,
}

impl Lcg32 {
    pub const MULTIPLIER: u32 = 1_103_515_245;
    pub const INCREMENT: u32 = 12_345;
    pub const MASK: u32 = 0x7fff_ffff;

    pub fn new(seed: u32) -> Self {
        Self {
            state: seed & Self::MASK,
        }
    }

    /// Advance once and return the raw 31-bit state
    #[inline]
    pub fn next_raw(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
            & Self::MASK;
        self.state
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

impl Default for Lcg32 {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RngCore for Lcg32 {
    fn next_u32(&mut self) -> u32 {
        // Low bits of an LCG are weak; keep the top 16 of each draw.
        let hi = self.next_raw() >> 15;
        let lo = self.next_raw() >> 15;
        (hi << 16) | lo
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        impls::fill_bytes_via_next(self, dst)
    }
}

impl SeedableRng for Lcg32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Uniform float in `[min, max)`; collapses to `min` for an empty range
#[inline]
pub fn range_f32(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    min + rng.random::<f32>() * (max - min)
}

/// Bernoulli trial
#[inline]
pub fn chance(rng: &mut impl Rng, probability: f32) -> bool {
    rng.random::<f32>() < probability
}
