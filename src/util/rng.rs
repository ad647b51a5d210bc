// Copyright (c) 2024 Mike Tsao

//! Provides a reproducible random-number generator for effects like noise.

use delegate::delegate;

/// A pseudorandom number generator (PRNG) for applications that don't require
/// cryptographically secure random numbers. Curves must precalculate to the
/// same table every time, so it is always explicitly seeded.
#[derive(Debug)]
pub struct Rng(oorandom::Rand64);
#[allow(missing_docs)]
impl Rng {
    /// Pass the same number to [Rng::new_with_seed()] to get the same stream
    /// back again.
    pub fn new_with_seed(seed: u128) -> Self {
        Self(oorandom::Rand64::new(seed))
    }

    /// Returns a value in -1.0..1.0.
    pub fn rand_bipolar(&mut self) -> f64 {
        self.0.rand_float() * 2.0 - 1.0
    }

    delegate! {
        to self.0 {
            pub fn rand_u64(&mut self) -> u64;
            pub fn rand_float(&mut self) -> f64;
        }
    }
}
