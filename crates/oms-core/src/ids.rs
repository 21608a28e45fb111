//! Identifier generation for ClOrdID / ExecID values.

use parking_lot::Mutex;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default identifier length.
pub const DEFAULT_ID_LEN: usize = 15;

/// Thread-safe generator of random lowercase identifiers.
///
/// One generator is created per process and handed to every component
/// that needs ids, so a seeded generator gives a reproducible run.
#[derive(Debug)]
pub struct IdGenerator {
    rng: Mutex<StdRng>,
}

impl IdGenerator {
    /// Generator seeded from the OS.
    pub fn new() -> Self {
        IdGenerator {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Generator with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        IdGenerator {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// A random identifier of `len` characters in `a..=z`.
    pub fn generate(&self, len: usize) -> String {
        let letters = Uniform::new_inclusive(b'a', b'z');
        let mut rng = self.rng.lock();
        (0..len).map(|_| char::from(rng.sample(letters))).collect()
    }

    /// A random identifier of [`DEFAULT_ID_LEN`] characters.
    pub fn next_id(&self) -> String {
        self.generate(DEFAULT_ID_LEN)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        IdGenerator::new()
    }
}
