//! Deterministic random number generation for training.
//!
//! RULE: Nothing in training may call any platform RNG.
//! All randomness flows through StreamRng instances derived from the
//! single `random_state` / `seed` in the configuration.
//!
//! Each consumer gets its own stream, seeded from
//! (master_seed XOR stream_index * golden ratio). This means:
//!   - Growing the forest never changes the streams of existing trees.
//!   - The train/validation split is independent of model hyperparameters.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single consumer.
pub struct StreamRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a usize in [0, n).
    pub fn below(&mut self, n: usize) -> usize {
        assert!(n > 0, "n must be > 0");
        (self.inner.next_u64() % n as u64) as usize
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }

    /// `k` distinct indices from `0..n`, in draw order.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let k = k.min(n);
        for i in 0..k {
            let j = i + self.below(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}

/// Stable stream assignments.
/// NEVER reorder. Trees take indices from `Tree` upward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngStream {
    Split = 0,
    Tree  = 1,
}

pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_split(&self) -> StreamRng {
        StreamRng::new(self.master_seed, RngStream::Split as u64).with_name("split")
    }

    pub fn for_tree(&self, tree_index: usize) -> StreamRng {
        StreamRng::new(self.master_seed, RngStream::Tree as u64 + tree_index as u64)
            .with_name("tree")
    }
}
