//! Seeded xorshift64 generator.
//!
//! All randomness in the engine (HNSW layer draws, k-means seeding) flows
//! through this generator so that a build is reproducible given the same seed
//! and insertion order. The state is serialized with the index, so a reloaded
//! index continues the same deterministic sequence.

use serde::{Deserialize, Serialize};

/// Fallback state for a zero seed; xorshift64 has an all-zero fixed point.
const DEFAULT_STATE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Minimal xorshift64 PRNG with explicit state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { DEFAULT_STATE } else { seed },
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut s = self.state;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.state = s;
        s
    }

    /// Uniform draw in `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn next_f64(&mut self) -> f64 {
        // 53 high bits give a uniform double in [0, 1).
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform draw in `[0, bound)`. `bound` must be non-zero.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn next_bounded(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0);
        (self.next_u64() % bound as u64) as usize
    }
}
