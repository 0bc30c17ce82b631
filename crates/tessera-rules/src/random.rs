//! Per-cell randomness that does not depend on traversal order.
//!
//! A stochastic generation draws one `u64` generation seed from the
//! simulation's seeded RNG. Each cell then derives its own uniform sample
//! by mixing that seed with its linear index through `splitmix64`. The
//! sample a cell sees is therefore a pure function of `(seed, generation,
//! index)`, and a row-major sweep produces the same grid as a column-major
//! one.

/// `splitmix64` finalizer.
pub const fn splitmix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Source of per-cell uniform samples for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRandom {
    generation_seed: u64,
}

impl CellRandom {
    /// Create the per-cell source for a generation seed.
    pub const fn new(generation_seed: u64) -> Self {
        Self { generation_seed }
    }

    /// The generation seed this source was built from.
    pub const fn generation_seed(self) -> u64 {
        self.generation_seed
    }

    /// Raw 64 random bits for `index`.
    pub const fn bits(self, index: usize) -> u64 {
        splitmix64(self.generation_seed ^ splitmix64(index as u64))
    }

    /// Uniform sample in `[0, 1)` for `index`.
    #[allow(clippy::cast_precision_loss)]
    pub const fn uniform(self, index: usize) -> f64 {
        // 53 high bits fill the f64 mantissa exactly.
        let mantissa = self.bits(index) >> 11;
        mantissa as f64 / (1_u64 << 53) as f64
    }
}
