//! Probabilistic pre-filter over canonical URLs
//!
//! A fixed-size bloom filter used to short-circuit the common "unseen URL"
//! case before touching the authoritative visited set. No false negatives;
//! false positives are bounded by sizing the bit array at 10x the expected
//! capacity with three seeded hashes.

use xxhash_rust::xxh3::xxh3_64_with_seed;

const HASH_SEEDS: [u64; 3] = [0, 1, 2];

/// Fixed-size bloom filter keyed by string.
#[derive(Debug)]
pub struct BloomFilter {
    bits: Vec<u64>,
    bit_count: usize,
    item_count: usize,
}

impl BloomFilter {
    /// Create a filter sized for roughly `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let bit_count = capacity.max(1) * 10;
        Self {
            bits: vec![0; bit_count.div_ceil(64)],
            bit_count,
            item_count: 0,
        }
    }

    /// Add a key to the filter.
    pub fn add(&mut self, key: &str) {
        for seed in HASH_SEEDS {
            let index = self.index(key, seed);
            self.bits[index / 64] |= 1 << (index % 64);
        }
        self.item_count += 1;
    }

    /// Check membership. `true` may be a false positive; `false` is definitive.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        HASH_SEEDS.iter().all(|&seed| {
            let index = self.index(key, seed);
            self.bits[index / 64] & (1 << (index % 64)) != 0
        })
    }

    /// Number of keys added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_count
    }

    /// Whether any key has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    fn index(&self, key: &str, seed: u64) -> usize {
        (xxh3_64_with_seed(key.as_bytes(), seed) % self.bit_count as u64) as usize
    }
}
