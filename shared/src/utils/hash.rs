//! Seeded hashing used to index event rules
//!
//! Every component of a rule is hashed independently with the same seed and
//! the results are combined with XOR by the caller.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seed mixed into every key hash.
pub const HASH_SEED: u64 = 0x5eed_7ace_c7b1_0001;

fn seeded<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    HASH_SEED.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

pub fn hash_key_u64(value: u64) -> u64 {
    seeded(&value)
}

pub fn hash_key_str(value: &str) -> u64 {
    seeded(value)
}
