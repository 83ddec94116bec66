//! XXH3 key hasher (the default).

use crate::hash::traits::KeyHasher;
use xxhash_rust::xxh3::xxh3_64;

/// Unseeded 64-bit XXH3.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh3KeyHasher;

impl KeyHasher for Xxh3KeyHasher {
    #[inline]
    fn hash(&self, key: &[u8]) -> u64 {
        xxh3_64(key)
    }

    fn name(&self) -> &'static str {
        "Xxh3KeyHasher"
    }
}
