//! Key to segment mapping.
//!
//! The hash space `[0, 2^31)` is cut into `num_segments` contiguous ranges
//! of `ceil(2^31 / num_segments)` hashes each. The segment size is integer
//! arithmetic computed once, so every node derives the same boundaries.

use serde::{Deserialize, Serialize};

use crate::hash::traits::{HashFunction, KeyHasher};

/// Size of the normalized hash space.
const HASH_SPACE: u64 = 1 << 31;

/// Maps keys to segment ids for a fixed segment count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentHasher {
    function: HashFunction,
    num_segments: u32,
    segment_size: u32,
}

impl SegmentHasher {
    /// Create a hasher for `num_segments` segments.
    ///
    /// # Panics
    ///
    /// Panics if `num_segments` is zero.
    pub fn new(function: HashFunction, num_segments: u32) -> Self {
        assert!(num_segments > 0, "number of segments must be positive");
        let segment_size = HASH_SPACE.div_ceil(num_segments as u64) as u32;
        Self {
            function,
            num_segments,
            segment_size,
        }
    }

    /// Non-negative 31-bit hash of `key`.
    #[inline]
    pub fn normalized_hash(&self, key: &[u8]) -> u32 {
        (self.function.hash(key) as u32) & (i32::MAX as u32)
    }

    /// Segment owning `key`, always in `[0, num_segments)`.
    #[inline]
    pub fn segment_of(&self, key: &[u8]) -> u32 {
        self.normalized_hash(key) / self.segment_size
    }

    pub fn num_segments(&self) -> u32 {
        self.num_segments
    }

    pub fn segment_size(&self) -> u32 {
        self.segment_size
    }

    pub fn function(&self) -> HashFunction {
        self.function
    }
}
