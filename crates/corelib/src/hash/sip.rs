//! SipHash-1-3 key hasher.

use crate::hash::traits::KeyHasher;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// SipHash-1-3 with fixed all-zero keys, so results agree across processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SipKeyHasher;

impl KeyHasher for SipKeyHasher {
    fn hash(&self, key: &[u8]) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(0, 0);
        hasher.write(key);
        hasher.finish()
    }

    fn name(&self) -> &'static str {
        "SipKeyHasher"
    }
}
