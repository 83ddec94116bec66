//! Core key hasher trait definitions.

use serde::{Deserialize, Serialize};

use super::sip::SipKeyHasher;
use super::xxh3::Xxh3KeyHasher;

/// A key hasher converts a key's canonical bytes into a 64-bit hash.
///
/// Hashers are stateless and thread-safe. They must be pure functions of the
/// input bytes: equal keys have to hash identically on every node, since
/// ownership agreement across the cluster depends on it. That rules out
/// randomly seeded hashers such as `std`'s `RandomState`.
pub trait KeyHasher: Send + Sync + 'static {
    /// Hash the canonical bytes of a key.
    fn hash(&self, key: &[u8]) -> u64;

    /// Returns the name of this hasher.
    fn name(&self) -> &'static str;
}

/// Hash function selectable from configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFunction {
    #[default]
    Xxh3,
    SipHash13,
}

impl KeyHasher for HashFunction {
    #[inline]
    fn hash(&self, key: &[u8]) -> u64 {
        match self {
            HashFunction::Xxh3 => Xxh3KeyHasher.hash(key),
            HashFunction::SipHash13 => SipKeyHasher.hash(key),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            HashFunction::Xxh3 => Xxh3KeyHasher.name(),
            HashFunction::SipHash13 => SipKeyHasher.name(),
        }
    }
}
