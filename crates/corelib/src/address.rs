//! Cluster member addresses.
//!
//! Addresses are handed out by the membership provider and never mutated.
//! They are compact so comparisons and hashing stay cheap on the routing
//! hot path.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_128;

/// Logical identifier of a cluster member.
///
/// Newtype over `u128` so comparisons and hashing are very fast while giving
/// plenty of space for uniqueness.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Address(pub u128);

impl Address {
    /// Derive an address from a logical node name (e.g. a hostname).
    ///
    /// The same name yields the same address on every node.
    pub fn from_name(name: &str) -> Self {
        Address(xxh3_128(name.as_bytes()))
    }

    /// Canonical byte form, used as input to placement scoring.
    #[inline]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl From<u128> for Address {
    fn from(id: u128) -> Self {
        Address(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_stable() {
        assert_eq!(Address::from_name("node-a"), Address::from_name("node-a"));
        assert_ne!(Address::from_name("node-a"), Address::from_name("node-b"));
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(Address(255).to_string(), format!("{:0>32}", "ff"));
    }
}
