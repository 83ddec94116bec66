//! Cache topology snapshots.
//!
//! A [`CacheTopology`] bundles an ownership table with the hasher needed to
//! route keys through it and the id it was installed under. Operations that
//! capture a snapshot keep routing against it even after the router has
//! moved on to a newer topology.

use std::collections::{BTreeSet, HashMap};

use crate::address::Address;
use crate::hash::SegmentHasher;
use crate::table::OwnershipTable;

/// Immutable, installed topology.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheTopology {
    topology_id: u64,
    hasher: SegmentHasher,
    table: OwnershipTable,
}

impl CacheTopology {
    pub(crate) fn new(topology_id: u64, hasher: SegmentHasher, table: OwnershipTable) -> Self {
        Self {
            topology_id,
            hasher,
            table,
        }
    }

    pub fn topology_id(&self) -> u64 {
        self.topology_id
    }

    pub fn table(&self) -> &OwnershipTable {
        &self.table
    }

    pub fn hasher(&self) -> &SegmentHasher {
        &self.hasher
    }

    pub fn members(&self) -> &[Address] {
        self.table.members()
    }

    #[inline]
    pub fn segment_of(&self, key: &[u8]) -> u32 {
        self.hasher.segment_of(key)
    }

    /// Owners of `key`, primary first.
    #[inline]
    pub fn owners_of(&self, key: &[u8]) -> &[Address] {
        self.table.owners(self.segment_of(key))
    }

    #[inline]
    pub fn primary_owner_of(&self, key: &[u8]) -> Address {
        self.table.primary(self.segment_of(key))
    }

    pub fn is_owner(&self, address: &Address, key: &[u8]) -> bool {
        self.owners_of(key).contains(address)
    }

    pub fn segments_owned_by(&self, address: &Address, primary_only: bool) -> BTreeSet<u32> {
        self.table.segments_owned_by(address, primary_only)
    }

    /// Group keys by owner. A key with several owners appears under each.
    pub fn locate_all<'k, I>(&self, keys: I) -> HashMap<Address, Vec<&'k [u8]>>
    where
        I: IntoIterator<Item = &'k [u8]>,
    {
        let mut located: HashMap<Address, Vec<&'k [u8]>> = HashMap::new();
        for key in keys {
            for owner in self.owners_of(key) {
                located.entry(*owner).or_default().push(key);
            }
        }
        located
    }
}
