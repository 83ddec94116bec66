//! Per-topology ownership tables.
//!
//! An [`OwnershipTable`] maps every segment to an ordered list of owners,
//! primary first. Tables are immutable once built: a membership change
//! produces a new table rather than editing the current one, so readers
//! holding a table never observe a partial update.
//!
//! # Invariants
//!
//! - every segment in `[0, num_segments)` has at least one owner
//! - no address appears twice in one segment's owner list
//! - every owner is a member of the table

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::address::Address;
use crate::error::{Error, Result};

/// Immutable mapping of segment id to owner list.
///
/// Deserialization goes through [`OwnershipTable::new`], so a decoded table
/// satisfies the same invariants as a built one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOwnershipTable")]
pub struct OwnershipTable {
    /// Members in view order. Owners are always drawn from this list.
    members: Vec<Address>,
    /// Requested replication factor; a segment may have fewer owners when
    /// the cluster is smaller than this.
    num_owners: u32,
    segment_owners: Vec<Vec<Address>>,
}

/// Wire form of [`OwnershipTable`] before validation.
#[derive(Deserialize)]
struct RawOwnershipTable {
    members: Vec<Address>,
    num_owners: u32,
    segment_owners: Vec<Vec<Address>>,
}

impl TryFrom<RawOwnershipTable> for OwnershipTable {
    type Error = Error;

    fn try_from(raw: RawOwnershipTable) -> Result<Self> {
        OwnershipTable::new(raw.members, raw.num_owners, raw.segment_owners)
    }
}

impl OwnershipTable {
    /// Build a table, checking the ownership invariants.
    pub fn new(
        members: Vec<Address>,
        num_owners: u32,
        segment_owners: Vec<Vec<Address>>,
    ) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::EmptyMembership);
        }
        if segment_owners.is_empty() {
            return Err(Error::InvalidOwnership("table has no segments".into()));
        }
        let member_set: HashSet<Address> = members.iter().copied().collect();
        if member_set.len() != members.len() {
            return Err(Error::InvalidOwnership("duplicate member address".into()));
        }

        for (segment, owners) in segment_owners.iter().enumerate() {
            if owners.is_empty() {
                return Err(Error::InvalidOwnership(format!(
                    "segment {} has no owners",
                    segment
                )));
            }
            let mut seen = HashSet::with_capacity(owners.len());
            for owner in owners {
                if !seen.insert(*owner) {
                    return Err(Error::InvalidOwnership(format!(
                        "segment {} lists owner {} twice",
                        segment, owner
                    )));
                }
                if !member_set.contains(owner) {
                    return Err(Error::InvalidOwnership(format!(
                        "segment {} owner {} is not a member",
                        segment, owner
                    )));
                }
            }
        }

        Ok(Self {
            members,
            num_owners,
            segment_owners,
        })
    }

    /// Parse a table from JSON, checking the same invariants as [`Self::new`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn num_segments(&self) -> u32 {
        self.segment_owners.len() as u32
    }

    pub fn num_owners(&self) -> u32 {
        self.num_owners
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    /// Owners of `segment`, primary first.
    ///
    /// # Panics
    ///
    /// Panics if `segment` is out of range.
    #[inline]
    pub fn owners(&self, segment: u32) -> &[Address] {
        &self.segment_owners[segment as usize]
    }

    #[inline]
    pub fn primary(&self, segment: u32) -> Address {
        self.segment_owners[segment as usize][0]
    }

    pub fn is_owner(&self, address: &Address, segment: u32) -> bool {
        self.owners(segment).contains(address)
    }

    /// Segments owned by `address`, either in any role or only as primary.
    pub fn segments_owned_by(&self, address: &Address, primary_only: bool) -> BTreeSet<u32> {
        self.segment_owners
            .iter()
            .enumerate()
            .filter(|(_, owners)| {
                if primary_only {
                    owners[0] == *address
                } else {
                    owners.contains(address)
                }
            })
            .map(|(segment, _)| segment as u32)
            .collect()
    }

    /// Merge two tables with the same segment count.
    ///
    /// For each segment the owners of `self` come first, so its primary stays
    /// primary; owners of `other` follow as extra backups. Used while data is
    /// moving between two topologies and both owner sets must receive writes.
    pub fn union(&self, other: &OwnershipTable) -> Result<OwnershipTable> {
        if self.num_segments() != other.num_segments() {
            return Err(Error::SegmentCountMismatch {
                expected: self.num_segments(),
                actual: other.num_segments(),
            });
        }

        let mut members = self.members.clone();
        for member in &other.members {
            if !members.contains(member) {
                members.push(*member);
            }
        }

        let segment_owners = self
            .segment_owners
            .iter()
            .zip(&other.segment_owners)
            .map(|(mine, theirs)| {
                let mut owners = mine.clone();
                owners.extend(theirs.iter().filter(|a| !mine.contains(a)));
                owners
            })
            .collect();

        OwnershipTable::new(
            members,
            self.num_owners.max(other.num_owners),
            segment_owners,
        )
    }
}
