//! Segment placement.
//!
//! Owners are chosen per segment with weighted rendezvous (highest random
//! weight) hashing: every member gets a score for every segment and the
//! `num_owners` best scores own the segment, best first.
//!
//! # Properties
//!
//! - **Deterministic**: the same members, capacity factors and segment count
//!   always produce the same table, on every node.
//! - **Minimal movement**: a member's score for a segment does not depend on
//!   the other members. Removing a member only changes the owner lists that
//!   contained it; every other segment keeps exactly the same owners in the
//!   same order.
//! - **Weighted**: a member with capacity factor `w` wins proportionally more
//!   segments; `w = 0` never owns anything.
//!
//! # Performance
//!
//! - **Time**: O(s * m log m) for s segments and m members
//! - **Space**: O(s * r) for the resulting table, r = owners per segment

use std::cmp::Ordering;
use std::collections::HashMap;

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::address::Address;
use crate::config::ClusteringConfig;
use crate::error::{Error, Result};
use crate::table::OwnershipTable;

/// Builds ownership tables for a membership list.
///
/// # Example
///
/// ```rust
/// use corelib::{Address, TableBuilder};
///
/// let table = TableBuilder::new(60)
///     .with_owners(2)
///     .add_member(Address(1))
///     .add_member(Address(2))
///     .add_member(Address(3))
///     .build()
///     .unwrap();
/// assert_eq!(table.owners(0).len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct TableBuilder {
    num_segments: u32,
    num_owners: u32,
    members: Vec<Address>,
    capacity_factors: HashMap<Address, f32>,
}

impl TableBuilder {
    pub fn new(num_segments: u32) -> Self {
        Self {
            num_segments,
            num_owners: crate::config::DEFAULT_NUM_OWNERS,
            members: Vec::new(),
            capacity_factors: HashMap::new(),
        }
    }

    /// Builder preloaded with the segment count, owners and capacity factors
    /// of `config`.
    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self::new(config.num_segments)
            .with_owners(config.num_owners)
            .with_capacity_factors(config.capacity_factors())
    }

    pub fn with_owners(mut self, num_owners: u32) -> Self {
        self.num_owners = num_owners;
        self
    }

    pub fn with_capacity_factors(mut self, factors: HashMap<Address, f32>) -> Self {
        self.capacity_factors = factors;
        self
    }

    /// Add a member. Adding the same address twice is a no-op.
    pub fn add_member(mut self, address: Address) -> Self {
        if !self.members.contains(&address) {
            self.members.push(address);
        }
        self
    }

    pub fn add_members(self, members: &[Address]) -> Self {
        members.iter().fold(self, |builder, m| builder.add_member(*m))
    }

    pub fn build(self) -> Result<OwnershipTable> {
        if self.num_segments == 0 {
            return Err(Error::InvalidConfig("num_segments must be positive".into()));
        }
        if self.num_owners == 0 {
            return Err(Error::InvalidConfig("num_owners must be positive".into()));
        }
        if self.members.is_empty() {
            return Err(Error::EmptyMembership);
        }

        // Zero-capacity members stay in the view but never own a segment.
        let candidates: Vec<(Address, f64)> = self
            .members
            .iter()
            .map(|m| (*m, self.capacity_of(m)))
            .filter(|(_, weight)| *weight > 0.0)
            .collect();
        if candidates.is_empty() {
            return Err(Error::NoCapacity);
        }

        let owners_per_segment = (self.num_owners as usize).min(candidates.len());
        let mut scored = Vec::with_capacity(candidates.len());
        let segment_owners = (0..self.num_segments)
            .map(|segment| {
                scored.clear();
                scored.extend(
                    candidates
                        .iter()
                        .map(|(member, weight)| (score(segment, member, *weight), *member)),
                );
                // Highest score first; address order breaks exact ties.
                scored.sort_by(|a, b| {
                    b.0.partial_cmp(&a.0)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.1.cmp(&b.1))
                });
                scored
                    .iter()
                    .take(owners_per_segment)
                    .map(|(_, member)| *member)
                    .collect()
            })
            .collect();

        OwnershipTable::new(self.members, self.num_owners, segment_owners)
    }

    fn capacity_of(&self, member: &Address) -> f64 {
        self.capacity_factors.get(member).copied().unwrap_or(1.0) as f64
    }
}

/// Weighted rendezvous score: `-w / ln(u)` with `u` uniform in `(0, 1)`.
fn score(segment: u32, member: &Address, weight: f64) -> f64 {
    let hash = xxh3_64_with_seed(&member.to_bytes(), segment as u64);
    // 53 high bits give a uniform double; the +1 keeps u strictly above zero.
    let unit = ((hash >> 11) as f64 + 1.0) / ((1u64 << 53) as f64 + 1.0);
    -weight / unit.ln()
}
