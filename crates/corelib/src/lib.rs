//! Core library for segment-based key ownership.
//!
//! This crate provides the distribution primitives of the cache core:
//! - Cluster member addresses
//! - Key hashing and key to segment mapping
//! - Immutable per-topology ownership tables
//! - Deterministic, minimal-movement placement of segments on members
//! - A router publishing topologies with atomic swaps

pub mod address;
pub mod config;
pub mod error;
pub mod hash;
pub mod placement;
pub mod router;
pub mod table;
pub mod topology;

pub use address::Address;
pub use config::{CapacityFactor, ClusteringConfig};
pub use error::{Error, Result};
pub use hash::{HashFunction, KeyHasher, SegmentHasher};
pub use placement::TableBuilder;
pub use router::{ConsistentHashRouter, MembershipListener};
pub use table::OwnershipTable;
pub use topology::CacheTopology;
