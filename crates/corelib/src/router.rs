//! Consistent-hash routing.
//!
//! The router owns the current [`CacheTopology`] and answers ownership
//! queries against it. Topology changes are rare and lookups are constant,
//! so the topology is published through an [`ArcSwapOption`]: readers load
//! the current snapshot without locking, and an install is a single pointer
//! swap. A reader therefore sees either the old table or the new one in full,
//! never a mix of the two.
//!
//! Installs are serialized with a mutex so topology ids stay monotonic; the
//! mutex is never taken on the read path.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::address::Address;
use crate::config::ClusteringConfig;
use crate::error::{Error, Result};
use crate::hash::SegmentHasher;
use crate::placement::TableBuilder;
use crate::table::OwnershipTable;
use crate::topology::CacheTopology;

/// Receives cluster membership changes from the view provider.
pub trait MembershipListener: Send + Sync {
    /// Called with the full, ordered member list of the new view.
    fn on_view_changed(&self, members: &[Address]) -> Result<()>;
}

/// Routes keys to their owners for the currently installed topology.
#[derive(Debug)]
pub struct ConsistentHashRouter {
    config: ClusteringConfig,
    hasher: SegmentHasher,
    current: ArcSwapOption<CacheTopology>,
    install_lock: Mutex<()>,
}

impl ConsistentHashRouter {
    /// Create a router with no topology installed.
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        config.validate()?;
        let hasher = SegmentHasher::new(config.hash_function, config.num_segments);
        Ok(Self {
            config,
            hasher,
            current: ArcSwapOption::empty(),
            install_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn hasher(&self) -> &SegmentHasher {
        &self.hasher
    }

    #[inline]
    pub fn segment_of(&self, key: &[u8]) -> u32 {
        self.hasher.segment_of(key)
    }

    /// Snapshot of the installed topology, if any.
    pub fn current_topology(&self) -> Option<Arc<CacheTopology>> {
        self.current.load_full()
    }

    /// Snapshot of the installed topology, failing if none is installed.
    pub fn topology(&self) -> Result<Arc<CacheTopology>> {
        self.current_topology().ok_or(Error::UninitializedTopology)
    }

    /// Owners of `key`, primary first.
    pub fn owners_of(&self, key: &[u8]) -> Result<Vec<Address>> {
        self.with_topology(|topology| topology.owners_of(key).to_vec())
    }

    pub fn primary_owner_of(&self, key: &[u8]) -> Result<Address> {
        self.with_topology(|topology| topology.primary_owner_of(key))
    }

    pub fn owners_of_segment(&self, segment: u32) -> Result<Vec<Address>> {
        if segment >= self.hasher.num_segments() {
            return Err(Error::InvalidConfig(format!(
                "segment {} out of range",
                segment
            )));
        }
        self.with_topology(|topology| topology.table().owners(segment).to_vec())
    }

    pub fn segments_owned_by(&self, address: &Address, primary_only: bool) -> Result<BTreeSet<u32>> {
        self.with_topology(|topology| topology.segments_owned_by(address, primary_only))
    }

    pub fn is_owner(&self, address: &Address, key: &[u8]) -> Result<bool> {
        self.with_topology(|topology| topology.is_owner(address, key))
    }

    /// Run `f` against the current snapshot without cloning the `Arc`.
    fn with_topology<R>(&self, f: impl FnOnce(&CacheTopology) -> R) -> Result<R> {
        match &*self.current.load() {
            Some(topology) => Ok(f(topology)),
            None => Err(Error::UninitializedTopology),
        }
    }

    /// Publish `table` as the new topology.
    ///
    /// Readers that already captured a snapshot keep using it; every read
    /// started after this returns observes `table`.
    pub fn install_topology(&self, table: OwnershipTable) -> Result<Arc<CacheTopology>> {
        if table.num_segments() != self.hasher.num_segments() {
            return Err(Error::SegmentCountMismatch {
                expected: self.hasher.num_segments(),
                actual: table.num_segments(),
            });
        }

        let _guard = self.install_lock.lock();
        let topology_id = match &*self.current.load() {
            Some(current) => current.topology_id() + 1,
            None => 1,
        };
        let topology = Arc::new(CacheTopology::new(topology_id, self.hasher, table));
        self.current.store(Some(Arc::clone(&topology)));

        debug!(
            topology_id,
            members = topology.members().len(),
            segments = self.hasher.num_segments(),
            "installed topology"
        );
        Ok(topology)
    }

    /// Compute a table for `members` and install it.
    pub fn rebuild(&self, members: &[Address]) -> Result<Arc<CacheTopology>> {
        let table = TableBuilder::from_config(&self.config)
            .add_members(members)
            .build()?;
        info!(members = members.len(), "rebuilding ownership table");
        self.install_topology(table)
    }
}

impl MembershipListener for ConsistentHashRouter {
    fn on_view_changed(&self, members: &[Address]) -> Result<()> {
        self.rebuild(members).map(|_| ())
    }
}
