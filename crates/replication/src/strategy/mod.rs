//! Replication strategy abstractions.
//!
//! A replication strategy decides which members receive a write:
//!
//! - **ReplicatedStrategy**: every member holds every entry
//! - **DistributedStrategy**: only the owners of the written key(s)

pub mod distributed;
pub mod replicated;

pub use distributed::DistributedStrategy;
pub use replicated::ReplicatedStrategy;

use corelib::CacheTopology;

use crate::command::ReplicableCommand;
use crate::config::CacheMode;
use crate::transport::Recipients;

/// Trait for replication strategies.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as they are shared by
/// every thread writing through a dispatcher.
pub trait ReplicationStrategy: Send + Sync + 'static {
    /// Recipients of `command` under `topology`.
    fn recipients(&self, topology: &CacheTopology, command: &ReplicableCommand) -> Recipients;

    /// Get the strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// Strategy matching a cache mode.
pub fn for_mode(mode: CacheMode) -> Box<dyn ReplicationStrategy> {
    if mode.is_distributed() {
        Box::new(DistributedStrategy)
    } else {
        Box::new(ReplicatedStrategy)
    }
}
