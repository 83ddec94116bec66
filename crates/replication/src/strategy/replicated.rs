//! Full replication: every write goes to every member.

use corelib::CacheTopology;

use crate::command::ReplicableCommand;
use crate::strategy::ReplicationStrategy;
use crate::transport::Recipients;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicatedStrategy;

impl ReplicationStrategy for ReplicatedStrategy {
    fn recipients(&self, _topology: &CacheTopology, _command: &ReplicableCommand) -> Recipients {
        Recipients::All
    }

    fn name(&self) -> &'static str {
        "ReplicatedStrategy"
    }
}
