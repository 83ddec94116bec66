//! Distribution: writes go to the owners of the keys they touch.
//!
//! # Algorithm
//!
//! 1. Map every key of the command to its segment
//! 2. Collect the owners of those segments, primary first, without repeats
//! 3. Commands without keys (`Clear`) go to every member
//!
//! # Performance
//!
//! - **Time**: O(k * r) where k = keys in the command, r = owners per segment
//! - **Space**: O(m) for the recipient list, m = distinct owners

use corelib::{Address, CacheTopology};

use crate::command::ReplicableCommand;
use crate::strategy::ReplicationStrategy;
use crate::transport::Recipients;

#[derive(Debug, Clone, Copy, Default)]
pub struct DistributedStrategy;

impl ReplicationStrategy for DistributedStrategy {
    fn recipients(&self, topology: &CacheTopology, command: &ReplicableCommand) -> Recipients {
        let keys = command.keys();
        if keys.is_empty() {
            return Recipients::All;
        }

        let mut targets: Vec<Address> = Vec::new();
        for key in keys {
            for owner in topology.owners_of(key) {
                if !targets.contains(owner) {
                    targets.push(*owner);
                }
            }
        }
        Recipients::Only(targets)
    }

    fn name(&self) -> &'static str {
        "DistributedStrategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{ClusteringConfig, ConsistentHashRouter};
    use std::collections::HashSet;

    #[test]
    fn test_single_key_goes_to_owners() {
        let router = ConsistentHashRouter::new(ClusteringConfig::new(60, 2)).unwrap();
        let topology = router.rebuild(&[Address(1), Address(2), Address(3)]).unwrap();

        let command = ReplicableCommand::put("test-key", "v");
        match DistributedStrategy.recipients(&topology, &command) {
            Recipients::Only(targets) => assert_eq!(targets, topology.owners_of(b"test-key")),
            other => panic!("unexpected recipients: {:?}", other),
        }
    }

    #[test]
    fn test_multi_key_targets_are_unique() {
        let router = ConsistentHashRouter::new(ClusteringConfig::new(60, 2)).unwrap();
        let topology = router.rebuild(&[Address(1), Address(2), Address(3)]).unwrap();

        let keys: Vec<Vec<u8>> = (0..20).map(|i| format!("key-{}", i).into_bytes()).collect();
        let command = ReplicableCommand::Invalidate { keys };
        let Recipients::Only(targets) = DistributedStrategy.recipients(&topology, &command) else {
            panic!("expected explicit recipients");
        };
        let unique: HashSet<_> = targets.iter().collect();
        assert_eq!(unique.len(), targets.len());
    }

    #[test]
    fn test_clear_goes_to_all() {
        let router = ConsistentHashRouter::new(ClusteringConfig::new(8, 1)).unwrap();
        let topology = router.rebuild(&[Address(1)]).unwrap();
        assert_eq!(
            DistributedStrategy.recipients(&topology, &ReplicableCommand::Clear),
            Recipients::All
        );
    }
}
