//! Commands replicated to other members.

use serde::{Deserialize, Serialize};

/// A mutating cache operation that can be applied on a remote member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicableCommand {
    Put { key: Vec<u8>, value: Vec<u8> },
    PutAll { entries: Vec<(Vec<u8>, Vec<u8>)> },
    Remove { key: Vec<u8> },
    /// Drop the given keys from remote L1/near caches without replicating a value.
    Invalidate { keys: Vec<Vec<u8>> },
    Clear,
}

impl ReplicableCommand {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        ReplicableCommand::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<Vec<u8>>) -> Self {
        ReplicableCommand::Remove { key: key.into() }
    }

    /// The single key this command routes by, if it touches exactly one key.
    pub fn routing_key(&self) -> Option<&[u8]> {
        match self {
            ReplicableCommand::Put { key, .. } | ReplicableCommand::Remove { key } => Some(key),
            ReplicableCommand::PutAll { entries } if entries.len() == 1 => Some(&entries[0].0),
            ReplicableCommand::Invalidate { keys } if keys.len() == 1 => Some(&keys[0]),
            _ => None,
        }
    }

    /// Every key this command touches. Empty for `Clear`.
    pub fn keys(&self) -> Vec<&[u8]> {
        match self {
            ReplicableCommand::Put { key, .. } | ReplicableCommand::Remove { key } => vec![key.as_slice()],
            ReplicableCommand::PutAll { entries } => entries.iter().map(|(k, _)| k.as_slice()).collect(),
            ReplicableCommand::Invalidate { keys } => keys.iter().map(Vec::as_slice).collect(),
            ReplicableCommand::Clear => Vec::new(),
        }
    }
}

/// The unit actually handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteCommand {
    /// One command sent on its own.
    Single(ReplicableCommand),
    /// A queue flush: commands to apply in order.
    Replicate(Vec<ReplicableCommand>),
}

impl RemoteCommand {
    /// Number of cache operations carried.
    pub fn len(&self) -> usize {
        match self {
            RemoteCommand::Single(_) => 1,
            RemoteCommand::Replicate(commands) => commands.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn commands(&self) -> &[ReplicableCommand] {
        match self {
            RemoteCommand::Single(command) => std::slice::from_ref(command),
            RemoteCommand::Replicate(commands) => commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_key() {
        assert_eq!(ReplicableCommand::put("k", "v").routing_key(), Some(&b"k"[..]));
        assert_eq!(ReplicableCommand::Clear.routing_key(), None);
        let multi = ReplicableCommand::PutAll {
            entries: vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())],
        };
        assert_eq!(multi.routing_key(), None);
        assert_eq!(multi.keys(), vec![&b"a"[..], &b"b"[..]]);
    }

    #[test]
    fn test_batch_len() {
        let batch = RemoteCommand::Replicate(vec![ReplicableCommand::Clear; 3]);
        assert_eq!(batch.len(), 3);
        assert_eq!(RemoteCommand::Single(ReplicableCommand::Clear).commands().len(), 1);
    }
}
