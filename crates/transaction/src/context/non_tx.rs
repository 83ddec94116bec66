//! Context of a non-transactional invocation.

use std::hash::Hash;
use std::sync::Arc;

use corelib::CacheTopology;

use super::{InvocationContext, LockOwner};
use crate::entries::LookedUpEntries;

/// Context of a single operation outside any transaction.
///
/// Entries live on the context itself; locks are owned by the invocation.
#[derive(Debug, Clone)]
pub struct NonTxInvocationContext<K, E> {
    looked_up_entries: LookedUpEntries<K, E>,
    origin_local: bool,
    invocation_id: u64,
    topology: Option<Arc<CacheTopology>>,
}

impl<K: Eq + Hash + Clone, E> NonTxInvocationContext<K, E> {
    pub fn new(origin_local: bool, invocation_id: u64, topology: Option<Arc<CacheTopology>>) -> Self {
        Self {
            looked_up_entries: LookedUpEntries::new(),
            origin_local,
            invocation_id,
            topology,
        }
    }

    pub fn looked_up_entries(&self) -> &LookedUpEntries<K, E> {
        &self.looked_up_entries
    }
}

impl<K: Eq + Hash + Clone, E: Clone> InvocationContext<K, E> for NonTxInvocationContext<K, E> {
    fn is_origin_local(&self) -> bool {
        self.origin_local
    }

    fn is_in_tx_scope(&self) -> bool {
        false
    }

    fn lock_owner(&self) -> LockOwner {
        LockOwner::Invocation(self.invocation_id)
    }

    fn topology(&self) -> Option<&Arc<CacheTopology>> {
        self.topology.as_ref()
    }

    fn lookup_entry(&self, key: &K) -> Option<E> {
        self.looked_up_entries.get(key).cloned()
    }

    fn put_looked_up_entry(&mut self, key: K, entry: E) {
        self.looked_up_entries.put(key, entry);
    }

    fn remove_looked_up_entry(&mut self, key: &K) -> Option<E> {
        self.looked_up_entries.remove(key)
    }

    fn clear_looked_up_entries(&mut self) {
        self.looked_up_entries.clear();
    }

    fn looked_up_keys(&self) -> Vec<K> {
        self.looked_up_entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_and_lock_owner() {
        let mut ctx: NonTxInvocationContext<&str, u8> = NonTxInvocationContext::new(true, 42, None);
        ctx.put_looked_up_entry("x", 1);
        ctx.put_looked_up_entry("y", 2);
        ctx.put_looked_up_entry("x", 3);

        assert_eq!(ctx.looked_up_keys(), vec!["x", "y"]);
        assert_eq!(ctx.lookup_entry(&"x"), Some(3));
        assert_eq!(ctx.lock_owner(), LockOwner::Invocation(42));
        assert!(!ctx.is_in_tx_scope());

        let mut clone = ctx.clone();
        clone.clear_looked_up_entries();
        assert_eq!(ctx.looked_up_entries().len(), 2);
    }
}
