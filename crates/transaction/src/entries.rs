//! Looked-up entry bookkeeping.
//!
//! [`LookedUpEntries`] keeps the entries an invocation has touched in the
//! order they were first looked up. Re-binding a key replaces its entry in
//! place, so the position of a key never changes until it is removed.
//!
//! # Performance
//!
//! - **Lookup / insert / remove by key**: O(log n)
//! - **Iteration**: O(n), forwards or backwards
//! - **Key of an entry**: O(n) scan

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Insertion-ordered map of keys to entry handles.
#[derive(Debug, Clone)]
pub struct LookedUpEntries<K, E> {
    // Sequence number -> (key, entry); sequence order is insertion order.
    ordered: BTreeMap<u64, (K, E)>,
    positions: HashMap<K, u64>,
    next_seq: u64,
}

impl<K, E> Default for LookedUpEntries<K, E> {
    fn default() -> Self {
        Self {
            ordered: BTreeMap::new(),
            positions: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Eq + Hash + Clone, E> LookedUpEntries<K, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `entry`, returning the entry it replaced.
    pub fn put(&mut self, key: K, entry: E) -> Option<E> {
        if let Some(seq) = self.positions.get(&key) {
            if let Some(slot) = self.ordered.get_mut(seq) {
                return Some(std::mem::replace(&mut slot.1, entry));
            }
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.positions.insert(key.clone(), seq);
        self.ordered.insert(seq, (key, entry));
        None
    }

    pub fn get(&self, key: &K) -> Option<&E> {
        let seq = self.positions.get(key)?;
        self.ordered.get(seq).map(|(_, entry)| entry)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut E> {
        let seq = self.positions.get(key)?;
        self.ordered.get_mut(seq).map(|(_, entry)| entry)
    }

    pub fn remove(&mut self, key: &K) -> Option<E> {
        let seq = self.positions.remove(key)?;
        self.ordered.remove(&seq).map(|(_, entry)| entry)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.ordered.clear();
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Entries in lookup order. Reverse with `.rev()`.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &E)> {
        self.ordered.values().map(|(key, entry)| (key, entry))
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.ordered.values().map(|(key, _)| key)
    }

    /// Key bound to `entry`, searching from the oldest lookup.
    pub fn key_of(&self, entry: &E) -> Option<&K>
    where
        E: PartialEq,
    {
        self.ordered
            .values()
            .find(|(_, bound)| bound == entry)
            .map(|(key, _)| key)
    }
}
