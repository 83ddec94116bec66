//! Cache-side state of a transaction.

use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;

use crate::entries::LookedUpEntries;
use crate::global::GlobalTransaction;
use crate::manager::{Transaction, TxStatus};

/// A write recorded by a transaction, replayed at commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification<K> {
    Put(K),
    Remove(K),
    Clear,
}

impl<K> Modification<K> {
    pub fn key(&self) -> Option<&K> {
        match self {
            Modification::Put(key) | Modification::Remove(key) => Some(key),
            Modification::Clear => None,
        }
    }
}

/// State shared by local and remote transactions.
#[derive(Debug, Clone)]
pub struct CacheTransaction<K, E> {
    global_tx: GlobalTransaction,
    topology_id: u64,
    looked_up_entries: LookedUpEntries<K, E>,
    modifications: Vec<Modification<K>>,
}

impl<K: Eq + Hash + Clone, E> CacheTransaction<K, E> {
    pub fn new(global_tx: GlobalTransaction, topology_id: u64) -> Self {
        Self {
            global_tx,
            topology_id,
            looked_up_entries: LookedUpEntries::new(),
            modifications: Vec::new(),
        }
    }

    pub fn global_transaction(&self) -> GlobalTransaction {
        self.global_tx
    }

    /// Topology installed when the transaction started.
    pub fn topology_id(&self) -> u64 {
        self.topology_id
    }

    pub fn looked_up_entries(&self) -> &LookedUpEntries<K, E> {
        &self.looked_up_entries
    }

    pub fn looked_up_entries_mut(&mut self) -> &mut LookedUpEntries<K, E> {
        &mut self.looked_up_entries
    }

    pub fn modifications(&self) -> &[Modification<K>] {
        &self.modifications
    }

    pub fn add_modification(&mut self, modification: Modification<K>) {
        self.modifications.push(modification);
    }

    pub fn has_modifications(&self) -> bool {
        !self.modifications.is_empty()
    }
}

/// Transaction started on this member, bound to a transaction manager handle.
#[derive(Debug, Clone)]
pub struct LocalTransaction<K, E> {
    transaction: Transaction,
    inner: CacheTransaction<K, E>,
}

impl<K: Eq + Hash + Clone, E> LocalTransaction<K, E> {
    pub fn new(transaction: Transaction, global_tx: GlobalTransaction, topology_id: u64) -> Self {
        Self {
            transaction,
            inner: CacheTransaction::new(global_tx, topology_id),
        }
    }

    pub fn transaction(&self) -> Transaction {
        self.transaction
    }

    pub fn cache_transaction(&self) -> &CacheTransaction<K, E> {
        &self.inner
    }

    pub fn cache_transaction_mut(&mut self) -> &mut CacheTransaction<K, E> {
        &mut self.inner
    }
}

/// Transaction replayed here on behalf of another member.
///
/// There is no local transaction manager association; the status is tracked
/// on the transaction itself. Clones copy the cache-side state but share the
/// status cell, so a rollback is seen by every copy.
#[derive(Debug, Clone)]
pub struct RemoteTransaction<K, E> {
    inner: CacheTransaction<K, E>,
    status: Arc<Mutex<TxStatus>>,
}

impl<K: Eq + Hash + Clone, E> RemoteTransaction<K, E> {
    pub fn new(global_tx: GlobalTransaction, topology_id: u64) -> Self {
        Self::with_status(global_tx, topology_id, TxStatus::Active)
    }

    pub fn with_status(global_tx: GlobalTransaction, topology_id: u64, status: TxStatus) -> Self {
        Self {
            inner: CacheTransaction::new(global_tx, topology_id),
            status: Arc::new(Mutex::new(status)),
        }
    }

    pub fn status(&self) -> TxStatus {
        *self.status.lock()
    }

    pub fn set_status(&self, status: TxStatus) {
        *self.status.lock() = status;
    }

    pub fn cache_transaction(&self) -> &CacheTransaction<K, E> {
        &self.inner
    }

    pub fn cache_transaction_mut(&mut self) -> &mut CacheTransaction<K, E> {
        &mut self.inner
    }
}
