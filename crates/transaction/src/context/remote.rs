//! Context of a transaction replayed for another member.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use corelib::CacheTopology;

use super::{InvocationContext, LockOwner, TxContextCore, TxInvocationContext};
use crate::error::{Result, TransactionError};
use crate::global::GlobalTransaction;
use crate::manager::{Transaction, TxStatus};
use crate::transaction::{Modification, RemoteTransaction};

/// Context of an operation replayed on behalf of a transaction that started
/// on another member.
///
/// Only the [`GlobalTransaction`] is known here. Asking for the local
/// transaction manager handle always fails with
/// [`TransactionError::UnsupportedOperation`].
pub struct RemoteTxInvocationContext<K: Eq + Hash + Clone, E> {
    core: TxContextCore<RemoteTransaction<K, E>>,
}

impl<K: Eq + Hash + Clone, E> RemoteTxInvocationContext<K, E> {
    pub fn new(transaction: Arc<Mutex<RemoteTransaction<K, E>>>, topology: Option<Arc<CacheTopology>>) -> Self {
        Self {
            core: TxContextCore::new(transaction, topology),
        }
    }

    pub fn remote_transaction(&self) -> &Arc<Mutex<RemoteTransaction<K, E>>> {
        self.core.transaction()
    }
}

impl<K: Eq + Hash + Clone, E: Clone> Clone for RemoteTxInvocationContext<K, E> {
    /// The remote transaction, including its looked-up entries, is copied
    /// into the clone. The status stays shared, so a rollback of the
    /// registered transaction invalidates every clone.
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<K: Eq + Hash + Clone, E: Clone> InvocationContext<K, E> for RemoteTxInvocationContext<K, E> {
    fn is_origin_local(&self) -> bool {
        false
    }

    fn is_in_tx_scope(&self) -> bool {
        true
    }

    fn lock_owner(&self) -> LockOwner {
        LockOwner::Transaction(self.core.global_transaction())
    }

    fn topology(&self) -> Option<&Arc<CacheTopology>> {
        self.core.topology()
    }

    fn lookup_entry(&self, key: &K) -> Option<E> {
        self.core.lookup_entry(key)
    }

    fn put_looked_up_entry(&mut self, key: K, entry: E) {
        self.core.put_looked_up_entry(key, entry);
    }

    fn remove_looked_up_entry(&mut self, key: &K) -> Option<E> {
        self.core.remove_looked_up_entry(key)
    }

    fn clear_looked_up_entries(&mut self) {
        self.core.clear_looked_up_entries();
    }

    fn looked_up_keys(&self) -> Vec<K> {
        self.core.looked_up_keys()
    }
}

impl<K: Eq + Hash + Clone, E: Clone> TxInvocationContext<K, E> for RemoteTxInvocationContext<K, E> {
    fn global_transaction(&self) -> GlobalTransaction {
        self.core.global_transaction()
    }

    fn running_transaction(&self) -> Result<Transaction> {
        Err(TransactionError::UnsupportedOperation(
            "remote transactions have no local transaction handle",
        ))
    }

    fn transaction_status(&self) -> Result<TxStatus> {
        Ok(self.core.transaction().lock().status())
    }

    fn add_affected_key(&mut self, key: K) {
        self.core.add_affected_key(key);
    }

    fn affected_keys(&self) -> &HashSet<K> {
        self.core.affected_keys()
    }

    fn has_modifications(&self) -> bool {
        self.core.has_modifications()
    }

    fn modifications(&self) -> Vec<Modification<K>> {
        self.core.modifications()
    }

    fn add_modification(&mut self, modification: Modification<K>) -> Result<()> {
        self.core.add_modification(modification)
    }

    fn mark_completed(&mut self) {
        self.core.mark_completed();
    }

    fn is_completed(&self) -> bool {
        self.core.is_completed()
    }
}
