//! Invocation contexts.
//!
//! Every cache operation runs inside a context that records which entries
//! it looked up. Transactional contexts additionally track the keys the
//! transaction affected and check the transaction is still running before
//! state-mutating work.
//!
//! | Context | Origin | Running transaction handle |
//! |---|---|---|
//! | [`NonTxInvocationContext`] | local or remote | none |
//! | [`LocalTxInvocationContext`] | local | from the transaction manager |
//! | [`RemoteTxInvocationContext`] | remote | unsupported |
//!
//! A context is owned by the thread executing the operation. Handing work
//! to another execution path (a retry, a fork) goes through `clone()`,
//! which copies every mutable container so neither side observes the
//! other's changes. The transaction's lifecycle status is not a container:
//! a clone keeps observing the status of the transaction it was cloned from.
//!
//! Completing a context stops it from recording modifications. The looked-up
//! entries and affected keys stay editable so that post-commit cleanup can
//! release them; [`assert_transaction_valid`] is the guard for new work.

pub mod local;
pub mod non_tx;
pub mod remote;

pub use local::LocalTxInvocationContext;
pub use non_tx::NonTxInvocationContext;
pub use remote::RemoteTxInvocationContext;

use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

use corelib::CacheTopology;

use crate::error::{Result, TransactionError};
use crate::global::GlobalTransaction;
use crate::manager::{Transaction, TxStatus};
use crate::transaction::{CacheTransaction, LocalTransaction, Modification, RemoteTransaction};

/// Identity locks are acquired under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockOwner {
    Transaction(GlobalTransaction),
    /// Id of a single non-transactional invocation.
    Invocation(u64),
}

/// Bookkeeping common to every context.
pub trait InvocationContext<K, E> {
    fn is_origin_local(&self) -> bool;

    fn is_in_tx_scope(&self) -> bool;

    fn lock_owner(&self) -> LockOwner;

    /// Topology captured when the context was created.
    fn topology(&self) -> Option<&Arc<CacheTopology>>;

    fn lookup_entry(&self, key: &K) -> Option<E>;

    /// Bind `key` to `entry` for the rest of the invocation.
    fn put_looked_up_entry(&mut self, key: K, entry: E);

    fn remove_looked_up_entry(&mut self, key: &K) -> Option<E>;

    fn clear_looked_up_entries(&mut self);

    /// Looked-up keys in lookup order.
    fn looked_up_keys(&self) -> Vec<K>;
}

/// Context of an operation running inside a transaction.
pub trait TxInvocationContext<K, E>: InvocationContext<K, E> {
    fn global_transaction(&self) -> GlobalTransaction;

    /// Handle of the running transaction in the local transaction manager.
    fn running_transaction(&self) -> Result<Transaction>;

    fn transaction_status(&self) -> Result<TxStatus>;

    /// True iff the transaction is active or preparing. A failing status
    /// query counts as invalid.
    fn is_valid_running_tx(&self) -> bool {
        match self.transaction_status() {
            Ok(status) => status.is_valid(),
            Err(error) => {
                debug!(gtx = %self.global_transaction(), %error, "status query failed, treating transaction as invalid");
                false
            }
        }
    }

    fn add_affected_key(&mut self, key: K);

    fn add_affected_keys<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        Self: Sized,
    {
        for key in keys {
            self.add_affected_key(key);
        }
    }

    fn affected_keys(&self) -> &HashSet<K>;

    fn has_modifications(&self) -> bool;

    fn modifications(&self) -> Vec<Modification<K>>;

    /// Record a write. Fails once the context completed, unlike the
    /// looked-up entry and affected key bookkeeping.
    fn add_modification(&mut self, modification: Modification<K>) -> Result<()>;

    /// Mark the transaction committed or rolled back. Irreversible.
    fn mark_completed(&mut self);

    fn is_completed(&self) -> bool;
}

/// Guard run before state-mutating work in a transaction.
pub fn assert_transaction_valid<K, E, C>(ctx: &C) -> Result<()>
where
    C: TxInvocationContext<K, E> + ?Sized,
{
    if ctx.is_completed() {
        return Err(TransactionError::ContextCompleted);
    }
    let gtx = ctx.global_transaction();
    match ctx.transaction_status() {
        Ok(status) if status.is_valid() => Ok(()),
        Ok(status) => Err(TransactionError::InvalidTransaction {
            gtx,
            status: Some(status),
            cause: None,
        }),
        Err(error) => Err(TransactionError::InvalidTransaction {
            gtx,
            status: None,
            cause: Some(error.to_string()),
        }),
    }
}

/// Access to the cache-side state of a local or remote transaction.
pub(crate) trait HoldsCacheTransaction {
    type Key: Eq + Hash + Clone;
    type Entry;

    fn cache_tx(&self) -> &CacheTransaction<Self::Key, Self::Entry>;

    fn cache_tx_mut(&mut self) -> &mut CacheTransaction<Self::Key, Self::Entry>;
}

impl<K: Eq + Hash + Clone, E> HoldsCacheTransaction for LocalTransaction<K, E> {
    type Key = K;
    type Entry = E;

    fn cache_tx(&self) -> &CacheTransaction<K, E> {
        self.cache_transaction()
    }

    fn cache_tx_mut(&mut self) -> &mut CacheTransaction<K, E> {
        self.cache_transaction_mut()
    }
}

impl<K: Eq + Hash + Clone, E> HoldsCacheTransaction for RemoteTransaction<K, E> {
    type Key = K;
    type Entry = E;

    fn cache_tx(&self) -> &CacheTransaction<K, E> {
        self.cache_transaction()
    }

    fn cache_tx_mut(&mut self) -> &mut CacheTransaction<K, E> {
        self.cache_transaction_mut()
    }
}

/// State and entry handling shared by the two transactional contexts.
///
/// The transaction itself is shared with the transaction table and with
/// other contexts of the same transaction; the affected keys belong to
/// this context alone.
pub(crate) struct TxContextCore<T: HoldsCacheTransaction> {
    transaction: Arc<Mutex<T>>,
    affected_keys: HashSet<T::Key>,
    completed: bool,
    topology: Option<Arc<CacheTopology>>,
}

impl<T: HoldsCacheTransaction> TxContextCore<T> {
    pub(crate) fn new(transaction: Arc<Mutex<T>>, topology: Option<Arc<CacheTopology>>) -> Self {
        Self {
            transaction,
            affected_keys: HashSet::new(),
            completed: false,
            topology,
        }
    }

    pub(crate) fn transaction(&self) -> &Arc<Mutex<T>> {
        &self.transaction
    }

    pub(crate) fn topology(&self) -> Option<&Arc<CacheTopology>> {
        self.topology.as_ref()
    }

    pub(crate) fn global_transaction(&self) -> GlobalTransaction {
        self.transaction.lock().cache_tx().global_transaction()
    }

    pub(crate) fn lookup_entry(&self, key: &T::Key) -> Option<T::Entry>
    where
        T::Entry: Clone,
    {
        self.transaction.lock().cache_tx().looked_up_entries().get(key).cloned()
    }

    /// Every looked-up key is also an affected key.
    pub(crate) fn put_looked_up_entry(&mut self, key: T::Key, entry: T::Entry) {
        self.affected_keys.insert(key.clone());
        self.transaction
            .lock()
            .cache_tx_mut()
            .looked_up_entries_mut()
            .put(key, entry);
    }

    pub(crate) fn remove_looked_up_entry(&mut self, key: &T::Key) -> Option<T::Entry> {
        self.transaction.lock().cache_tx_mut().looked_up_entries_mut().remove(key)
    }

    pub(crate) fn clear_looked_up_entries(&mut self) {
        self.transaction.lock().cache_tx_mut().looked_up_entries_mut().clear();
    }

    pub(crate) fn looked_up_keys(&self) -> Vec<T::Key> {
        self.transaction.lock().cache_tx().looked_up_entries().keys().cloned().collect()
    }

    pub(crate) fn add_affected_key(&mut self, key: T::Key) {
        self.affected_keys.insert(key);
    }

    pub(crate) fn affected_keys(&self) -> &HashSet<T::Key> {
        &self.affected_keys
    }

    pub(crate) fn has_modifications(&self) -> bool {
        self.transaction.lock().cache_tx().has_modifications()
    }

    pub(crate) fn modifications(&self) -> Vec<Modification<T::Key>> {
        self.transaction.lock().cache_tx().modifications().to_vec()
    }

    pub(crate) fn add_modification(&mut self, modification: Modification<T::Key>) -> Result<()> {
        if self.completed {
            return Err(TransactionError::ContextCompleted);
        }
        self.transaction.lock().cache_tx_mut().add_modification(modification);
        Ok(())
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed
    }
}

impl<T: HoldsCacheTransaction + Clone> Clone for TxContextCore<T> {
    /// Copies the transaction into a fresh cell and the affected keys into a
    /// fresh set. The topology snapshot is immutable and stays shared, as does
    /// a remote transaction's status cell.
    fn clone(&self) -> Self {
        Self {
            transaction: Arc::new(Mutex::new(self.transaction.lock().clone())),
            affected_keys: self.affected_keys.clone(),
            completed: self.completed,
            topology: self.topology.clone(),
        }
    }
}
