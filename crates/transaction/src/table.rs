//! Registry of running transactions.
//!
//! Local transactions are indexed by their transaction manager handle and
//! by global id; remote transactions by global id. Lookups and
//! registrations are safe from any thread: concurrent `get_or_create`
//! calls for the same transaction all receive the same instance.
//!
//! Remote transactions that finished (committed, rolled back, or dropped
//! because their originator left) are remembered until pruned. A late
//! command for one of them gets a transaction already in its final status
//! instead of a fresh active one, so invocation contexts built on it fail
//! validation.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, trace};

use corelib::{Address, MembershipListener};

use crate::global::{GlobalTransaction, GlobalTransactionFactory};
use crate::manager::{Transaction, TxStatus};
use crate::transaction::{LocalTransaction, RemoteTransaction};

pub type SharedLocalTransaction<K, E> = Arc<Mutex<LocalTransaction<K, E>>>;
pub type SharedRemoteTransaction<K, E> = Arc<Mutex<RemoteTransaction<K, E>>>;

pub struct TransactionTable<K, E> {
    ids: GlobalTransactionFactory,
    local: DashMap<Transaction, SharedLocalTransaction<K, E>>,
    global_to_local: DashMap<GlobalTransaction, Transaction>,
    remote: DashMap<GlobalTransaction, SharedRemoteTransaction<K, E>>,
    completed: DashMap<GlobalTransaction, CompletedTransaction>,
}

/// Final state of a remote transaction no longer registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedTransaction {
    pub status: TxStatus,
    /// Topology the transaction started under.
    pub topology_id: u64,
}

impl<K: Eq + Hash + Clone, E> TransactionTable<K, E> {
    /// Table of the member at `local`, which originates new global ids.
    pub fn new(local: Address) -> Self {
        Self {
            ids: GlobalTransactionFactory::new(local),
            local: DashMap::new(),
            global_to_local: DashMap::new(),
            remote: DashMap::new(),
            completed: DashMap::new(),
        }
    }

    pub fn local_address(&self) -> Address {
        self.ids.local_address()
    }

    /// Cache-side state of `transaction`, registered on first use under a
    /// fresh global id.
    pub fn get_or_create_local(&self, transaction: Transaction, topology_id: u64) -> SharedLocalTransaction<K, E> {
        let entry = self.local.entry(transaction).or_insert_with(|| {
            let gtx = self.ids.next();
            trace!(%gtx, transaction = transaction.id(), "registered local transaction");
            self.global_to_local.insert(gtx, transaction);
            Arc::new(Mutex::new(LocalTransaction::new(transaction, gtx, topology_id)))
        });
        Arc::clone(entry.value())
    }

    pub fn local_transaction(&self, transaction: &Transaction) -> Option<SharedLocalTransaction<K, E>> {
        self.local.get(transaction).map(|entry| Arc::clone(entry.value()))
    }

    pub fn local_transaction_by_global(&self, gtx: &GlobalTransaction) -> Option<SharedLocalTransaction<K, E>> {
        let transaction = *self.global_to_local.get(gtx)?;
        self.local_transaction(&transaction)
    }

    pub fn remove_local(&self, transaction: &Transaction) -> Option<SharedLocalTransaction<K, E>> {
        let (_, removed) = self.local.remove(transaction)?;
        let gtx = removed.lock().cache_transaction().global_transaction();
        self.global_to_local.remove(&gtx);
        Some(removed)
    }

    /// Cache-side state of remote `gtx`, registered on first use.
    ///
    /// A transaction that already completed is not registered again: the
    /// caller receives a detached copy in its final status.
    pub fn get_or_create_remote(&self, gtx: GlobalTransaction, topology_id: u64) -> SharedRemoteTransaction<K, E> {
        match self.remote.entry(gtx) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                if let Some(done) = self.completed_transaction(&gtx) {
                    debug!(%gtx, status = ?done.status, "command for completed transaction");
                    return Arc::new(Mutex::new(RemoteTransaction::with_status(
                        gtx,
                        done.topology_id,
                        done.status,
                    )));
                }
                trace!(%gtx, "registered remote transaction");
                let remote = Arc::new(Mutex::new(RemoteTransaction::new(gtx, topology_id)));
                entry.insert(Arc::clone(&remote));
                remote
            }
        }
    }

    pub fn remote_transaction(&self, gtx: &GlobalTransaction) -> Option<SharedRemoteTransaction<K, E>> {
        self.remote.get(gtx).map(|entry| Arc::clone(entry.value()))
    }

    /// Unregister remote `gtx` and remember it as completed. A transaction
    /// removed while still valid is rolled back.
    pub fn remove_remote(&self, gtx: &GlobalTransaction) -> Option<SharedRemoteTransaction<K, E>> {
        let remote = self.remote_transaction(gtx)?;
        let (status, topology_id) = {
            let remote = remote.lock();
            (remote.status(), remote.cache_transaction().topology_id())
        };
        let status = if status.is_valid() { TxStatus::RolledBack } else { status };
        self.finish_remote(*gtx, status, topology_id)
    }

    /// Set the final `status` of remote `gtx`, unregister it and remember it
    /// as completed.
    pub fn mark_remote_completed(&self, gtx: GlobalTransaction, status: TxStatus) -> Option<SharedRemoteTransaction<K, E>> {
        let topology_id = self
            .remote_transaction(&gtx)?
            .lock()
            .cache_transaction()
            .topology_id();
        self.finish_remote(gtx, status, topology_id)
    }

    // The completion record goes in before the registration is dropped, so a
    // concurrent get_or_create_remote either sees the registered transaction
    // or the record.
    fn finish_remote(&self, gtx: GlobalTransaction, status: TxStatus, topology_id: u64) -> Option<SharedRemoteTransaction<K, E>> {
        self.completed
            .insert(gtx, CompletedTransaction { status, topology_id });
        let (_, removed) = self.remote.remove(&gtx)?;
        removed.lock().set_status(status);
        trace!(%gtx, ?status, "completed remote transaction");
        Some(removed)
    }

    pub fn is_transaction_completed(&self, gtx: &GlobalTransaction) -> bool {
        self.completed.contains_key(gtx)
    }

    pub fn completed_transaction(&self, gtx: &GlobalTransaction) -> Option<CompletedTransaction> {
        self.completed.get(gtx).map(|entry| *entry.value())
    }

    /// Forget completed transactions that started before `topology_id`.
    /// Returns how many records were dropped.
    pub fn prune_completed(&self, topology_id: u64) -> usize {
        let before = self.completed.len();
        self.completed.retain(|_, done| done.topology_id >= topology_id);
        before.saturating_sub(self.completed.len())
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn local_count(&self) -> usize {
        self.local.len()
    }

    pub fn remote_count(&self) -> usize {
        self.remote.len()
    }

    /// Smallest topology id any registered transaction started under.
    pub fn min_topology_id(&self) -> Option<u64> {
        let local = self
            .local
            .iter()
            .map(|entry| entry.value().lock().cache_transaction().topology_id());
        let remote = self
            .remote
            .iter()
            .map(|entry| entry.value().lock().cache_transaction().topology_id());
        local.chain(remote).min()
    }

    /// Roll back and drop remote transactions whose originator is not in
    /// `members`, remembering them as completed. Returns how many were dropped.
    pub fn cleanup_leavers(&self, members: &[Address]) -> usize {
        let members: HashSet<Address> = members.iter().copied().collect();
        let leavers: Vec<GlobalTransaction> = self
            .remote
            .iter()
            .map(|entry| *entry.key())
            .filter(|gtx| !members.contains(&gtx.origin()))
            .collect();

        let mut dropped = 0;
        for gtx in leavers {
            if self.mark_remote_completed(gtx, TxStatus::RolledBack).is_some() {
                debug!(%gtx, origin = %gtx.origin(), "rolled back transaction of departed originator");
                dropped += 1;
            }
        }
        dropped
    }
}

impl<K, E> MembershipListener for TransactionTable<K, E>
where
    K: Eq + Hash + Clone + Send + Sync,
    E: Send + Sync,
{
    fn on_view_changed(&self, members: &[Address]) -> corelib::Result<()> {
        self.cleanup_leavers(members);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Table = TransactionTable<String, u32>;

    #[test]
    fn test_local_registration_is_idempotent() {
        let table = Table::new(Address(1));
        let tx = Transaction::new(5);
        let first = table.get_or_create_local(tx, 1);
        let second = table.get_or_create_local(tx, 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(table.local_count(), 1);

        let gtx = first.lock().cache_transaction().global_transaction();
        assert_eq!(gtx.origin(), Address(1));
        assert!(table.local_transaction_by_global(&gtx).is_some());

        assert!(table.remove_local(&tx).is_some());
        assert!(table.local_transaction_by_global(&gtx).is_none());
    }

    #[test]
    fn test_cleanup_leavers() {
        let table = Table::new(Address(1));
        let from_b = GlobalTransaction::new(Address(2), 1);
        let from_c = GlobalTransaction::new(Address(3), 1);
        table.get_or_create_remote(from_b, 1);
        let orphan = table.get_or_create_remote(from_c, 1);

        assert_eq!(table.cleanup_leavers(&[Address(1), Address(2)]), 1);
        assert_eq!(table.remote_count(), 1);
        assert!(table.remote_transaction(&from_b).is_some());
        assert!(table.remote_transaction(&from_c).is_none());
        assert_eq!(orphan.lock().status(), TxStatus::RolledBack);
    }

    #[test]
    fn test_leaver_transaction_is_not_resurrected() {
        let table = Table::new(Address(1));
        let gtx = GlobalTransaction::new(Address(2), 1);
        table.get_or_create_remote(gtx, 4);
        assert_eq!(table.cleanup_leavers(&[Address(1)]), 1);
        assert!(table.is_transaction_completed(&gtx));

        let late = table.get_or_create_remote(gtx, 6);
        assert_eq!(late.lock().status(), TxStatus::RolledBack);
        assert_eq!(late.lock().cache_transaction().topology_id(), 4);
        assert_eq!(table.remote_count(), 0);
    }

    #[test]
    fn test_remove_remote_records_completion() {
        let table = Table::new(Address(1));
        let committed = GlobalTransaction::new(Address(2), 1);
        let abandoned = GlobalTransaction::new(Address(2), 2);
        table.get_or_create_remote(committed, 1);
        let handle = table.get_or_create_remote(abandoned, 3);

        assert!(table.mark_remote_completed(committed, TxStatus::Committed).is_some());
        assert!(table.remove_remote(&abandoned).is_some());
        assert!(table.remove_remote(&abandoned).is_none());

        assert_eq!(handle.lock().status(), TxStatus::RolledBack);
        assert_eq!(
            table.completed_transaction(&committed),
            Some(CompletedTransaction {
                status: TxStatus::Committed,
                topology_id: 1
            })
        );
        assert_eq!(table.get_or_create_remote(committed, 5).lock().status(), TxStatus::Committed);

        assert_eq!(table.prune_completed(2), 1);
        assert!(!table.is_transaction_completed(&committed));
        assert!(table.is_transaction_completed(&abandoned));
        assert!(table.get_or_create_remote(committed, 5).lock().status().is_valid());
    }

    #[test]
    fn test_min_topology_id() {
        let table = Table::new(Address(1));
        assert_eq!(table.min_topology_id(), None);
        table.get_or_create_local(Transaction::new(1), 4);
        table.get_or_create_remote(GlobalTransaction::new(Address(2), 1), 3);
        assert_eq!(table.min_topology_id(), Some(3));
    }

    #[test]
    fn test_view_change_cleans_up() {
        let table = Table::new(Address(1));
        table.get_or_create_remote(GlobalTransaction::new(Address(9), 1), 1);
        table.on_view_changed(&[Address(1)]).unwrap();
        assert_eq!(table.remote_count(), 0);
    }
}
