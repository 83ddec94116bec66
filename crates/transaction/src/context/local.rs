//! Context of a transaction started on this member.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use corelib::CacheTopology;

use super::{InvocationContext, LockOwner, TxContextCore, TxInvocationContext};
use crate::error::Result;
use crate::global::GlobalTransaction;
use crate::manager::{Transaction, TransactionManager, TxStatus};
use crate::transaction::{LocalTransaction, Modification};

/// Context of an operation in a transaction started on this member.
pub struct LocalTxInvocationContext<K: Eq + Hash + Clone, E> {
    core: TxContextCore<LocalTransaction<K, E>>,
    manager: Arc<dyn TransactionManager>,
}

impl<K: Eq + Hash + Clone, E> LocalTxInvocationContext<K, E> {
    pub fn new(
        transaction: Arc<Mutex<LocalTransaction<K, E>>>,
        manager: Arc<dyn TransactionManager>,
        topology: Option<Arc<CacheTopology>>,
    ) -> Self {
        Self {
            core: TxContextCore::new(transaction, topology),
            manager,
        }
    }

    pub fn local_transaction(&self) -> &Arc<Mutex<LocalTransaction<K, E>>> {
        self.core.transaction()
    }
}

impl<K: Eq + Hash + Clone, E: Clone> Clone for LocalTxInvocationContext<K, E> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<K: Eq + Hash + Clone, E: Clone> InvocationContext<K, E> for LocalTxInvocationContext<K, E> {
    fn is_origin_local(&self) -> bool {
        true
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

impl<K: Eq + Hash + Clone, E: Clone> TxInvocationContext<K, E> for LocalTxInvocationContext<K, E> {
    fn global_transaction(&self) -> GlobalTransaction {
        self.core.global_transaction()
    }

    fn running_transaction(&self) -> Result<Transaction> {
        Ok(self.core.transaction().lock().transaction())
    }

    fn transaction_status(&self) -> Result<TxStatus> {
        let transaction = self.core.transaction().lock().transaction();
        self.manager.status(&transaction)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::assert_transaction_valid;
    use crate::error::TransactionError;
    use crate::manager::EmbeddedTransactionManager;
    use corelib::Address;

    struct FailingManager;

    impl TransactionManager for FailingManager {
        fn status(&self, _transaction: &Transaction) -> Result<TxStatus> {
            Err(TransactionError::StatusQuery("manager unavailable".into()))
        }
    }

    fn context(manager: Arc<dyn TransactionManager>, tx: Transaction) -> LocalTxInvocationContext<String, u32> {
        let gtx = GlobalTransaction::new(Address(1), 1);
        let local = Arc::new(Mutex::new(LocalTransaction::new(tx, gtx, 1)));
        LocalTxInvocationContext::new(local, manager, None)
    }

    #[test]
    fn test_clone_isolates_affected_keys() {
        let tm = Arc::new(EmbeddedTransactionManager::new());
        let tx = tm.begin();
        let mut original = context(tm, tx);
        original.add_affected_keys(["a".to_string(), "b".to_string()]);

        let mut clone = original.clone();
        clone.add_affected_key("c".to_string());

        let expected: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(original.affected_keys(), &expected);
        assert_eq!(clone.affected_keys().len(), 3);
    }

    #[test]
    fn test_clone_isolates_looked_up_entries() {
        let tm = Arc::new(EmbeddedTransactionManager::new());
        let tx = tm.begin();
        let mut original = context(tm, tx);
        original.put_looked_up_entry("a".into(), 1);

        let mut clone = original.clone();
        clone.put_looked_up_entry("b".into(), 2);
        clone.remove_looked_up_entry(&"a".to_string());

        assert_eq!(original.looked_up_keys(), vec!["a".to_string()]);
        assert_eq!(clone.looked_up_keys(), vec!["b".to_string()]);
    }

    #[test]
    fn test_put_looked_up_entry_marks_key_affected() {
        let tm = Arc::new(EmbeddedTransactionManager::new());
        let tx = tm.begin();
        let mut ctx = context(tm, tx);
        ctx.put_looked_up_entry("k".into(), 7);
        assert!(ctx.affected_keys().contains("k"));
        assert_eq!(ctx.lookup_entry(&"k".to_string()), Some(7));
    }

    #[test]
    fn test_status_failure_is_invalid() {
        let ctx = context(Arc::new(FailingManager), Transaction::new(1));
        assert!(!ctx.is_valid_running_tx());
        match assert_transaction_valid(&ctx) {
            Err(TransactionError::InvalidTransaction { status, cause, .. }) => {
                assert_eq!(status, None);
                assert!(cause.unwrap().contains("manager unavailable"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validity_follows_status() {
        let tm = Arc::new(EmbeddedTransactionManager::new());
        let tx = tm.begin();
        let ctx = context(tm.clone(), tx);
        assert!(ctx.is_valid_running_tx());

        tm.set_status(&tx, TxStatus::Preparing).unwrap();
        assert!(assert_transaction_valid(&ctx).is_ok());

        tm.mark_rollback_only(&tx).unwrap();
        assert!(!ctx.is_valid_running_tx());
        assert!(matches!(
            assert_transaction_valid(&ctx),
            Err(TransactionError::InvalidTransaction {
                status: Some(TxStatus::MarkedRollback),
                ..
            })
        ));
    }

    #[test]
    fn test_completed_context_rejects_work() {
        let tm = Arc::new(EmbeddedTransactionManager::new());
        let tx = tm.begin();
        let mut ctx = context(tm, tx);
        ctx.add_modification(Modification::Put("k".into())).unwrap();
        assert!(ctx.has_modifications());

        ctx.mark_completed();
        assert_eq!(
            ctx.add_modification(Modification::Clear),
            Err(TransactionError::ContextCompleted)
        );
        assert_eq!(assert_transaction_valid(&ctx), Err(TransactionError::ContextCompleted));

        // Cleanup after completion still releases the lookup bookkeeping.
        ctx.put_looked_up_entry("k".into(), 1);
        ctx.clear_looked_up_entries();
        assert!(ctx.looked_up_keys().is_empty());
        assert_eq!(ctx.modifications(), vec![Modification::Put("k".to_string())]);
    }

    #[test]
    fn test_running_transaction_is_exposed() {
        let tm = Arc::new(EmbeddedTransactionManager::new());
        let tx = tm.begin();
        let ctx = context(tm, tx);
        assert_eq!(ctx.running_transaction().unwrap(), tx);
        assert!(ctx.is_origin_local());
    }
}
