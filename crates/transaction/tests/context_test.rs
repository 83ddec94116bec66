//! Integration tests for invocation contexts.
//!
//! # Test Strategy
//!
//! 1. **Factory**: contexts capture the installed topology and register transactions
//! 2. **Isolation**: clones never share mutable state with their source
//! 3. **Validity**: fail-closed status checks, remote capability restriction
//! 4. **Membership**: leaver cleanup driven by view changes, no resurrection

use corelib::{Address, ClusteringConfig, ConsistentHashRouter, MembershipListener};
use std::collections::HashSet;
use std::sync::Arc;
use transaction::{
    assert_transaction_valid, EmbeddedTransactionManager, GlobalTransaction, InvocationContext,
    InvocationContextFactory, LockOwner, Modification, Transaction, TransactionError,
    TransactionManager, TransactionTable, TxInvocationContext, TxStatus,
};

const A: Address = Address(0xA);
const B: Address = Address(0xB);
const C: Address = Address(0xC);

type Factory = InvocationContextFactory<Vec<u8>, Arc<String>>;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn setup(manager: Arc<dyn TransactionManager>) -> (Arc<ConsistentHashRouter>, Factory) {
    let router = Arc::new(ConsistentHashRouter::new(ClusteringConfig::new(60, 2)).unwrap());
    router.rebuild(&[A, B, C]).unwrap();
    let table = Arc::new(TransactionTable::new(A));
    let factory = InvocationContextFactory::new(Arc::clone(&router), manager, table);
    (router, factory)
}

// ============================================================================
// Factory Tests
// ============================================================================

#[test]
fn test_contexts_keep_their_topology() {
    init_logging();
    let tm = Arc::new(EmbeddedTransactionManager::new());
    let (router, factory) = setup(tm.clone());

    let ctx = factory.create_local_tx_context(tm.begin());
    let captured = Arc::clone(ctx.topology().unwrap());
    let owners_before = captured.owners_of(b"key").to_vec();

    router.rebuild(&[A, B]).unwrap();
    assert_eq!(ctx.topology().unwrap().topology_id(), 1);
    assert_eq!(captured.owners_of(b"key"), owners_before.as_slice());

    let fresh = factory.create_non_tx_context(true);
    assert_eq!(fresh.topology().unwrap().topology_id(), 2);
}

#[test]
fn test_contexts_of_one_transaction_share_it() {
    let tm = Arc::new(EmbeddedTransactionManager::new());
    let (_, factory) = setup(tm.clone());
    let tx = tm.begin();

    let mut first = factory.create_local_tx_context(tx);
    first.put_looked_up_entry(b"k".to_vec(), Arc::new("v".into()));
    first.add_modification(Modification::Put(b"k".to_vec())).unwrap();

    let second = factory.create_local_tx_context(tx);
    assert_eq!(second.lookup_entry(&b"k".to_vec()).as_deref().map(String::as_str), Some("v"));
    assert!(second.has_modifications());
    assert!(second.affected_keys().is_empty(), "affected keys belong to each context");
    assert_eq!(first.global_transaction(), second.global_transaction());
    assert_eq!(factory.transaction_table().local_count(), 1);
}

#[test]
fn test_non_tx_lock_owners_are_per_invocation() {
    let (_, factory) = setup(Arc::new(EmbeddedTransactionManager::new()));
    let a = factory.create_non_tx_context(true);
    let b = factory.create_non_tx_context(false);
    assert_ne!(a.lock_owner(), b.lock_owner());
    assert!(a.is_origin_local() && !b.is_origin_local());
}

// ============================================================================
// Isolation Tests
// ============================================================================

#[test]
fn test_clone_isolation() {
    let tm = Arc::new(EmbeddedTransactionManager::new());
    let (_, factory) = setup(tm.clone());
    let mut ctx = factory.create_local_tx_context(tm.begin());
    ctx.add_affected_keys(vec![b"a".to_vec(), b"b".to_vec()]);

    let mut branch = ctx.clone();
    branch.add_affected_key(b"c".to_vec());

    let expected: HashSet<Vec<u8>> = [b"a".to_vec(), b"b".to_vec()].into_iter().collect();
    assert_eq!(ctx.affected_keys(), &expected);
    assert_eq!(branch.affected_keys().len(), 3);
}

// ============================================================================
// Validity Tests
// ============================================================================

struct UnavailableManager;

impl TransactionManager for UnavailableManager {
    fn status(&self, _transaction: &Transaction) -> transaction::Result<TxStatus> {
        Err(TransactionError::StatusQuery("connection refused".into()))
    }
}

#[test]
fn test_status_failure_fails_closed() {
    init_logging();
    let (_, factory) = setup(Arc::new(UnavailableManager));
    let ctx = factory.create_local_tx_context(Transaction::new(1));
    assert!(!ctx.is_valid_running_tx());
    assert!(matches!(
        assert_transaction_valid(&ctx),
        Err(TransactionError::InvalidTransaction { status: None, cause: Some(_), .. })
    ));
}

#[test]
fn test_remote_contexts_have_no_running_transaction() {
    let (_, factory) = setup(Arc::new(EmbeddedTransactionManager::new()));
    for id in 0..20 {
        let gtx = GlobalTransaction::new(B, id);
        let mut ctx = factory.create_remote_tx_context(gtx);
        if id % 2 == 0 {
            ctx.put_looked_up_entry(vec![id as u8], Arc::new(String::new()));
        }
        if id % 3 == 0 {
            ctx.mark_completed();
        }
        assert_eq!(
            ctx.running_transaction(),
            Err(TransactionError::UnsupportedOperation(
                "remote transactions have no local transaction handle"
            ))
        );
        assert_eq!(ctx.lock_owner(), LockOwner::Transaction(gtx));
    }
}

// ============================================================================
// Membership Tests
// ============================================================================

#[test]
fn test_view_change_drops_leaver_transactions() {
    init_logging();
    let (_, factory) = setup(Arc::new(EmbeddedTransactionManager::new()));
    let from_b = factory.create_remote_tx_context(GlobalTransaction::new(B, 1));
    factory.create_remote_tx_context(GlobalTransaction::new(C, 1));

    let table = factory.transaction_table();
    table.on_view_changed(&[A, B]).unwrap();

    assert_eq!(table.remote_count(), 1);
    assert!(table.remote_transaction(&from_b.global_transaction()).is_some());
}

#[test]
fn test_leaver_rollback_reaches_cloned_contexts() {
    init_logging();
    let (_, factory) = setup(Arc::new(EmbeddedTransactionManager::new()));
    let gtx = GlobalTransaction::new(B, 1);
    let ctx = factory.create_remote_tx_context(gtx);
    let retry = ctx.clone();
    assert!(assert_transaction_valid(&retry).is_ok());

    factory.transaction_table().cleanup_leavers(&[A]);

    assert!(!ctx.is_valid_running_tx());
    assert!(!retry.is_valid_running_tx());
    assert!(matches!(
        assert_transaction_valid(&retry),
        Err(TransactionError::InvalidTransaction { status: Some(TxStatus::RolledBack), .. })
    ));
}

#[test]
fn test_late_command_for_dropped_transaction_is_invalid() {
    let (_, factory) = setup(Arc::new(EmbeddedTransactionManager::new()));
    let gtx = GlobalTransaction::new(B, 1);
    factory.create_remote_tx_context(gtx);
    let table = factory.transaction_table();
    table.on_view_changed(&[A, C]).unwrap();

    let late = factory.create_remote_tx_context(gtx);
    assert_eq!(table.remote_count(), 0);
    assert!(table.is_transaction_completed(&gtx));
    assert!(!late.is_valid_running_tx());
}
