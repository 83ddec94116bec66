//! Transactional invocation contexts.
//!
//! This crate provides:
//! - The transaction manager contract and an embedded implementation
//! - Global transaction ids and the transaction table
//! - Local and remote cache transactions with their looked-up entries
//! - Invocation contexts and their factory

pub mod context;
pub mod entries;
pub mod error;
pub mod factory;
pub mod global;
pub mod manager;
pub mod table;
pub mod transaction;

pub use context::{
    assert_transaction_valid, InvocationContext, LocalTxInvocationContext, LockOwner,
    NonTxInvocationContext, RemoteTxInvocationContext, TxInvocationContext,
};
pub use entries::LookedUpEntries;
pub use error::{Result, TransactionError};
pub use factory::InvocationContextFactory;
pub use global::{GlobalTransaction, GlobalTransactionFactory};
pub use manager::{EmbeddedTransactionManager, Transaction, TransactionManager, TxStatus};
pub use table::{CompletedTransaction, TransactionTable};
pub use transaction::{CacheTransaction, LocalTransaction, Modification, RemoteTransaction};
