//! Transaction manager contract.
//!
//! The cache does not manage transactions itself. It asks a
//! [`TransactionManager`] for the status of the transaction an operation
//! runs in, and only proceeds while that status is active or preparing.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, TransactionError};

/// Status reported by a transaction manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxStatus {
    Active,
    Preparing,
    Prepared,
    Committing,
    Committed,
    RollingBack,
    RolledBack,
    MarkedRollback,
    NoTransaction,
    Unknown,
}

impl TxStatus {
    /// Whether work may still be executed in the transaction.
    pub fn is_valid(self) -> bool {
        matches!(self, TxStatus::Active | TxStatus::Preparing)
    }

    pub fn is_completed(self) -> bool {
        matches!(self, TxStatus::Committed | TxStatus::RolledBack)
    }
}

/// Handle of a transaction owned by the local transaction manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transaction(u64);

impl Transaction {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Source of transaction status.
pub trait TransactionManager: Send + Sync {
    /// Current status of `transaction`.
    ///
    /// Implementations report lookup failures as
    /// [`TransactionError::StatusQuery`].
    fn status(&self, transaction: &Transaction) -> Result<TxStatus>;
}

/// In-process transaction manager for embedded use and tests.
#[derive(Debug, Default)]
pub struct EmbeddedTransactionManager {
    next_id: AtomicU64,
    transactions: DashMap<Transaction, TxStatus>,
}

impl EmbeddedTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Transaction {
        let transaction = Transaction(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.transactions.insert(transaction, TxStatus::Active);
        transaction
    }

    pub fn set_status(&self, transaction: &Transaction, status: TxStatus) -> Result<()> {
        match self.transactions.get_mut(transaction) {
            Some(mut current) => {
                *current = status;
                Ok(())
            }
            None => Err(unknown(transaction)),
        }
    }

    pub fn mark_rollback_only(&self, transaction: &Transaction) -> Result<()> {
        self.set_status(transaction, TxStatus::MarkedRollback)
    }

    pub fn commit(&self, transaction: &Transaction) -> Result<()> {
        self.set_status(transaction, TxStatus::Committed)
    }

    pub fn rollback(&self, transaction: &Transaction) -> Result<()> {
        self.set_status(transaction, TxStatus::RolledBack)
    }
}

impl TransactionManager for EmbeddedTransactionManager {
    fn status(&self, transaction: &Transaction) -> Result<TxStatus> {
        self.transactions
            .get(transaction)
            .map(|status| *status)
            .ok_or_else(|| unknown(transaction))
    }
}

fn unknown(transaction: &Transaction) -> TransactionError {
    TransactionError::StatusQuery(format!("unknown transaction {}", transaction.id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_statuses() {
        assert!(TxStatus::Active.is_valid());
        assert!(TxStatus::Preparing.is_valid());
        assert!(!TxStatus::Prepared.is_valid());
        assert!(!TxStatus::MarkedRollback.is_valid());
        assert!(!TxStatus::Unknown.is_valid());
    }

    #[test]
    fn test_embedded_lifecycle() {
        let tm = EmbeddedTransactionManager::new();
        let tx = tm.begin();
        assert_eq!(tm.status(&tx).unwrap(), TxStatus::Active);
        tm.commit(&tx).unwrap();
        assert_eq!(tm.status(&tx).unwrap(), TxStatus::Committed);
        assert!(matches!(
            tm.status(&Transaction::new(99)),
            Err(TransactionError::StatusQuery(_))
        ));
    }
}
