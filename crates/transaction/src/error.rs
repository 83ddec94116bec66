//! Error types for transactional invocation.

use thiserror::Error;

use crate::global::GlobalTransaction;
use crate::manager::TxStatus;

/// Result type alias for transactional invocation.
pub type Result<T> = std::result::Result<T, TransactionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The transaction is neither active nor preparing, or its status
    /// could not be read.
    #[error("transaction {gtx} is not valid (status: {status:?}, cause: {cause:?})")]
    InvalidTransaction {
        gtx: GlobalTransaction,
        status: Option<TxStatus>,
        cause: Option<String>,
    },
    /// The context variant does not provide this capability.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    /// The transaction manager failed while reporting a status.
    #[error("transaction status query failed: {0}")]
    StatusQuery(String),
    /// The context already committed or rolled back.
    #[error("invocation context already completed")]
    ContextCompleted,
}
