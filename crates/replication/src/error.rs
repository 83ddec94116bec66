//! Error types for the replication layer.

use corelib::Address;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for the replication layer.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors raised while queueing or sending replicated commands.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// `ReplicationQueue::add` was handed no command.
    #[error("cannot enqueue an absent command")]
    NullCommand,
    /// The transport failed to deliver a command.
    #[error("transport failure: {0}")]
    Transport(#[from] anyhow::Error),
    /// No response arrived within the configured timeout.
    #[error("timed out after {0:?} waiting for responses")]
    Timeout(Duration),
    /// A recipient reported an exception while applying the command.
    #[error("{address} failed applying command: {message}")]
    RemoteException { address: Address, message: String },
    #[error("marshalling failed: {0}")]
    Marshalling(String),
    /// Owner resolution failed (e.g. no topology installed yet).
    #[error(transparent)]
    Routing(#[from] corelib::Error),
    /// The background flush thread could not be started.
    #[error("failed to start flush scheduler: {0}")]
    Scheduler(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<bincode::Error> for ReplicationError {
    fn from(err: bincode::Error) -> Self {
        ReplicationError::Marshalling(err.to_string())
    }
}
