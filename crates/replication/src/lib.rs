//! Replication of cache writes to the cluster.
//!
//! This crate provides:
//! - Replicable commands and the batched remote command
//! - The transport contract (`RemoteCallCoordinator`) and an in-process transport
//! - Payload marshalling
//! - The asynchronous replication queue
//! - Replication strategies and the write dispatcher

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod marshall;
pub mod queue;
pub mod strategy;
pub mod transport;

pub use command::{RemoteCommand, ReplicableCommand};
pub use config::{CacheMode, ReplicationConfig, ReplicationQueueConfig};
pub use dispatch::{DispatchOutcome, WriteDispatcher};
pub use error::{ReplicationError, Result};
pub use marshall::{BincodeMarshaller, Marshaller};
pub use queue::ReplicationQueue;
pub use strategy::{DistributedStrategy, ReplicatedStrategy, ReplicationStrategy};
pub use transport::{
    loopback::LoopbackNetwork, CommandHandler, LoopbackTransport, Recipients,
    RemoteCallCoordinator, Response, ResponseMode, Responses,
};
