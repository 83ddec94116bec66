//! Transport contract.
//!
//! The replication layer never talks to the network itself. It hands
//! [`RemoteCommand`]s to a [`RemoteCallCoordinator`], which owns
//! connections, framing, self-delivery filtering and timeouts.

pub mod loopback;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use corelib::Address;

use crate::command::RemoteCommand;
use crate::error::{ReplicationError, Result};

pub use loopback::{CommandHandler, LoopbackTransport};

/// Who a remote call is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// Every member of the current view.
    All,
    Only(Vec<Address>),
}

/// How long the caller waits on a remote call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseMode {
    /// Wait for every recipient to answer.
    Synchronous,
    /// Wait for answers but drop recipients that leave the view meanwhile.
    SynchronousIgnoreLeavers,
    /// Fire-and-forget; no responses are collected.
    Asynchronous,
}

impl ResponseMode {
    pub fn is_synchronous(self) -> bool {
        self != ResponseMode::Asynchronous
    }
}

/// Answer of one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Applied; carries the previous value when the command returns one.
    Success(Option<Vec<u8>>),
    /// Not applied because a condition did not hold.
    Unsuccessful,
    /// Applying the command failed on the recipient.
    Exception(String),
}

impl Response {
    pub fn is_successful(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}

pub type Responses = HashMap<Address, Response>;

/// Performs remote invocations on behalf of the cache core.
pub trait RemoteCallCoordinator: Send + Sync {
    /// Send `command` to `recipients`.
    ///
    /// In [`ResponseMode::Asynchronous`] implementations return as soon as the
    /// command is handed off, with an empty response map.
    fn invoke_remotely(
        &self,
        recipients: &Recipients,
        command: &RemoteCommand,
        mode: ResponseMode,
        timeout: Duration,
    ) -> Result<Responses>;
}

/// Fail on the first recipient that answered with an exception.
pub fn validate_responses(responses: &Responses) -> Result<()> {
    // Sorted so the reported failure does not depend on map iteration order.
    let mut failures: Vec<_> = responses
        .iter()
        .filter_map(|(address, response)| match response {
            Response::Exception(message) => Some((*address, message)),
            _ => None,
        })
        .collect();
    failures.sort_by_key(|(address, _)| *address);

    match failures.first() {
        Some((address, message)) => Err(ReplicationError::RemoteException {
            address: *address,
            message: (*message).clone(),
        }),
        None => Ok(()),
    }
}
