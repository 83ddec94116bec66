//! In-process transport.
//!
//! A [`LoopbackNetwork`] connects any number of [`LoopbackTransport`]s
//! living in the same process. Every command is pushed through the
//! configured [`Marshaller`] on its way, so payloads take the same
//! serialize/deserialize path they would over a real wire. Used to embed a
//! cluster in tests and single-process deployments.

use anyhow::anyhow;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use corelib::Address;

use crate::command::RemoteCommand;
use crate::error::Result;
use crate::marshall::{BincodeMarshaller, Marshaller};
use crate::transport::{Recipients, RemoteCallCoordinator, Response, ResponseMode, Responses};

/// Applies commands received from other members.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, origin: Address, command: RemoteCommand) -> Response;
}

/// Shared registry of the members of an in-process cluster.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    members: Arc<DashMap<Address, Arc<dyn CommandHandler>>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` and return its transport endpoint.
    pub fn join(&self, address: Address, handler: Arc<dyn CommandHandler>) -> LoopbackTransport {
        self.members.insert(address, handler);
        LoopbackTransport {
            local: address,
            network: self.clone(),
            marshaller: Arc::new(BincodeMarshaller),
        }
    }

    pub fn leave(&self, address: &Address) -> bool {
        self.members.remove(address).is_some()
    }

    /// Current members, sorted by address.
    pub fn members(&self) -> Vec<Address> {
        let mut members: Vec<Address> = self.members.iter().map(|e| *e.key()).collect();
        members.sort();
        members
    }

    fn handler(&self, address: &Address) -> Option<Arc<dyn CommandHandler>> {
        self.members.get(address).map(|h| Arc::clone(h.value()))
    }
}

/// Transport endpoint of one member of a [`LoopbackNetwork`].
#[derive(Clone)]
pub struct LoopbackTransport {
    local: Address,
    network: LoopbackNetwork,
    marshaller: Arc<dyn Marshaller>,
}

impl LoopbackTransport {
    /// Replace the default bincode marshaller.
    pub fn with_marshaller(mut self, marshaller: Arc<dyn Marshaller>) -> Self {
        self.marshaller = marshaller;
        self
    }

    pub fn local_address(&self) -> Address {
        self.local
    }

    fn targets(&self, recipients: &Recipients) -> Vec<Address> {
        let targets = match recipients {
            Recipients::All => self.network.members(),
            Recipients::Only(addresses) => addresses.clone(),
        };
        targets.into_iter().filter(|a| *a != self.local).collect()
    }
}

impl RemoteCallCoordinator for LoopbackTransport {
    /// Delivery is synchronous and in-process, so `timeout` is never hit.
    fn invoke_remotely(
        &self,
        recipients: &Recipients,
        command: &RemoteCommand,
        mode: ResponseMode,
        _timeout: Duration,
    ) -> Result<Responses> {
        let payload = self.marshaller.marshal(command)?;
        let mut responses = Responses::new();

        for target in self.targets(recipients) {
            // Resolve the handler first so no map guard is held while it runs.
            let handler = match self.network.handler(&target) {
                Some(handler) => handler,
                None if mode == ResponseMode::Synchronous => {
                    return Err(anyhow!("{} is not a member of the cluster", target).into());
                }
                None => continue,
            };

            let delivered = self.marshaller.unmarshal(&payload)?;
            trace!(from = %self.local, to = %target, commands = delivered.len(), "delivering");
            let response = handler.handle(self.local, delivered);
            if mode.is_synchronous() {
                responses.insert(target, response);
            }
        }
        Ok(responses)
    }
}
