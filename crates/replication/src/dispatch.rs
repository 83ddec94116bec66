//! Routing of writes to the cluster.
//!
//! The dispatcher picks the path of every mutating command from the cache
//! mode:
//!
//! | Mode | Path |
//! |---|---|
//! | `Local` | not replicated |
//! | async, queue enabled | appended to the [`ReplicationQueue`] |
//! | async, no queue | sent fire-and-forget to the strategy's recipients |
//! | sync | sent to the strategy's recipients, responses validated |

use std::sync::Arc;
use tracing::trace;

use corelib::{CacheTopology, ConsistentHashRouter};

use crate::command::{RemoteCommand, ReplicableCommand};
use crate::config::ReplicationConfig;
use crate::error::Result;
use crate::queue::ReplicationQueue;
use crate::strategy::{self, ReplicationStrategy};
use crate::transport::{validate_responses, Recipients, RemoteCallCoordinator, Responses};

/// What happened to a dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The cache is local; nothing left this node.
    Local,
    /// Buffered in the replication queue.
    Queued,
    /// Handed to the transport without waiting for answers.
    Sent(Recipients),
    /// Applied by every recipient that answered.
    Acknowledged(Responses),
}

/// Sends writes to the members that must see them.
pub struct WriteDispatcher {
    config: ReplicationConfig,
    router: Arc<ConsistentHashRouter>,
    transport: Arc<dyn RemoteCallCoordinator>,
    queue: Option<Arc<ReplicationQueue>>,
    strategy: Box<dyn ReplicationStrategy>,
}

impl WriteDispatcher {
    /// Create a dispatcher. A replication queue is created (not started)
    /// when the configuration asks for one.
    pub fn new(
        config: ReplicationConfig,
        router: Arc<ConsistentHashRouter>,
        transport: Arc<dyn RemoteCallCoordinator>,
    ) -> Result<Self> {
        config.validate()?;
        let queue = config
            .uses_queue()
            .then(|| Arc::new(ReplicationQueue::new(&config, Arc::clone(&transport))));
        let strategy = strategy::for_mode(config.cache_mode);
        Ok(Self {
            config,
            router,
            transport,
            queue,
            strategy,
        })
    }

    pub fn queue(&self) -> Option<&Arc<ReplicationQueue>> {
        self.queue.as_ref()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Dispatch against the router's current topology.
    pub fn dispatch(&self, command: ReplicableCommand) -> Result<DispatchOutcome> {
        if !self.config.cache_mode.is_clustered() {
            return Ok(DispatchOutcome::Local);
        }
        let topology = self.router.topology()?;
        self.dispatch_in(&topology, command)
    }

    /// Dispatch against a snapshot captured earlier, e.g. by an in-flight
    /// invocation context.
    pub fn dispatch_in(
        &self,
        topology: &CacheTopology,
        command: ReplicableCommand,
    ) -> Result<DispatchOutcome> {
        let mode = self.config.cache_mode;
        if !mode.is_clustered() {
            return Ok(DispatchOutcome::Local);
        }

        if let Some(queue) = &self.queue {
            trace!(topology_id = topology.topology_id(), "queueing command");
            queue.add(command)?;
            return Ok(DispatchOutcome::Queued);
        }

        let recipients = self.strategy.recipients(topology, &command);
        trace!(
            topology_id = topology.topology_id(),
            strategy = self.strategy.name(),
            ?recipients,
            "sending command"
        );
        let remote = RemoteCommand::Single(command);
        let responses = self.transport.invoke_remotely(
            &recipients,
            &remote,
            mode.response_mode(),
            self.config.sync_timeout(),
        )?;

        if mode.is_synchronous() {
            validate_responses(&responses)?;
            Ok(DispatchOutcome::Acknowledged(responses))
        } else {
            Ok(DispatchOutcome::Sent(recipients))
        }
    }
}
