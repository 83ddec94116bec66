//! Creation of invocation contexts.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use corelib::{CacheTopology, ConsistentHashRouter};

use crate::context::{LocalTxInvocationContext, NonTxInvocationContext, RemoteTxInvocationContext};
use crate::global::GlobalTransaction;
use crate::manager::{Transaction, TransactionManager};
use crate::table::TransactionTable;

/// Builds contexts bound to the topology installed at creation time.
///
/// A context keeps routing against its captured snapshot even if the router
/// installs a newer topology while the operation runs.
pub struct InvocationContextFactory<K, E> {
    router: Arc<ConsistentHashRouter>,
    manager: Arc<dyn TransactionManager>,
    table: Arc<TransactionTable<K, E>>,
    next_invocation: AtomicU64,
}

impl<K: Eq + Hash + Clone, E> InvocationContextFactory<K, E> {
    pub fn new(
        router: Arc<ConsistentHashRouter>,
        manager: Arc<dyn TransactionManager>,
        table: Arc<TransactionTable<K, E>>,
    ) -> Self {
        Self {
            router,
            manager,
            table,
            next_invocation: AtomicU64::new(1),
        }
    }

    pub fn transaction_table(&self) -> &Arc<TransactionTable<K, E>> {
        &self.table
    }

    pub fn create_non_tx_context(&self, origin_local: bool) -> NonTxInvocationContext<K, E> {
        let invocation_id = self.next_invocation.fetch_add(1, Ordering::Relaxed);
        NonTxInvocationContext::new(origin_local, invocation_id, self.router.current_topology())
    }

    /// Context for an operation of `transaction`, registering it on first use.
    pub fn create_local_tx_context(&self, transaction: Transaction) -> LocalTxInvocationContext<K, E> {
        let topology = self.router.current_topology();
        let local = self.table.get_or_create_local(transaction, topology_id(&topology));
        LocalTxInvocationContext::new(local, Arc::clone(&self.manager), topology)
    }

    /// Context for a command of `gtx` received from its originator.
    pub fn create_remote_tx_context(&self, gtx: GlobalTransaction) -> RemoteTxInvocationContext<K, E> {
        let topology = self.router.current_topology();
        let remote = self.table.get_or_create_remote(gtx, topology_id(&topology));
        RemoteTxInvocationContext::new(remote, topology)
    }
}

fn topology_id(topology: &Option<Arc<CacheTopology>>) -> u64 {
    topology.as_ref().map_or(0, |t| t.topology_id())
}
