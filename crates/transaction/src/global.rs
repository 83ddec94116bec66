//! Cluster-wide transaction identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use corelib::Address;

/// Globally unique id of a transaction, remote or local.
///
/// Doubles as the lock owner of transactional writes and as the key of the
/// remote transaction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalTransaction {
    origin: Address,
    id: u64,
}

impl GlobalTransaction {
    pub fn new(origin: Address, id: u64) -> Self {
        Self { origin, id }
    }

    /// Member the transaction was started on.
    pub fn origin(&self) -> Address {
        self.origin
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for GlobalTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalTx:{}:{}", self.origin, self.id)
    }
}

/// Issues ids for transactions started on the local member.
#[derive(Debug)]
pub struct GlobalTransactionFactory {
    local: Address,
    next_id: AtomicU64,
}

impl GlobalTransactionFactory {
    pub fn new(local: Address) -> Self {
        Self {
            local,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn local_address(&self) -> Address {
        self.local
    }

    pub fn next(&self) -> GlobalTransaction {
        GlobalTransaction::new(self.local, self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}
