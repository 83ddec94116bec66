//! Replication configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ReplicationError, Result};
use crate::transport::ResponseMode;

pub const DEFAULT_MAX_ELEMENTS: usize = 500;
pub const DEFAULT_INTERVAL_MILLIS: u64 = 5000;
pub const DEFAULT_SYNC_TIMEOUT_MILLIS: u64 = 15_000;

/// How a cache spreads writes across the cluster.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// No remote replication.
    Local,
    /// Every member holds every entry; writes wait for acknowledgment.
    #[default]
    ReplSync,
    /// Every member holds every entry; writes are fire-and-forget.
    ReplAsync,
    /// Entries live on their segment owners; writes wait for acknowledgment.
    DistSync,
    /// Entries live on their segment owners; writes are fire-and-forget.
    DistAsync,
}

impl CacheMode {
    pub fn is_clustered(self) -> bool {
        self != CacheMode::Local
    }

    pub fn is_synchronous(self) -> bool {
        matches!(self, CacheMode::ReplSync | CacheMode::DistSync)
    }

    pub fn is_distributed(self) -> bool {
        matches!(self, CacheMode::DistSync | CacheMode::DistAsync)
    }

    /// Response mode used for remote calls made on behalf of this cache.
    pub fn response_mode(self) -> ResponseMode {
        if self.is_synchronous() {
            ResponseMode::Synchronous
        } else {
            ResponseMode::Asynchronous
        }
    }
}

/// Settings of the asynchronous replication queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationQueueConfig {
    /// Master switch; a disabled queue never schedules a flush timer.
    pub enabled: bool,
    /// Queue length that triggers an inline flush.
    pub max_elements: usize,
    /// Period of the background flush; 0 disables the timer.
    pub interval_millis: u64,
}

impl Default for ReplicationQueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_elements: DEFAULT_MAX_ELEMENTS,
            interval_millis: DEFAULT_INTERVAL_MILLIS,
        }
    }
}

impl ReplicationQueueConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    pub cache_mode: CacheMode,
    /// Timeout handed to the transport for remote calls.
    pub sync_timeout_millis: u64,
    pub queue: ReplicationQueueConfig,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            cache_mode: CacheMode::default(),
            sync_timeout_millis: DEFAULT_SYNC_TIMEOUT_MILLIS,
            queue: ReplicationQueueConfig::default(),
        }
    }
}

impl ReplicationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ReplicationConfig = serde_json::from_str(json)
            .map_err(|e| ReplicationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue.max_elements == 0 {
            return Err(ReplicationError::InvalidConfig(
                "queue.max_elements must be positive".into(),
            ));
        }
        if self.queue.enabled && self.cache_mode.is_synchronous() {
            return Err(ReplicationError::InvalidConfig(format!(
                "the replication queue requires an asynchronous cache mode, got {:?}",
                self.cache_mode
            )));
        }
        Ok(())
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_millis)
    }

    /// True when asynchronous writes should go through the queue.
    pub fn uses_queue(&self) -> bool {
        self.queue.enabled && !self.cache_mode.is_synchronous()
    }
}
