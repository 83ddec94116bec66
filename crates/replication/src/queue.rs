//! Asynchronous replication queue.
//!
//! Commands of asynchronously replicated caches are buffered here and sent
//! to the whole cluster as one batch, either when the buffer reaches
//! `max_elements` or when the periodic flush timer fires.
//!
//! # Backpressure
//!
//! The queue never rejects an `add`. The producer whose command makes the
//! queue reach `max_elements` flushes inline before `add` returns, which
//! bounds growth without a hard capacity.
//!
//! # Delivery
//!
//! Each queued command is drained by exactly one flush. A failed flush is
//! logged and dropped: the batch is not re-queued and the error does not
//! reach producers or the timer thread. Callers relying on this queue get
//! at-most-once delivery and no feedback about failed batches.
//!
//! # Concurrency
//!
//! - **Buffer**: lock-free multi-producer/multi-consumer `SegQueue`
//! - **Drain**: pops at most the length observed when the flush started, so
//!   commands added during a drain land in this batch or the next, never both
//! - **Timer**: dedicated thread, stopped and joined by [`ReplicationQueue::stop`]

use crossbeam::channel::{self, Sender};
use crossbeam::queue::SegQueue;
use crossbeam::select;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::command::{RemoteCommand, ReplicableCommand};
use crate::config::{ReplicationConfig, ReplicationQueueConfig};
use crate::error::{ReplicationError, Result};
use crate::transport::{validate_responses, Recipients, RemoteCallCoordinator, ResponseMode};

/// Batching buffer for asynchronously replicated commands.
pub struct ReplicationQueue {
    shared: Arc<Shared>,
    timer: Mutex<Option<FlushTimer>>,
}

/// State reachable from both producers and the timer thread.
struct Shared {
    elements: SegQueue<ReplicableCommand>,
    config: ReplicationQueueConfig,
    transport: Arc<dyn RemoteCallCoordinator>,
    response_mode: ResponseMode,
    timeout: Duration,
}

struct FlushTimer {
    // Dropping the sender disconnects the channel, which stops the thread.
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl ReplicationQueue {
    pub fn new(config: &ReplicationConfig, transport: Arc<dyn RemoteCallCoordinator>) -> Self {
        Self {
            shared: Arc::new(Shared {
                elements: SegQueue::new(),
                config: config.queue.clone(),
                transport,
                response_mode: config.cache_mode.response_mode(),
                timeout: config.sync_timeout(),
            }),
            timer: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.config.enabled
    }

    pub fn max_elements(&self) -> usize {
        self.shared.config.max_elements
    }

    /// Start the periodic flush if the queue is enabled with a positive interval.
    ///
    /// Calling `start` on a running queue is a no-op.
    pub fn start(&self) -> Result<()> {
        let config = &self.shared.config;
        if !config.enabled || config.interval_millis == 0 {
            debug!(
                enabled = config.enabled,
                interval_millis = config.interval_millis,
                "replication queue timer not scheduled"
            );
            return Ok(());
        }

        let mut timer = self.timer.lock();
        if timer.is_some() {
            return Ok(());
        }

        let (stop, stopped) = channel::bounded::<()>(0);
        let ticks = channel::tick(config.interval());
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("replication-queue-flush".into())
            .spawn(move || loop {
                select! {
                    recv(stopped) -> _ => break,
                    recv(ticks) -> _ => {
                        shared.flush();
                    }
                }
            })?;

        *timer = Some(FlushTimer { stop, handle });
        debug!(
            interval_millis = config.interval_millis,
            max_elements = config.max_elements,
            "replication queue timer started"
        );
        Ok(())
    }

    /// Cancel the periodic flush and wait for the timer thread to exit.
    ///
    /// A flush already running on the timer thread completes; no new one
    /// starts. Queued commands are **not** flushed: call [`Self::flush`]
    /// first if they must reach the cluster.
    pub fn stop(&self) {
        let Some(FlushTimer { stop, handle }) = self.timer.lock().take() else {
            return;
        };
        drop(stop);
        if handle.join().is_err() {
            warn!("replication queue timer thread panicked");
        }
        debug!(
            pending = self.shared.elements.len(),
            "replication queue timer stopped"
        );
    }

    /// Append a command, flushing inline once the queue reaches `max_elements`.
    ///
    /// Accepts a command or an `Option`; `None` fails with
    /// [`ReplicationError::NullCommand`] and enqueues nothing.
    pub fn add(&self, command: impl Into<Option<ReplicableCommand>>) -> Result<()> {
        let command = command.into().ok_or(ReplicationError::NullCommand)?;
        self.shared.elements.push(command);
        if self.shared.elements.len() >= self.shared.config.max_elements {
            self.shared.flush();
        }
        Ok(())
    }

    /// Send everything queued so far as one batch. Returns the batch size.
    pub fn flush(&self) -> usize {
        self.shared.flush()
    }

    /// Discard queued commands without sending them. Returns how many were dropped.
    pub fn reset(&self) -> usize {
        let dropped = self.shared.drain().len();
        debug!(dropped, "replication queue reset");
        dropped
    }

    /// Approximate number of queued commands; for observability only.
    pub fn elements_count(&self) -> usize {
        self.shared.elements.len()
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }
}

impl Drop for ReplicationQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn drain(&self) -> Vec<ReplicableCommand> {
        let pending = self.elements.len();
        let mut batch = Vec::with_capacity(pending);
        while batch.len() < pending {
            match self.elements.pop() {
                Some(command) => batch.push(command),
                // A concurrent flush took the rest.
                None => break,
            }
        }
        batch
    }

    fn flush(&self) -> usize {
        let batch = self.drain();
        if batch.is_empty() {
            return 0;
        }

        let batch_size = batch.len();
        trace!(batch_size, "flushing replication queue");
        let command = RemoteCommand::Replicate(batch);
        let result = self
            .transport
            .invoke_remotely(&Recipients::All, &command, self.response_mode, self.timeout)
            .and_then(|responses| validate_responses(&responses));
        if let Err(error) = result {
            warn!(batch_size, %error, "failed replicating queued commands");
        }
        batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheMode;
    use crate::transport::Responses;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
        delivered: AtomicUsize,
        fail: AtomicBool,
    }

    impl RemoteCallCoordinator for CountingTransport {
        fn invoke_remotely(
            &self,
            recipients: &Recipients,
            command: &RemoteCommand,
            mode: ResponseMode,
            _timeout: Duration,
        ) -> Result<Responses> {
            assert_eq!(recipients, &Recipients::All);
            assert_eq!(mode, ResponseMode::Asynchronous);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("connection reset").into());
            }
            self.delivered.fetch_add(command.len(), Ordering::SeqCst);
            Ok(Responses::new())
        }
    }

    fn queue(max_elements: usize, interval_millis: u64) -> (ReplicationQueue, Arc<CountingTransport>) {
        let config = ReplicationConfig {
            cache_mode: CacheMode::ReplAsync,
            queue: ReplicationQueueConfig {
                enabled: true,
                max_elements,
                interval_millis,
            },
            ..ReplicationConfig::default()
        };
        let transport = Arc::new(CountingTransport::default());
        (ReplicationQueue::new(&config, transport.clone()), transport)
    }

    #[test]
    fn test_threshold_flushes_inline() {
        let (queue, transport) = queue(3, 0);
        queue.add(ReplicableCommand::put("a", "1")).unwrap();
        queue.add(ReplicableCommand::put("b", "2")).unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.elements_count(), 2);

        queue.add(ReplicableCommand::put("c", "3")).unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.delivered.load(Ordering::SeqCst), 3);
        assert_eq!(queue.elements_count(), 0);
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let (queue, transport) = queue(10, 0);
        assert_eq!(queue.flush(), 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_null_command_rejected() {
        let (queue, _) = queue(10, 0);
        let err = queue.add(None::<ReplicableCommand>).unwrap_err();
        assert!(matches!(err, ReplicationError::NullCommand));
        assert_eq!(queue.elements_count(), 0);
    }

    #[test]
    fn test_failed_flush_is_dropped() {
        let (queue, transport) = queue(10, 0);
        transport.fail.store(true, Ordering::SeqCst);
        queue.add(ReplicableCommand::Clear).unwrap();
        assert_eq!(queue.flush(), 1);
        assert_eq!(queue.elements_count(), 0, "failed batch is not re-queued");

        transport.fail.store(false, Ordering::SeqCst);
        queue.add(ReplicableCommand::Clear).unwrap();
        assert_eq!(queue.flush(), 1);
        assert_eq!(transport.delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_discards() {
        let (queue, transport) = queue(10, 0);
        queue.add(ReplicableCommand::Clear).unwrap();
        queue.add(ReplicableCommand::Clear).unwrap();
        assert_eq!(queue.reset(), 2);
        assert_eq!(queue.flush(), 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_start_skipped_without_interval() {
        let (queue, _) = queue(10, 0);
        queue.start().unwrap();
        assert!(!queue.is_running());
    }

    #[test]
    fn test_timer_flushes_and_stop_keeps_pending() {
        let (queue, transport) = queue(1000, 10);
        queue.start().unwrap();
        assert!(queue.is_running());

        queue.add(ReplicableCommand::put("k", "v")).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while transport.delivered.load(Ordering::SeqCst) == 0 {
            assert!(std::time::Instant::now() < deadline, "timer never flushed");
            thread::sleep(Duration::from_millis(5));
        }

        queue.stop();
        assert!(!queue.is_running());
        queue.add(ReplicableCommand::put("late", "v")).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.elements_count(), 1, "stopped timer must not flush");
    }
}
