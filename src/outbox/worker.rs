//! Background thread driving an [`OutboxRelay`] on a fixed interval.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::broker::Publisher;

use super::relay::{OutboxRelay, TickStats};
use super::store::OutboxStore;

/// Totals accumulated over the worker's lifetime.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub ticks: usize,
    pub published: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    pub mark_failures: usize,
}

impl WorkerStats {
    fn absorb(&mut self, tick: TickStats) {
        self.published += tick.published;
        self.failed += tick.failed;
        self.dead_lettered += tick.dead_lettered;
        self.mark_failures += tick.mark_failures;
    }
}

/// A background thread that relays pending outbox records once per
/// interval.
///
/// Stopping never interrupts a publish in progress: the loop notices the
/// signal between records or between ticks.
///
/// ## Example
///
/// ```no_run
/// use order_outbox::broker::Broker;
/// use order_outbox::outbox::{InMemoryOutbox, OutboxRelay, RelayWorker};
/// use std::time::Duration;
///
/// let relay = OutboxRelay::new(InMemoryOutbox::new(), Broker::new());
/// let worker = RelayWorker::start(relay, Duration::from_secs(1)).unwrap();
///
/// // ... append records ...
///
/// let stats = worker.stop();
/// println!("published {} records", stats.published);
/// ```
pub struct RelayWorker {
    stop_flag: Arc<AtomicBool>,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl RelayWorker {
    /// Spawn the relay loop. The first pass runs after one `poll_interval`.
    pub fn start<S, P>(relay: OutboxRelay<S, P>, poll_interval: Duration) -> io::Result<Self>
    where
        S: OutboxStore + 'static,
        P: Publisher + 'static,
    {
        let (stop_tx, stop_rx) = channel();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop_flag);

        let handle = thread::Builder::new()
            .name("outbox-relay".to_string())
            .spawn(move || {
                let mut stats = WorkerStats::default();
                info!(interval = ?poll_interval, "outbox relay started");

                loop {
                    match stop_rx.recv_timeout(poll_interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    stats.ticks += 1;
                    match relay.tick_until(|| flag.load(Ordering::Acquire)) {
                        Ok(tick) => stats.absorb(tick),
                        Err(e) => error!(error = %e, "failed to list pending outbox records"),
                    }
                }

                info!(
                    ticks = stats.ticks,
                    published = stats.published,
                    failed = stats.failed,
                    "outbox relay stopped"
                );
                stats
            })?;

        Ok(Self {
            stop_flag,
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Signal the loop to stop without waiting for it.
    pub fn signal_stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        let _ = self.stop_tx.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Signal the loop to stop and wait for the current pass to finish.
    pub fn stop(mut self) -> WorkerStats {
        self.signal_stop();
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                error!("outbox relay thread panicked");
                WorkerStats::default()
            }),
            None => WorkerStats::default(),
        }
    }
}

impl Drop for RelayWorker {
    fn drop(&mut self) {
        self.signal_stop();
        // Don't join on drop - let the thread finish naturally
    }
}
