//! Fan-out of notifications to a pool of workers.
//!
//! Notifications arrive one per line. Each line is handed, round-robin, to
//! one worker's bounded inbox and handled start to finish by that worker, so
//! a single telemetry ID is never split across workers. Backpressure comes
//! from the inbox bound: the reader waits when the chosen worker is full.

use std::ops::AddAssign;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};
use crate::listener::{ListenerOutcome, NotificationListener};

/// Counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Non-blank lines read.
    pub received: u64,
    /// Notifications processed.
    pub processed: u64,
    /// Payloads that were not valid notifications.
    pub rejected: u64,
    /// Notifications whose processing failed.
    pub failed: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: &ListenerOutcome) {
        match outcome {
            ListenerOutcome::Processed(_) => self.processed += 1,
            ListenerOutcome::Rejected { .. } => self.rejected += 1,
            ListenerOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Number of notifications that reached a final outcome.
    #[must_use]
    pub const fn handled(&self) -> u64 {
        self.processed + self.rejected + self.failed
    }
}

impl AddAssign for DispatchStats {
    fn add_assign(&mut self, other: Self) {
        self.received += other.received;
        self.processed += other.processed;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

/// Reads notifications and distributes them over a worker pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    listener: NotificationListener,
    workers: usize,
    channel_capacity: usize,
}

impl Dispatcher {
    /// Creates a dispatcher. Zero workers or capacity are raised to one.
    #[must_use]
    pub fn new(listener: NotificationListener, workers: usize, channel_capacity: usize) -> Self {
        Self {
            listener,
            workers: workers.max(1),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Creates a dispatcher sized by `config`.
    #[must_use]
    pub fn from_config(listener: NotificationListener, config: &WorkerConfig) -> Self {
        Self::new(listener, config.workers, config.channel_capacity)
    }

    /// Returns the number of workers.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Runs until `reader` reaches EOF or `shutdown` turns true.
    ///
    /// Notifications already queued when shutdown is signalled are still
    /// handled before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or a worker task dies.
    pub async fn run<R>(&self, reader: R, mut shutdown: watch::Receiver<bool>) -> Result<DispatchStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let (senders, handles): (Vec<_>, Vec<_>) = (0..self.workers)
            .map(|index| self.spawn_worker(index))
            .unzip();

        info!(workers = self.workers, capacity = self.channel_capacity, "dispatcher started");

        let mut received = 0_u64;
        let mut next = 0_usize;
        let mut read_error = None;
        let mut shutdown_open = true;
        let mut lines = reader.lines();

        if *shutdown.borrow() {
            info!("shutdown requested before start");
        } else {
            loop {
                tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let payload = line.trim();
                            if payload.is_empty() {
                                continue;
                            }
                            received += 1;

                            let worker = next % senders.len();
                            next = next.wrapping_add(1);
                            if senders[worker].send(payload.to_string()).await.is_err() {
                                error!(worker, "worker inbox closed");
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!("notification source reached EOF");
                            break;
                        }
                        Err(e) => {
                            error!(error = %e, "failed to read notification");
                            read_error = Some(e);
                            break;
                        }
                    },
                    changed = shutdown.changed(), if shutdown_open => {
                        if changed.is_err() {
                            shutdown_open = false;
                        } else if *shutdown.borrow() {
                            info!("shutdown requested");
                            break;
                        }
                    }
                }
            }
        }

        drop(senders);

        let mut stats = DispatchStats {
            received,
            ..DispatchStats::default()
        };
        let mut worker_error = None;
        for handle in handles {
            match handle.await {
                Ok(worker_stats) => stats += worker_stats,
                Err(e) => {
                    error!(error = %e, "worker task failed");
                    worker_error = Some(WorkerError::Worker(e.to_string()));
                }
            }
        }

        info!(
            received = stats.received,
            processed = stats.processed,
            rejected = stats.rejected,
            failed = stats.failed,
            "dispatcher stopped"
        );

        if let Some(e) = read_error {
            return Err(e.into());
        }
        if let Some(e) = worker_error {
            return Err(e);
        }
        Ok(stats)
    }

    fn spawn_worker(&self, index: usize) -> (mpsc::Sender<String>, JoinHandle<DispatchStats>) {
        let (tx, mut rx) = mpsc::channel::<String>(self.channel_capacity);
        let listener = self.listener.clone();

        let handle = tokio::spawn(async move {
            let mut stats = DispatchStats::default();
            while let Some(payload) = rx.recv().await {
                let listener = listener.clone();
                match tokio::task::spawn_blocking(move || listener.handle(&payload)).await {
                    Ok(outcome) => {
                        debug!(worker = index, outcome = %outcome, "notification handled");
                        stats.record(&outcome);
                    }
                    Err(e) => {
                        warn!(worker = index, error = %e, "notification handler panicked");
                        stats.failed += 1;
                    }
                }
            }
            debug!(worker = index, "worker drained");
            stats
        });

        (tx, handle)
    }
}
