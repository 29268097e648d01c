use crate::frame::LatestResult;
use crate::latest::LatestSlot;
use crate::queue::FrameQueue;
use crate::stats::ProcessingStats;
use futures::future::join_all;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

struct Worker {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Owns the shutdown channel and the registry of running workers.
///
/// Every worker observes the same broadcast channel and is expected to stop
/// within one iteration of its loop. At shutdown each registered worker is
/// joined with a grace timeout; one that misses the window is aborted and
/// logged as a warning, an expected escape valve rather than an error.
pub struct Lifecycle {
    shutdown_tx: broadcast::Sender<()>,
    workers: Mutex<Vec<Worker>>,
    stopped: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            workers: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Spawns and registers a named worker task.
    pub fn register<F>(&self, name: &'static str, worker: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(worker);
        self.workers.lock().push(Worker { name, handle });
    }

    /// Signals every worker to stop and waits up to `grace` for each.
    /// Idempotent: later calls return immediately.
    pub async fn shutdown(&self, grace: Duration) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Shutdown started");
        let _ = self.shutdown_tx.send(());

        let workers: Vec<Worker> = {
            let mut registry = self.workers.lock();
            registry.drain(..).collect()
        };
        let joins = workers.into_iter().map(|worker| async move {
            let abort = worker.handle.abort_handle();
            match timeout(grace, worker.handle).await {
                Ok(Ok(())) => tracing::info!("Worker {} stopped", worker.name),
                Ok(Err(e)) => tracing::error!("Worker {} failed: {:?}", worker.name, e),
                Err(_) => {
                    abort.abort();
                    tracing::warn!(
                        "Worker {} did not stop within {:?}, abandoning it",
                        worker.name,
                        grace
                    );
                }
            }
        });
        join_all(joins).await;
        tracing::info!("Shutdown complete");
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic status line: effective detection rate, queue occupancy, whether
/// a result is waiting for consumers, and mean inference time.
pub struct StatusMonitor {
    queue: Arc<FrameQueue>,
    latest: Arc<LatestSlot<LatestResult>>,
    stats: Arc<ProcessingStats>,
    period: Duration,
}

impl StatusMonitor {
    pub fn new(
        queue: Arc<FrameQueue>,
        latest: Arc<LatestSlot<LatestResult>>,
        stats: Arc<ProcessingStats>,
        period: Duration,
    ) -> Self {
        Self {
            queue,
            latest,
            stats,
            period,
        }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the first report
        // lands one full period in.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => self.report(),
            }
        }
    }

    fn report(&self) {
        let fps = self.stats.fps().unwrap_or(0.0);
        let proc_ms = self
            .stats
            .mean()
            .map(|mean| mean.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        tracing::info!(
            "System status | fps: {:.1} | queue: {}/{} | result pending: {} | proc time: {:.1}ms",
            fps,
            self.queue.len(),
            self.queue.capacity(),
            self.latest.has_pending(),
            proc_ms
        );
    }
}
