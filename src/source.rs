use crate::capabilities::StreamSource;
use crate::config::SourceConfig;
use crate::queue::FrameQueue;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("stream failed to open after {attempts} attempts")]
    Unavailable { attempts: u32 },
    #[error("shutdown requested while connecting")]
    Stopped,
}

/// Pulls frames from the stream device at the configured cadence and feeds
/// the bounded frame queue, evicting the oldest buffered frame when the
/// detector falls behind. Runs until shutdown, or until the stream proves
/// unreachable, in which case it signals overall shutdown: a pipeline with
/// no source has nothing left to do.
pub struct CaptureWorker {
    source: Box<dyn StreamSource>,
    queue: Arc<FrameQueue>,
    frame_interval: Duration,
    connect_attempts: u32,
    connect_backoff: Duration,
    read_retry: Duration,
    shutdown_tx: broadcast::Sender<()>,
}

impl CaptureWorker {
    pub fn new(
        source: Box<dyn StreamSource>,
        queue: Arc<FrameQueue>,
        config: &SourceConfig,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            source,
            queue,
            frame_interval: config.frame_interval(),
            connect_attempts: config.connect_attempts,
            connect_backoff: config.connect_backoff(),
            read_retry: config.read_retry(),
            shutdown_tx,
        }
    }

    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        match self.connect(&mut shutdown_rx).await {
            Ok(()) => {}
            Err(SourceError::Stopped) => return,
            Err(e) => {
                tracing::error!("Stream source unavailable, stopping pipeline: {:?}", e);
                let _ = self.shutdown_tx.send(());
                return;
            }
        }

        tracing::info!("Stream capture started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = self.read_one() => {}
            }
        }
        self.source.release();
        tracing::info!("Stream capture stopped");
    }

    async fn connect(
        &mut self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<(), SourceError> {
        for attempt in 1..=self.connect_attempts {
            match self.source.connect().await {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(
                    "Stream connection attempt {}/{} failed: {:?}",
                    attempt,
                    self.connect_attempts,
                    e
                ),
            }
            if attempt < self.connect_attempts {
                tokio::select! {
                    _ = shutdown_rx.recv() => return Err(SourceError::Stopped),
                    _ = sleep(self.connect_backoff) => {}
                }
            }
        }
        Err(SourceError::Unavailable {
            attempts: self.connect_attempts,
        })
    }

    /// One read-loop iteration: read a frame, enqueue it, then pace to the
    /// target capture rate. A failed read is retried after a short delay
    /// without leaving the loop.
    async fn read_one(&mut self) {
        let started = Instant::now();
        match self.source.read_frame().await {
            Ok(frame) => {
                if self.queue.push(frame) {
                    tracing::trace!("Frame queue full, dropped oldest frame");
                }
                if let Some(remaining) = self.frame_interval.checked_sub(started.elapsed()) {
                    sleep(remaining).await;
                }
            }
            Err(e) => {
                tracing::warn!("Frame read failed, retrying: {:?}", e);
                sleep(self.read_retry).await;
            }
        }
    }
}
