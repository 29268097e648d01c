use crate::capabilities::Detector;
use crate::frame::LatestResult;
use crate::latest::LatestSlot;
use crate::queue::FrameQueue;
use crate::stats::ProcessingStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};

const IDLE_POLL: Duration = Duration::from_millis(5);

/// Scores queued frames through the detection capability and publishes the
/// newest result. A failed detection publishes the original frame with no
/// detections so consumers keep receiving live video; the worker never dies
/// because one frame failed to score.
pub struct DetectionWorker {
    detector: Arc<dyn Detector>,
    queue: Arc<FrameQueue>,
    latest: Arc<LatestSlot<LatestResult>>,
    stats: Arc<ProcessingStats>,
    target_interval: Duration,
}

impl DetectionWorker {
    pub fn new(
        detector: Arc<dyn Detector>,
        queue: Arc<FrameQueue>,
        latest: Arc<LatestSlot<LatestResult>>,
        stats: Arc<ProcessingStats>,
        target_interval: Duration,
    ) -> Self {
        Self {
            detector,
            queue,
            latest,
            stats,
            target_interval,
        }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        tracing::info!("Detection worker started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = self.tick() => {}
            }
        }
        tracing::info!("Detection worker stopped");
    }

    async fn tick(&self) {
        let Some(frame) = self.queue.try_pop() else {
            sleep(IDLE_POLL).await;
            return;
        };

        // Load shedding: when the queue is still above 80% after the pop,
        // newer frames are already waiting, so this one is discarded without
        // being scored.
        if self.queue.is_backlogged() {
            tracing::debug!(
                "Queue backlogged ({}/{}), skipping frame",
                self.queue.len(),
                self.queue.capacity()
            );
            return;
        }

        let started = Instant::now();
        let result = match self.detector.detect(&frame).await {
            Ok((detections, annotated)) => {
                // Only successful inferences count toward the reported rate.
                self.stats.record(started.elapsed());
                LatestResult {
                    detections,
                    frame: annotated,
                }
            }
            Err(e) => {
                tracing::error!("Detection failed, passing frame through: {:?}", e);
                LatestResult {
                    detections: Vec::new(),
                    frame,
                }
            }
        };
        let elapsed = started.elapsed();
        self.latest.publish(result);

        if let Some(remaining) = self.target_interval.checked_sub(elapsed) {
            sleep(remaining).await;
        }
    }
}
