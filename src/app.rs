use crate::capabilities::{
    Detector, DisplaySink, OperatorEvent, OperatorInput, QueryAnswerer, SnapshotStore,
    SpeechCapture, StreamSource, Transcriber,
};
use crate::config::Config;
use crate::detector::DetectionWorker;
use crate::latest::LatestSlot;
use crate::lifecycle::{Lifecycle, StatusMonitor};
use crate::query::{QueryGate, QueryOutcome};
use crate::queue::FrameQueue;
use crate::sink::{PersistencePool, SinkDispatcher, Tick};
use crate::source::CaptureWorker;
use crate::stats::ProcessingStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::sleep;

const CONTROL_TICK: Duration = Duration::from_millis(10);

/// External collaborators the pipeline is wired to at startup.
pub struct Capabilities {
    pub source: Box<dyn StreamSource>,
    pub detector: Arc<dyn Detector>,
    pub speech: Arc<dyn SpeechCapture>,
    pub transcriber: Arc<dyn Transcriber>,
    pub store: Arc<dyn SnapshotStore>,
    pub answerer: Arc<dyn QueryAnswerer>,
    pub display: Box<dyn DisplaySink>,
    pub input: Box<dyn OperatorInput>,
}

/// Builds the pipeline, spawns its workers, and drives the control loop
/// until the operator quits, a signal arrives, or the source gives up.
pub async fn start_app(config: Config, capabilities: Capabilities) -> anyhow::Result<()> {
    let Capabilities {
        source,
        detector,
        speech,
        transcriber,
        store,
        answerer,
        mut display,
        mut input,
    } = capabilities;

    let queue = Arc::new(FrameQueue::new(config.source.queue_capacity));
    let latest = Arc::new(LatestSlot::new());
    let stats = Arc::new(ProcessingStats::new(config.pipeline.sample_window));

    let lifecycle = Lifecycle::new();

    let capture = CaptureWorker::new(
        source,
        queue.clone(),
        &config.source,
        lifecycle.shutdown_sender(),
    );
    lifecycle.register("stream-capture", capture.run(lifecycle.subscribe()));

    let detection = DetectionWorker::new(
        detector,
        queue.clone(),
        latest.clone(),
        stats.clone(),
        config.pipeline.detection_interval(),
    );
    lifecycle.register("detection", detection.run(lifecycle.subscribe()));

    let monitor = StatusMonitor::new(
        queue.clone(),
        latest.clone(),
        stats.clone(),
        config.pipeline.status_interval(),
    );
    lifecycle.register("status-monitor", monitor.run(lifecycle.subscribe()));

    // Subscribed before the signal task exists: a broadcast can only be seen
    // by receivers that were already subscribed when it was sent.
    let mut shutdown_rx = lifecycle.subscribe();

    let signal_tx = lifecycle.shutdown_sender();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown");
        let _ = signal_tx.send(());
    });

    let pool = PersistencePool::new(store.clone(), config.persistence.workers);
    let dispatcher = SinkDispatcher::new(latest.clone(), pool);
    let gate = QueryGate::new(
        config.query.cooldown(),
        config.query.record_duration(),
        speech,
        transcriber,
        store,
        answerer,
        latest,
    );

    tracing::info!("Pipeline started | press 's' to ask a question, 'q' to quit");
    loop {
        match shutdown_rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            _ => break,
        }
        if dispatcher.tick(display.as_mut()) == Tick::Quit {
            tracing::info!("Quit requested from display");
            break;
        }
        match input.poll() {
            Some(OperatorEvent::Quit) => break,
            Some(OperatorEvent::AskQuestion) => report_outcome(gate.trigger().await),
            None => {}
        }
        sleep(CONTROL_TICK).await;
    }

    lifecycle.shutdown(config.pipeline.shutdown_grace()).await;
    Ok(())
}

fn report_outcome(outcome: QueryOutcome) {
    match outcome {
        QueryOutcome::Answered { question, answer } => {
            tracing::info!("Q: {} | A: {}", question, answer)
        }
        QueryOutcome::Ignored => {}
        QueryOutcome::NoAudio => tracing::warn!("No audio detected, please try again"),
        QueryOutcome::NoTranscription => tracing::warn!("Could not transcribe the question"),
        QueryOutcome::NoFrame => tracing::warn!("No video frame available to analyze"),
        QueryOutcome::StoreFailed => tracing::warn!("Failed to store image for analysis"),
        QueryOutcome::AnswerFailed => tracing::warn!("Answer service failed"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
