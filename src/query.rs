use crate::capabilities::{QueryAnswerer, QueryKind, SnapshotStore, SpeechCapture, Transcriber};
use crate::frame::LatestResult;
use crate::latest::LatestSlot;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Where an in-flight operator question currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Recording,
    Transcribing,
    Snapshotting,
    Persisting,
    Querying,
}

/// Operator-visible result of one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered { question: String, answer: String },
    /// Trigger rejected: a query is already in flight or the cooldown has
    /// not elapsed. Rejected triggers are dropped, never queued.
    Ignored,
    NoAudio,
    NoTranscription,
    NoFrame,
    StoreFailed,
    AnswerFailed,
}

#[derive(Debug)]
struct GateInner {
    state: QueryState,
    last_accepted: Option<Instant>,
}

/// Serializes operator-triggered questions: at most one transaction in
/// flight system-wide, with a cooldown between accepted triggers. The
/// admitted path holds an RAII guard whose drop restores `Idle`, so the gate
/// can never be left locked by a failure mid-transaction.
pub struct QueryGate {
    inner: Mutex<GateInner>,
    cooldown: Duration,
    record_duration: Duration,
    speech: Arc<dyn SpeechCapture>,
    transcriber: Arc<dyn Transcriber>,
    store: Arc<dyn SnapshotStore>,
    answerer: Arc<dyn QueryAnswerer>,
    latest: Arc<LatestSlot<LatestResult>>,
}

struct GateGuard<'a> {
    gate: &'a QueryGate,
}

impl GateGuard<'_> {
    fn advance(&self, state: QueryState) {
        self.gate.inner.lock().state = state;
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.inner.lock().state = QueryState::Idle;
    }
}

impl QueryGate {
    pub fn new(
        cooldown: Duration,
        record_duration: Duration,
        speech: Arc<dyn SpeechCapture>,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<dyn SnapshotStore>,
        answerer: Arc<dyn QueryAnswerer>,
        latest: Arc<LatestSlot<LatestResult>>,
    ) -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: QueryState::Idle,
                last_accepted: None,
            }),
            cooldown,
            record_duration,
            speech,
            transcriber,
            store,
            answerer,
            latest,
        }
    }

    pub fn state(&self) -> QueryState {
        self.inner.lock().state
    }

    /// Admission check-and-set under one lock: accept only when idle and
    /// past the cooldown, recording the acceptance time atomically with the
    /// state change.
    fn admit(&self) -> Option<GateGuard<'_>> {
        let mut inner = self.inner.lock();
        if inner.state != QueryState::Idle {
            return None;
        }
        let now = Instant::now();
        if let Some(last) = inner.last_accepted {
            if now.duration_since(last) < self.cooldown {
                return None;
            }
        }
        inner.state = QueryState::Recording;
        inner.last_accepted = Some(now);
        Some(GateGuard { gate: self })
    }

    /// Runs one full question transaction, or reports why it stopped early.
    /// Every early exit returns the gate to `Idle` before the caller sees
    /// the outcome.
    pub async fn trigger(&self) -> QueryOutcome {
        let Some(guard) = self.admit() else {
            tracing::debug!("Query trigger ignored: gate busy or cooling down");
            return QueryOutcome::Ignored;
        };
        self.run(&guard).await
    }

    async fn run(&self, guard: &GateGuard<'_>) -> QueryOutcome {
        tracing::info!("Voice query accepted, recording");
        let audio = match self.speech.capture(self.record_duration).await {
            Ok(audio) if !audio.is_empty() => audio,
            Ok(_) => {
                tracing::warn!("No audio captured");
                return QueryOutcome::NoAudio;
            }
            Err(e) => {
                tracing::error!("Audio capture failed: {:?}", e);
                return QueryOutcome::NoAudio;
            }
        };

        guard.advance(QueryState::Transcribing);
        let question = match self.transcriber.transcribe(audio).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("Transcription returned no text");
                return QueryOutcome::NoTranscription;
            }
            Err(e) => {
                tracing::error!("Transcription failed: {:?}", e);
                return QueryOutcome::NoTranscription;
            }
        };
        tracing::info!("Transcribed question: {}", question);

        guard.advance(QueryState::Snapshotting);
        let Some(result) = self.latest.peek() else {
            tracing::warn!("No frame available to analyze");
            return QueryOutcome::NoFrame;
        };

        guard.advance(QueryState::Persisting);
        let key = match self.store.store(&result.frame).await {
            Ok(key) => key,
            Err(e) => {
                tracing::error!("Failed to store query snapshot: {:?}", e);
                return QueryOutcome::StoreFailed;
            }
        };

        guard.advance(QueryState::Querying);
        match self.answerer.answer(&key, &question, QueryKind::General).await {
            Ok(answer) => {
                tracing::info!("Answer: {}", answer);
                QueryOutcome::Answered { question, answer }
            }
            Err(e) => {
                tracing::error!("Answer service failed: {:?}", e);
                QueryOutcome::AnswerFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{QueryAnswerer, QueryKind, SnapshotStore, SpeechCapture, Transcriber};
    use crate::frame::Frame;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        capture: AtomicUsize,
        transcribe: AtomicUsize,
        store: AtomicUsize,
        answer: AtomicUsize,
    }

    #[derive(Clone)]
    struct Mock {
        calls: Arc<Calls>,
        audio: Bytes,
        audio_fails: bool,
        transcription: String,
        transcribe_fails: bool,
        store_fails: bool,
        answer_fails: bool,
    }

    impl Mock {
        fn happy() -> Self {
            Self {
                calls: Arc::new(Calls::default()),
                audio: Bytes::from_static(b"pcm"),
                audio_fails: false,
                transcription: "what is ahead".into(),
                transcribe_fails: false,
                store_fails: false,
                answer_fails: false,
            }
        }
    }

    #[async_trait]
    impl SpeechCapture for Mock {
        async fn capture(&self, _max_duration: Duration) -> Result<Bytes> {
            self.calls.capture.fetch_add(1, Ordering::SeqCst);
            if self.audio_fails {
                bail!("microphone offline");
            }
            Ok(self.audio.clone())
        }
    }

    #[async_trait]
    impl Transcriber for Mock {
        async fn transcribe(&self, _audio: Bytes) -> Result<String> {
            self.calls.transcribe.fetch_add(1, Ordering::SeqCst);
            if self.transcribe_fails {
                bail!("transcription service down");
            }
            Ok(self.transcription.clone())
        }
    }

    #[async_trait]
    impl SnapshotStore for Mock {
        async fn store(&self, _frame: &Frame) -> Result<String> {
            self.calls.store.fetch_add(1, Ordering::SeqCst);
            if self.store_fails {
                bail!("upload rejected");
            }
            Ok("frames/frame_test.jpg".into())
        }
    }

    #[async_trait]
    impl QueryAnswerer for Mock {
        async fn answer(&self, _key: &str, _question: &str, _kind: QueryKind) -> Result<String> {
            self.calls.answer.fetch_add(1, Ordering::SeqCst);
            if self.answer_fails {
                bail!("model endpoint unavailable");
            }
            Ok("a gravel slope".into())
        }
    }

    fn slot_with_result() -> Arc<LatestSlot<LatestResult>> {
        let slot = Arc::new(LatestSlot::new());
        slot.publish(LatestResult {
            detections: Vec::new(),
            frame: Frame::new(Bytes::from_static(&[0u8; 12]), 2, 2, 3),
        });
        slot
    }

    fn gate(mock: &Mock, latest: Arc<LatestSlot<LatestResult>>) -> QueryGate {
        QueryGate::new(
            Duration::from_secs(1),
            Duration::from_secs(5),
            Arc::new(mock.clone()),
            Arc::new(mock.clone()),
            Arc::new(mock.clone()),
            Arc::new(mock.clone()),
            latest,
        )
    }

    #[tokio::test]
    async fn full_transaction_answers() {
        let mock = Mock::happy();
        let gate = gate(&mock, slot_with_result());
        let outcome = gate.trigger().await;
        assert_eq!(
            outcome,
            QueryOutcome::Answered {
                question: "what is ahead".into(),
                answer: "a gravel slope".into(),
            }
        );
        assert_eq!(gate.state(), QueryState::Idle);
    }

    #[tokio::test]
    async fn empty_audio_stops_before_transcription() {
        let mock = Mock {
            audio: Bytes::new(),
            ..Mock::happy()
        };
        let gate = gate(&mock, slot_with_result());
        assert_eq!(gate.trigger().await, QueryOutcome::NoAudio);
        assert_eq!(gate.state(), QueryState::Idle);
        assert_eq!(mock.calls.capture.load(Ordering::SeqCst), 1);
        assert_eq!(mock.calls.transcribe.load(Ordering::SeqCst), 0);
        assert_eq!(mock.calls.store.load(Ordering::SeqCst), 0);
        assert_eq!(mock.calls.answer.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_at_each_step_returns_to_idle() {
        let cases = [
            (
                Mock {
                    audio_fails: true,
                    ..Mock::happy()
                },
                QueryOutcome::NoAudio,
            ),
            (
                Mock {
                    transcribe_fails: true,
                    ..Mock::happy()
                },
                QueryOutcome::NoTranscription,
            ),
            (
                Mock {
                    transcription: "   ".into(),
                    ..Mock::happy()
                },
                QueryOutcome::NoTranscription,
            ),
            (
                Mock {
                    store_fails: true,
                    ..Mock::happy()
                },
                QueryOutcome::StoreFailed,
            ),
            (
                Mock {
                    answer_fails: true,
                    ..Mock::happy()
                },
                QueryOutcome::AnswerFailed,
            ),
        ];
        for (mock, expected) in cases {
            let gate = gate(&mock, slot_with_result());
            assert_eq!(gate.trigger().await, expected);
            assert_eq!(gate.state(), QueryState::Idle);
        }
    }

    #[tokio::test]
    async fn missing_frame_aborts_before_store() {
        let mock = Mock::happy();
        let gate = gate(&mock, Arc::new(LatestSlot::new()));
        assert_eq!(gate.trigger().await, QueryOutcome::NoFrame);
        assert_eq!(gate.state(), QueryState::Idle);
        assert_eq!(mock.calls.store.load(Ordering::SeqCst), 0);
        assert_eq!(mock.calls.answer.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cooldown_rejects_back_to_back_triggers() {
        let mock = Mock::happy();
        let gate = gate(&mock, slot_with_result());
        assert!(matches!(
            gate.trigger().await,
            QueryOutcome::Answered { .. }
        ));
        assert_eq!(gate.trigger().await, QueryOutcome::Ignored);
        assert_eq!(mock.calls.capture.load(Ordering::SeqCst), 1);
        assert_eq!(gate.state(), QueryState::Idle);
    }
}
