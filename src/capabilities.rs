//! Trait seams for the external collaborators the pipeline is wired to:
//! the video device, the detection model, speech capture and transcription,
//! snapshot storage, the vision-language answer service, and the operator
//! surface. Concrete backends live outside the core; `crate::stub` provides
//! hardware-free ones.

use crate::detection::Detection;
use crate::frame::Frame;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// A video device or network stream.
///
/// Connect failures are retried a fixed number of times by the capture
/// worker before the pipeline gives up; read failures are treated as
/// transient.
#[async_trait]
pub trait StreamSource: Send {
    async fn connect(&mut self) -> Result<()>;

    async fn read_frame(&mut self) -> Result<Frame>;

    /// Releases the underlying device handle. Called exactly once, after the
    /// read loop has exited.
    fn release(&mut self);
}

/// Object detection over one frame.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Returns the detections and the frame with them rendered on.
    async fn detect(&self, frame: &Frame) -> Result<(Vec<Detection>, Frame)>;
}

/// Microphone capture for operator questions.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Records up to `max_duration` of audio. An empty buffer means nothing
    /// was captured.
    async fn capture(&self, max_duration: Duration) -> Result<Bytes>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Bytes) -> Result<String>;
}

/// Persists frames (local copy plus remote upload) behind one call.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores a frame and returns the reference key it is retrievable under.
    async fn store(&self, frame: &Frame) -> Result<String>;
}

/// Discriminator forwarded to the answer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    General,
}

/// Vision-language answer service over a stored snapshot.
#[async_trait]
pub trait QueryAnswerer: Send + Sync {
    async fn answer(&self, image_key: &str, question: &str, kind: QueryKind) -> Result<String>;
}

/// Display surface for annotated frames.
pub trait DisplaySink: Send {
    /// Renders one frame. Returns true when the operator asked to quit
    /// through the display window.
    fn render(&mut self, frame: &Frame) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorEvent {
    AskQuestion,
    Quit,
}

/// Keyboard-style operator input, polled once per control-loop tick.
pub trait OperatorInput: Send {
    fn poll(&mut self) -> Option<OperatorEvent>;
}
