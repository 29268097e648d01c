//! Hardware-free capability backends. They let the binary run end to end
//! without a camera, microphone, or remote services, and tests reuse them
//! as fixtures.

use crate::capabilities::{
    Detector, DisplaySink, OperatorEvent, OperatorInput, QueryAnswerer, QueryKind, SnapshotStore,
    SpeechCapture, StreamSource, Transcriber,
};
use crate::detection::Detection;
use crate::frame::Frame;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Synthetic video source producing flat frames with a slowly cycling shade.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    counter: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            counter: 0,
        }
    }
}

#[async_trait]
impl StreamSource for SyntheticSource {
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        self.counter += 1;
        let shade = (self.counter % 256) as u8;
        let data = vec![shade; (self.width * self.height * 3) as usize];
        Ok(Frame::new(Bytes::from(data), self.width, self.height, 3))
    }

    fn release(&mut self) {}
}

/// Pass-through detector reporting no objects.
pub struct NullDetector;

#[async_trait]
impl Detector for NullDetector {
    async fn detect(&self, frame: &Frame) -> Result<(Vec<Detection>, Frame)> {
        Ok((Vec::new(), frame.clone()))
    }
}

/// Display sink that only counts frames and never requests quit.
#[derive(Default)]
pub struct LogDisplay {
    rendered: u64,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for LogDisplay {
    fn render(&mut self, _frame: &Frame) -> Result<bool> {
        self.rendered += 1;
        if self.rendered % 100 == 0 {
            tracing::debug!("Rendered {} frames", self.rendered);
        }
        Ok(false)
    }
}

/// Stores nothing; returns keys shaped like the real store's.
pub struct NullStore;

#[async_trait]
impl SnapshotStore for NullStore {
    async fn store(&self, frame: &Frame) -> Result<String> {
        Ok(format!("frames/frame_{}.jpg", frame.timestamp_ms()))
    }
}

/// Microphone stand-in that never hears anything.
pub struct SilentSpeech;

#[async_trait]
impl SpeechCapture for SilentSpeech {
    async fn capture(&self, _max_duration: Duration) -> Result<Bytes> {
        Ok(Bytes::new())
    }
}

pub struct NullTranscriber;

#[async_trait]
impl Transcriber for NullTranscriber {
    async fn transcribe(&self, _audio: Bytes) -> Result<String> {
        Ok(String::new())
    }
}

pub struct NullAnswerer;

#[async_trait]
impl QueryAnswerer for NullAnswerer {
    async fn answer(&self, _key: &str, _question: &str, _kind: QueryKind) -> Result<String> {
        Ok("no answer service configured".into())
    }
}

/// Operator input that never fires.
pub struct NullInput;

impl OperatorInput for NullInput {
    fn poll(&mut self) -> Option<OperatorEvent> {
        None
    }
}
