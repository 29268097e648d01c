use crate::detection::Detection;
use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single captured frame. The pixel buffer is refcounted so clones are
/// cheap, and it is never mutated once captured; annotation produces a new
/// frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub captured_at: SystemTime,
}

impl Frame {
    pub fn new(data: Bytes, width: u32, height: u32, channels: u8) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            captured_at: SystemTime::now(),
        }
    }

    /// Capture time as epoch milliseconds, used for storage keys.
    pub fn timestamp_ms(&self) -> i64 {
        self.captured_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

/// The newest detection output exposed to consumers: the detections and the
/// frame they were rendered onto.
#[derive(Debug, Clone)]
pub struct LatestResult {
    pub detections: Vec<Detection>,
    pub frame: Frame,
}
