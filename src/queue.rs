use crate::frame::Frame;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Bounded FIFO between capture and detection. When full, a push first evicts
/// exactly one oldest frame, so the queue always holds the freshest frames
/// the detector has not seen yet and never grows past its capacity.
#[derive(Debug)]
pub struct FrameQueue {
    inner: Mutex<VecDeque<Frame>>,
    capacity: usize,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "frame queue capacity must be non-zero");
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Inserts a frame, dropping the oldest buffered frame when full.
    /// Returns true when a buffered frame was evicted to make room.
    pub fn push(&self, frame: Frame) -> bool {
        let mut queue = self.inner.lock();
        let evicted = queue.len() == self.capacity;
        if evicted {
            queue.pop_front();
        }
        queue.push_back(frame);
        evicted
    }

    pub fn try_pop(&self) -> Option<Frame> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when occupancy exceeds 80% of capacity, the threshold at which
    /// the detector sheds load instead of scoring frames that will be stale
    /// by the time they reach the model.
    pub fn is_backlogged(&self) -> bool {
        self.len() * 5 > self.capacity * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame(marker: u32) -> Frame {
        Frame::new(Bytes::new(), marker, 1, 1)
    }

    #[test]
    fn never_exceeds_capacity() {
        let queue = FrameQueue::new(3);
        for i in 0..10 {
            queue.push(frame(i));
            assert!(queue.len() <= 3);
        }
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn full_push_evicts_exactly_one_oldest() {
        let queue = FrameQueue::new(2);
        assert!(!queue.push(frame(1)));
        assert!(!queue.push(frame(2)));
        assert!(queue.push(frame(3)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().width, 2);
        assert_eq!(queue.try_pop().unwrap().width, 3);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn backlog_threshold_is_above_eighty_percent() {
        let queue = FrameQueue::new(10);
        for i in 0..8 {
            queue.push(frame(i));
        }
        assert!(!queue.is_backlogged());
        queue.push(frame(8));
        assert!(queue.is_backlogged());
    }
}
