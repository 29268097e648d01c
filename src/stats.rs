use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Samples at or above this are assumed to be stalls, not inference.
const OUTLIER_CUTOFF: Duration = Duration::from_secs(1);

/// Rolling window of recent per-frame inference durations. Reporting only;
/// oldest sample is evicted first once the window is full.
#[derive(Debug)]
pub struct ProcessingStats {
    samples: Mutex<VecDeque<Duration>>,
    window: usize,
}

impl ProcessingStats {
    pub fn new(window: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(window)),
            window,
        }
    }

    /// Records one inference duration, ignoring outliers.
    pub fn record(&self, sample: Duration) {
        if sample >= OUTLIER_CUTOFF {
            return;
        }
        let mut samples = self.samples.lock();
        if samples.len() == self.window {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    pub fn mean(&self) -> Option<Duration> {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return None;
        }
        let total: Duration = samples.iter().sum();
        Some(total / samples.len() as u32)
    }

    /// Effective processing rate implied by the mean duration.
    pub fn fps(&self) -> Option<f64> {
        self.mean().and_then(|mean| {
            let secs = mean.as_secs_f64();
            (secs > 0.0).then(|| 1.0 / secs)
        })
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_no_mean() {
        let stats = ProcessingStats::new(4);
        assert!(stats.mean().is_none());
        assert!(stats.fps().is_none());
    }

    #[test]
    fn full_window_evicts_oldest_first() {
        let stats = ProcessingStats::new(3);
        for ms in [100, 200, 300, 400] {
            stats.record(Duration::from_millis(ms));
        }
        assert_eq!(stats.len(), 3);
        // 100ms fell out of the window.
        assert_eq!(stats.mean(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn outliers_are_not_retained() {
        let stats = ProcessingStats::new(10);
        stats.record(Duration::from_secs(5));
        stats.record(Duration::from_secs(1));
        assert!(stats.is_empty());
        stats.record(Duration::from_millis(50));
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.fps(), Some(20.0));
    }
}
