use crate::capabilities::{DisplaySink, SnapshotStore};
use crate::frame::{Frame, LatestResult};
use crate::latest::LatestSlot;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounded pool of fire-and-forget persistence tasks. `submit` never blocks:
/// when every slot is busy the frame is skipped, and each task's failure is
/// logged in isolation.
pub struct PersistencePool {
    store: Arc<dyn SnapshotStore>,
    slots: Arc<Semaphore>,
}

impl PersistencePool {
    pub fn new(store: Arc<dyn SnapshotStore>, workers: usize) -> Self {
        Self {
            store,
            slots: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn submit(&self, frame: Frame) {
        let Ok(permit) = self.slots.clone().try_acquire_owned() else {
            tracing::debug!("Persistence pool saturated, skipping frame");
            return;
        };
        let store = self.store.clone();
        tokio::spawn(async move {
            let _permit = permit;
            match store.store(&frame).await {
                Ok(key) => tracing::debug!("Stored frame as {}", key),
                Err(e) => tracing::error!("Frame persistence failed: {:?}", e),
            }
        });
    }
}

/// What one dispatch tick observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Dispatched,
    Quit,
}

/// Forwards the newest detection result to the display and hands the frame
/// to the persistence pool without waiting on it. Surfaces nothing upward
/// except the operator's quit request; render failures are logged and the
/// loop moves on.
pub struct SinkDispatcher {
    latest: Arc<LatestSlot<LatestResult>>,
    pool: PersistencePool,
}

impl SinkDispatcher {
    pub fn new(latest: Arc<LatestSlot<LatestResult>>, pool: PersistencePool) -> Self {
        Self { latest, pool }
    }

    pub fn tick(&self, display: &mut dyn DisplaySink) -> Tick {
        let Some(result) = self.latest.try_consume() else {
            return Tick::Idle;
        };
        let quit = match display.render(&result.frame) {
            Ok(quit) => quit,
            Err(e) => {
                tracing::error!("Display render failed: {:?}", e);
                false
            }
        };
        self.pool.submit(result.frame);
        if quit {
            Tick::Quit
        } else {
            Tick::Dispatched
        }
    }
}
