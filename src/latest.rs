use parking_lot::Mutex;

#[derive(Debug)]
struct Inner<T> {
    value: Option<T>,
    published: u64,
    consumed: u64,
}

/// Newest-value hand-off between the detection worker and its consumers.
///
/// `publish` always overwrites: the slot holds exactly one value, so a reader
/// can never observe anything older than the most recent publish. Readers
/// either claim the value once per publish (`try_consume`) or observe it
/// without claiming it (`peek`), which snapshot-style readers use and which
/// may legitimately return an already-consumed value.
///
/// No lock is ever held across I/O; every operation is a short critical
/// section, safe for one writer and any number of readers.
#[derive(Debug)]
pub struct LatestSlot<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                value: None,
                published: 0,
                consumed: 0,
            }),
        }
    }

    /// True when a publish has not been consumed yet.
    pub fn has_pending(&self) -> bool {
        let inner = self.inner.lock();
        inner.published > inner.consumed
    }
}

impl<T: Clone> LatestSlot<T> {
    /// Stores `value` as the current result, discarding any unread one.
    pub fn publish(&self, value: T) {
        let mut inner = self.inner.lock();
        inner.value = Some(value);
        inner.published += 1;
    }

    /// Returns the newest value if one was published since the last consume.
    pub fn try_consume(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        if inner.published > inner.consumed {
            inner.consumed = inner.published;
            inner.value.clone()
        } else {
            None
        }
    }

    /// Returns the newest value without claiming it.
    pub fn peek(&self) -> Option<T> {
        self.inner.lock().value.clone()
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_yields_nothing() {
        let slot: LatestSlot<u32> = LatestSlot::new();
        assert!(slot.try_consume().is_none());
        assert!(slot.peek().is_none());
        assert!(!slot.has_pending());
    }

    #[test]
    fn consume_returns_newest_exactly_once() {
        let slot = LatestSlot::new();
        slot.publish(1);
        slot.publish(2);
        assert_eq!(slot.try_consume(), Some(2));
        assert_eq!(slot.try_consume(), None);
    }

    #[test]
    fn publish_after_consume_is_visible_again() {
        let slot = LatestSlot::new();
        slot.publish(1);
        assert_eq!(slot.try_consume(), Some(1));
        slot.publish(2);
        assert!(slot.has_pending());
        assert_eq!(slot.try_consume(), Some(2));
    }

    #[test]
    fn peek_does_not_claim() {
        let slot = LatestSlot::new();
        slot.publish(7);
        assert_eq!(slot.peek(), Some(7));
        assert_eq!(slot.try_consume(), Some(7));
        // A consumed value is still observable by snapshot readers.
        assert_eq!(slot.peek(), Some(7));
    }
}
