//! Single-slot capture buffer.
//!
//! Holds at most one pending capture value (selected text or a URL) between
//! the moment a trigger fires (context-menu click, keyboard shortcut) and the
//! moment the consumer reads it. The slot lives for the lifetime of the
//! bridge process and is intentionally not persisted — a capture is meant to
//! be consumed within seconds of being produced.
//!
//! Semantics:
//! - `set` is last-write-wins; a second capture before consumption replaces
//!   the first.
//! - `take_and_clear` returns the current value and atomically resets the
//!   slot, so the value is observed at most once.

use std::sync::Mutex;

/// A single-slot, last-write-wins buffer for one pending capture value.
#[derive(Debug, Default)]
pub struct CaptureSlot {
    value: Mutex<String>,
}

impl CaptureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, unconditionally replacing any pending one.
    pub fn set(&self, value: impl Into<String>) {
        let mut slot = self.value.lock().expect("capture slot poisoned");
        *slot = value.into();
    }

    /// Returns the pending value and resets the slot to empty.
    ///
    /// The next caller sees an empty string unless a new capture happened
    /// in between.
    pub fn take_and_clear(&self) -> String {
        let mut slot = self.value.lock().expect("capture slot poisoned");
        std::mem::take(&mut *slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes_once() {
        let slot = CaptureSlot::new();
        slot.set("Hello world");
        assert_eq!(slot.take_and_clear(), "Hello world");
        assert_eq!(slot.take_and_clear(), "");
    }

    #[test]
    fn test_last_write_wins() {
        let slot = CaptureSlot::new();
        slot.set("first");
        slot.set("second");
        assert_eq!(slot.take_and_clear(), "second");
        assert_eq!(slot.take_and_clear(), "");
    }

    #[test]
    fn test_empty_by_default() {
        let slot = CaptureSlot::new();
        assert_eq!(slot.take_and_clear(), "");
    }

    #[test]
    fn test_set_after_take() {
        let slot = CaptureSlot::new();
        slot.set("a");
        assert_eq!(slot.take_and_clear(), "a");
        slot.set("b");
        assert_eq!(slot.take_and_clear(), "b");
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;

        let slot = Arc::new(CaptureSlot::new());
        let producer = {
            let slot = slot.clone();
            std::thread::spawn(move || slot.set("from producer"))
        };
        producer.join().unwrap();
        assert_eq!(slot.take_and_clear(), "from producer");
    }
}
