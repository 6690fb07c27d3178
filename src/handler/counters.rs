use core::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::types::{InputEvent, SourceLabel};

/// Running event counters. Monotonic for the owning handler's lifetime.
#[derive(Debug, Default)]
pub struct EventCounters {
    total: AtomicU64,
    touch: AtomicU64,
    mouse: AtomicU64,
    keyboard: AtomicU64,
    rejected: AtomicU64,
    implicit_release: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub total: u64,
    pub touch: u64,
    pub mouse: u64,
    pub keyboard: u64,
    pub rejected: u64,
    pub implicit_release: u64,
}

impl EventCounters {
    pub(crate) fn record(&self, event: &InputEvent) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let bucket = match event {
            InputEvent::Pointer(pointer) if pointer.source == SourceLabel::Mouse => &self.mouse,
            InputEvent::Pointer(_) => &self.touch,
            InputEvent::Mouse(_) => &self.mouse,
            InputEvent::Key(_) => &self.keyboard,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_implicit_release(&self) {
        self.implicit_release.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total: self.total.load(Ordering::Relaxed),
            touch: self.touch.load(Ordering::Relaxed),
            mouse: self.mouse.load(Ordering::Relaxed),
            keyboard: self.keyboard.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            implicit_release: self.implicit_release.load(Ordering::Relaxed),
        }
    }
}
