use core::{
    cell::RefCell,
    sync::atomic::{AtomicBool, Ordering},
};
use std::{sync::Arc, thread, time::Duration};

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    channel::{Channel, TrySendError},
};

use super::counters::{CounterSnapshot, EventCounters};
use crate::{
    error::{InputError, Result},
    normalize::{Admission, Clock, LifecycleGuard},
    types::{InputEvent, PointerEvent},
};

pub const SINK_CAPACITY: usize = 256;
const SINK_FULL_BACKOFF: Duration = Duration::from_micros(250);

struct SinkShared {
    queue: Channel<CriticalSectionRawMutex, InputEvent, SINK_CAPACITY>,
    guard: Mutex<CriticalSectionRawMutex, RefCell<LifecycleGuard>>,
    open: AtomicBool,
    counters: EventCounters,
    clock: Clock,
}

/// Single injection point shared by every producer of one handler.
///
/// Pointer events pass the lifecycle guard first; accepted events then enter a
/// bounded queue read only by the handler. A full queue applies backpressure
/// to the producer until the consumer drains it or the sink closes.
#[derive(Clone)]
pub struct EventSink {
    shared: Arc<SinkShared>,
}

impl EventSink {
    pub fn new(clock: Clock) -> Self {
        Self {
            shared: Arc::new(SinkShared {
                queue: Channel::new(),
                guard: Mutex::new(RefCell::new(LifecycleGuard::new())),
                open: AtomicBool::new(true),
                counters: EventCounters::default(),
                clock,
            }),
        }
    }

    /// Milliseconds since the owning handler started.
    pub fn now_ms(&self) -> u64 {
        self.shared.clock.now_ms()
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Room for at least `count` more events right now.
    pub fn has_capacity(&self, count: usize) -> bool {
        self.shared.queue.free_capacity() >= count
    }

    pub fn push_event(&self, event: impl Into<InputEvent>) -> Result<()> {
        if !self.is_open() {
            return Err(InputError::SinkClosed);
        }
        match event.into() {
            InputEvent::Pointer(pointer) => {
                let admission = self
                    .shared
                    .guard
                    .lock(|guard| guard.borrow_mut().admit(pointer));
                match admission {
                    Admission::Rejected(_) => {
                        self.shared.counters.record_rejected();
                        Ok(())
                    }
                    Admission::ImplicitRelease { .. } => {
                        self.shared.counters.record_implicit_release();
                        admission
                            .events()
                            .try_for_each(|event| self.enqueue(event.into()))
                    }
                    Admission::Accepted(event) => self.enqueue(event.into()),
                }
            }
            other => self.enqueue(other),
        }
    }

    fn enqueue(&self, mut event: InputEvent) -> Result<()> {
        loop {
            match self.shared.queue.try_send(event) {
                Ok(()) => {
                    self.shared.counters.record(&event);
                    return Ok(());
                }
                Err(TrySendError::Full(rejected)) => {
                    if !self.is_open() {
                        return Err(InputError::SinkClosed);
                    }
                    event = rejected;
                    thread::sleep(SINK_FULL_BACKOFF);
                }
            }
        }
    }

    pub(crate) fn try_receive(&self) -> Option<InputEvent> {
        self.shared.queue.try_receive().ok()
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub(crate) fn open(&self) {
        self.shared.open.store(true, Ordering::Release);
    }

    pub(crate) fn close(&self) {
        self.shared.open.store(false, Ordering::Release);
    }

    /// Ends every contact still down and returns the Ups, already counted.
    /// The queue may be full, so delivering them is left to the consumer.
    pub(crate) fn release_open_contacts(&self) -> Vec<InputEvent> {
        let now_ms = self.now_ms();
        let releases: Vec<PointerEvent> = self
            .shared
            .guard
            .lock(|guard| guard.borrow_mut().release_all(now_ms));
        releases
            .into_iter()
            .map(|release| {
                let event = InputEvent::from(release);
                self.shared.counters.record(&event);
                event
            })
            .collect()
    }

    pub(crate) fn active_contacts(&self) -> usize {
        self.shared.guard.lock(|guard| guard.borrow().active_count())
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.shared.counters.snapshot()
    }
}
