use std::{collections::BTreeMap, time::Instant};

use log::warn;

use crate::{
    device::{
        contacts::{ContactTransition, TransitionKind},
        probe::{AxisRange, DeviceCapabilities},
    },
    types::{PointerEvent, PointerKind, SourceLabel},
};

/// `(raw - min) / (max - min)` clamped to `[0, 1]`. Exact at both ends.
pub fn normalize_axis(raw: i32, range: AxisRange) -> f32 {
    let span = range.span();
    if span <= 0 {
        return 0.0;
    }
    let offset = raw as i64 - range.min as i64;
    ((offset as f64 / span as f64).clamp(0.0, 1.0)) as f32
}

/// Unreported pressure reads as full pressure.
pub fn normalize_pressure(raw: Option<i32>, range: Option<AxisRange>) -> f32 {
    match (raw, range) {
        (Some(raw), Some(range)) => normalize_axis(raw, range),
        _ => 1.0,
    }
}

/// Monotonic milliseconds since construction.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

pub const fn pointer_kind(kind: TransitionKind) -> PointerKind {
    match kind {
        TransitionKind::Down => PointerKind::Down,
        TransitionKind::Move => PointerKind::Move,
        TransitionKind::Up => PointerKind::Up,
    }
}

/// Maps raw contact transitions of one device into pointer events.
#[derive(Clone, Debug)]
pub struct ContactNormalizer {
    x: AxisRange,
    y: AxisRange,
    pressure: Option<AxisRange>,
    multi_touch: bool,
}

impl ContactNormalizer {
    pub fn new(capabilities: &DeviceCapabilities) -> Self {
        Self {
            x: capabilities.x,
            y: capabilities.y,
            pressure: capabilities.pressure,
            multi_touch: capabilities.is_multi_touch(),
        }
    }

    pub fn to_pointer(&self, transition: &ContactTransition, timestamp_ms: u64) -> PointerEvent {
        let touch_id = if self.multi_touch {
            transition.slot as u32
        } else {
            0
        };
        PointerEvent::new(
            pointer_kind(transition.kind),
            touch_id,
            normalize_axis(transition.raw_x, self.x),
            normalize_axis(transition.raw_y, self.y),
            timestamp_ms,
            SourceLabel::Touch,
        )
        .with_pressure(normalize_pressure(transition.pressure_raw, self.pressure))
    }
}

/// Outcome of passing one event through the lifecycle guard.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Admission {
    Accepted(PointerEvent),
    /// Down for an id that was still down: release at its last position first.
    ImplicitRelease {
        release: PointerEvent,
        down: PointerEvent,
    },
    Rejected(PointerEvent),
}

impl Admission {
    pub fn events(&self) -> impl Iterator<Item = PointerEvent> {
        let (first, second) = match *self {
            Admission::Accepted(event) => (Some(event), None),
            Admission::ImplicitRelease { release, down } => (Some(release), Some(down)),
            Admission::Rejected(_) => (None, None),
        };
        first.into_iter().chain(second)
    }
}

/// Enforces `Down Move* Up` per `(source, touch_id)`.
#[derive(Debug, Default)]
pub struct LifecycleGuard {
    active: BTreeMap<(SourceLabel, u32), PointerEvent>,
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, source: SourceLabel, touch_id: u32) -> bool {
        self.active.contains_key(&(source, touch_id))
    }

    pub fn admit(&mut self, event: PointerEvent) -> Admission {
        let key = (event.source, event.touch_id);
        match event.kind {
            PointerKind::Down => match self.active.insert(key, event) {
                Some(last) => {
                    warn!(
                        "input: {} id={} went down twice, releasing first",
                        event.source, event.touch_id
                    );
                    let release = PointerEvent {
                        kind: PointerKind::Up,
                        timestamp_ms: event.timestamp_ms,
                        ..last
                    };
                    Admission::ImplicitRelease {
                        release,
                        down: event,
                    }
                }
                None => Admission::Accepted(event),
            },
            PointerKind::Move => match self.active.get_mut(&key) {
                Some(last) => {
                    *last = event;
                    Admission::Accepted(event)
                }
                None => self.reject(event),
            },
            PointerKind::Up => match self.active.remove(&key) {
                Some(_) => Admission::Accepted(event),
                None => self.reject(event),
            },
        }
    }

    /// Up for every id still down, at its last position.
    pub fn release_all(&mut self, timestamp_ms: u64) -> Vec<PointerEvent> {
        core::mem::take(&mut self.active)
            .into_values()
            .map(|last| PointerEvent {
                kind: PointerKind::Up,
                timestamp_ms,
                ..last
            })
            .collect()
    }

    fn reject(&self, event: PointerEvent) -> Admission {
        warn!(
            "input: rejected {} for {} id={} with no prior down",
            event.kind.label(),
            event.source,
            event.touch_id
        );
        Admission::Rejected(event)
    }
}
