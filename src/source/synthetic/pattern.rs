use core::f64::consts::TAU;

use crate::{config::SyntheticPattern, types::PointerKind};

pub const TAP_PRESS_MS: u64 = 80;

const CENTRE: f64 = 0.5;
const SWIPE_START_X: f64 = 0.1;
const SWIPE_END_X: f64 = 0.9;
const CIRCLE_RADIUS: f64 = 0.25;
const PINCH_START_OFFSET: f64 = 0.3;
const PINCH_END_OFFSET: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticContact {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

impl SyntheticContact {
    fn at(id: u32, x: f64, y: f64) -> Self {
        Self {
            id,
            x: x as f32,
            y: y as f32,
        }
    }
}

pub type Contacts = heapless::Vec<SyntheticContact, 2>;
pub type FrameEvents = heapless::Vec<(PointerKind, SyntheticContact), 4>;

fn lerp(from: f64, to: f64, progress: f64) -> f64 {
    from + (to - from) * progress
}

/// Contacts of `pattern` at `t_ms` into a cycle of `duration_ms`.
pub fn contacts_at(pattern: SyntheticPattern, t_ms: u64, duration_ms: u64) -> Contacts {
    let duration_ms = duration_ms.max(1);
    let t_ms = t_ms.min(duration_ms);
    let progress = t_ms as f64 / duration_ms as f64;
    let mut contacts = Contacts::new();
    match pattern {
        SyntheticPattern::Tap => {
            if t_ms < TAP_PRESS_MS.min(duration_ms) {
                let _ = contacts.push(SyntheticContact::at(0, CENTRE, CENTRE));
            }
        }
        SyntheticPattern::Swipe => {
            let x = lerp(SWIPE_START_X, SWIPE_END_X, progress);
            let _ = contacts.push(SyntheticContact::at(0, x, CENTRE));
        }
        SyntheticPattern::Circle => {
            let theta = TAU * progress;
            let _ = contacts.push(SyntheticContact::at(
                0,
                CENTRE + CIRCLE_RADIUS * theta.cos(),
                CENTRE + CIRCLE_RADIUS * theta.sin(),
            ));
        }
        SyntheticPattern::Pinch => {
            let offset = lerp(PINCH_START_OFFSET, PINCH_END_OFFSET, progress);
            let _ = contacts.push(SyntheticContact::at(0, CENTRE - offset, CENTRE));
            let _ = contacts.push(SyntheticContact::at(1, CENTRE + offset, CENTRE));
        }
    }
    contacts
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub t_ms: u64,
    pub contacts: Contacts,
    /// `t_ms == duration`: everything still down is released here.
    pub last: bool,
}

/// Frames at `0, interval, 2 * interval, ...` below the duration, then one
/// closing frame at exactly the duration.
pub struct PatternFrames {
    pattern: SyntheticPattern,
    interval_ms: u64,
    duration_ms: u64,
    next_ms: Option<u64>,
}

impl PatternFrames {
    pub fn new(pattern: SyntheticPattern, interval_ms: u64, duration_ms: u64) -> Self {
        Self {
            pattern,
            interval_ms: interval_ms.max(1),
            duration_ms: duration_ms.max(1),
            next_ms: Some(0),
        }
    }
}

impl Iterator for PatternFrames {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let t_ms = self.next_ms?;
        let last = t_ms >= self.duration_ms;
        self.next_ms = if last {
            None
        } else {
            Some(t_ms.saturating_add(self.interval_ms).min(self.duration_ms))
        };
        Some(Frame {
            t_ms,
            contacts: contacts_at(self.pattern, t_ms, self.duration_ms),
            last,
        })
    }
}

/// Turns successive frames into Down/Move/Up per contact id.
#[derive(Debug, Default)]
pub struct FrameDiff {
    previous: Contacts,
}

impl FrameDiff {
    pub fn apply(&mut self, frame: &Frame) -> FrameEvents {
        let mut events = FrameEvents::new();
        let find = |contacts: &Contacts, id: u32| contacts.iter().find(|c| c.id == id).copied();

        if frame.last {
            for previous in &self.previous {
                let at = find(&frame.contacts, previous.id).unwrap_or(*previous);
                let _ = events.push((PointerKind::Up, at));
            }
            self.previous.clear();
            return events;
        }

        for previous in &self.previous {
            if find(&frame.contacts, previous.id).is_none() {
                let _ = events.push((PointerKind::Up, *previous));
            }
        }
        for contact in &frame.contacts {
            let kind = match find(&self.previous, contact.id) {
                Some(_) => PointerKind::Move,
                None => PointerKind::Down,
            };
            let _ = events.push((kind, *contact));
        }
        self.previous = frame.contacts.clone();
        events
    }
}
