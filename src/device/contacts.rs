use log::warn;

use super::{
    codes::{
        ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE, ABS_MT_SLOT, ABS_MT_TRACKING_ID,
        ABS_PRESSURE, ABS_X, ABS_Y, BTN_TOUCH, EV_ABS, EV_KEY, EV_SYN, SYN_DROPPED,
        SYN_MT_REPORT, SYN_REPORT, TRACKING_ID_NONE,
    },
    probe::Protocol,
    record::InputRecord,
};

pub const MAX_SLOTS: usize = 10;
const FRAME_TRANSITION_CAPACITY: usize = MAX_SLOTS * 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchContact {
    pub slot_index: usize,
    pub tracking_id: i32,
    pub raw_x: i32,
    pub raw_y: i32,
    pub pressure_raw: Option<i32>,
    pub active: bool,
    pub down_emitted: bool,
}

impl TouchContact {
    const fn empty(slot_index: usize) -> Self {
        Self {
            slot_index,
            tracking_id: TRACKING_ID_NONE,
            raw_x: 0,
            raw_y: 0,
            pressure_raw: None,
            active: false,
            down_emitted: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    Down,
    Move,
    Up,
}

/// One slot change surfaced at a `SYN_REPORT` boundary, still in raw units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactTransition {
    pub kind: TransitionKind,
    pub slot: usize,
    pub raw_x: i32,
    pub raw_y: i32,
    pub pressure_raw: Option<i32>,
    pub time_us: u64,
}

pub type FrameTransitions = heapless::Vec<ContactTransition, FRAME_TRANSITION_CAPACITY>;

/// Per-slot contact state for one device. Owned by the reader thread.
pub struct ContactTracker {
    protocol: Protocol,
    slot_count: usize,
    slots: [TouchContact; MAX_SLOTS],
    current_slot: Option<usize>,
    // Up owed to the previous contact of a slot whose tracking id was
    // replaced inside the current frame.
    replaced: [Option<TouchContact>; MAX_SLOTS],
    anonymous_index: usize,
    anonymous_pending: bool,
    anonymous_seen: [bool; MAX_SLOTS],
    dropped: bool,
    dropped_frames: u32,
}

impl ContactTracker {
    pub fn new(protocol: Protocol, slot_count: usize) -> Self {
        let slot_count = match protocol {
            Protocol::SingleTouch => 1,
            _ => slot_count.clamp(1, MAX_SLOTS),
        };
        Self {
            protocol,
            slot_count,
            slots: core::array::from_fn(TouchContact::empty),
            current_slot: Some(0),
            replaced: [None; MAX_SLOTS],
            anonymous_index: 0,
            anonymous_pending: false,
            anonymous_seen: [false; MAX_SLOTS],
            dropped: false,
            dropped_frames: 0,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn contacts(&self) -> &[TouchContact] {
        &self.slots[..self.slot_count]
    }

    pub fn active_count(&self) -> usize {
        self.contacts().iter().filter(|c| c.active).count()
    }

    pub fn dropped_frames(&self) -> u32 {
        self.dropped_frames
    }

    /// Feeds one record. Returns the frame's transitions on `SYN_REPORT`.
    pub fn process(&mut self, record: &InputRecord) -> Option<FrameTransitions> {
        if record.kind == EV_SYN {
            return self.on_sync(record);
        }
        if self.dropped {
            return None;
        }
        match record.kind {
            EV_ABS => self.on_abs(record.code, record.value),
            EV_KEY if record.code == BTN_TOUCH && self.protocol == Protocol::SingleTouch => {
                self.on_touch_button(record.value != 0);
            }
            _ => {}
        }
        None
    }

    /// Up for every contact that already surfaced a Down.
    pub fn release_all(&mut self, time_us: u64) -> FrameTransitions {
        let mut out = FrameTransitions::new();
        for slot in 0..self.slot_count {
            if let Some(previous) = self.replaced[slot].take() {
                let _ = out.push(transition(TransitionKind::Up, &previous, time_us));
            }
            let contact = &mut self.slots[slot];
            if contact.down_emitted {
                let _ = out.push(transition(TransitionKind::Up, contact, time_us));
            }
            *contact = TouchContact::empty(slot);
        }
        out
    }

    fn slot_mut(&mut self) -> Option<&mut TouchContact> {
        let slot = match self.protocol {
            Protocol::MultiTouchSlots => self.current_slot?,
            Protocol::MultiTouchAnonymous => {
                if self.anonymous_index >= self.slot_count {
                    return None;
                }
                self.anonymous_pending = true;
                self.anonymous_index
            }
            Protocol::SingleTouch => 0,
        };
        debug_assert!(slot < MAX_SLOTS, "contact slot {slot} out of range");
        self.slots.get_mut(slot)
    }

    fn on_abs(&mut self, code: u16, value: i32) {
        let single = self.protocol == Protocol::SingleTouch;
        match code {
            ABS_MT_SLOT if self.protocol == Protocol::MultiTouchSlots => {
                self.current_slot = usize::try_from(value)
                    .ok()
                    .filter(|slot| *slot < self.slot_count);
                if self.current_slot.is_none() {
                    warn!("input: ignoring updates for slot {value}");
                }
            }
            ABS_MT_TRACKING_ID if self.protocol == Protocol::MultiTouchSlots => {
                self.on_tracking_id(value)
            }
            ABS_MT_POSITION_X if !single => {
                if let Some(contact) = self.slot_mut() {
                    contact.raw_x = value;
                }
            }
            ABS_MT_POSITION_Y if !single => {
                if let Some(contact) = self.slot_mut() {
                    contact.raw_y = value;
                }
            }
            ABS_MT_PRESSURE if !single => {
                if let Some(contact) = self.slot_mut() {
                    contact.pressure_raw = Some(value);
                }
            }
            ABS_X if single => self.slots[0].raw_x = value,
            ABS_Y if single => self.slots[0].raw_y = value,
            ABS_PRESSURE if single => self.slots[0].pressure_raw = Some(value),
            _ => {}
        }
    }

    fn on_tracking_id(&mut self, tracking_id: i32) {
        let Some(slot) = self.current_slot else {
            return;
        };
        let contact = self.slots[slot];
        if tracking_id == TRACKING_ID_NONE {
            self.slots[slot].active = false;
            return;
        }
        if contact.active && contact.tracking_id == tracking_id {
            return;
        }
        if contact.down_emitted {
            self.replaced[slot] = Some(contact);
        }
        let contact = &mut self.slots[slot];
        contact.tracking_id = tracking_id;
        contact.active = true;
        contact.down_emitted = false;
    }

    fn on_touch_button(&mut self, pressed: bool) {
        let contact = &mut self.slots[0];
        if pressed && !contact.active {
            contact.tracking_id = 0;
            contact.active = true;
            contact.down_emitted = false;
        } else if !pressed {
            contact.active = false;
        }
    }

    fn on_sync(&mut self, record: &InputRecord) -> Option<FrameTransitions> {
        match record.code {
            SYN_DROPPED => {
                self.dropped = true;
                self.dropped_frames = self.dropped_frames.saturating_add(1);
                self.reset_anonymous_frame();
                None
            }
            SYN_MT_REPORT if !self.dropped => {
                self.on_anonymous_report();
                None
            }
            SYN_REPORT if self.dropped => {
                self.dropped = false;
                None
            }
            SYN_REPORT => Some(self.finish_frame(record.time_us)),
            _ => None,
        }
    }

    fn on_anonymous_report(&mut self) {
        // A bare SYN_MT_REPORT is the "no contacts" frame.
        if self.protocol != Protocol::MultiTouchAnonymous || !self.anonymous_pending {
            return;
        }
        self.anonymous_pending = false;
        let index = self.anonymous_index;
        if let Some(contact) = self.slots[..self.slot_count].get_mut(index) {
            if !contact.active {
                contact.tracking_id = index as i32;
                contact.active = true;
                contact.down_emitted = false;
            }
            self.anonymous_seen[index] = true;
        }
        self.anonymous_index = self.anonymous_index.saturating_add(1);
    }

    fn reset_anonymous_frame(&mut self) {
        self.anonymous_index = 0;
        self.anonymous_pending = false;
        self.anonymous_seen = [false; MAX_SLOTS];
    }

    fn finish_frame(&mut self, time_us: u64) -> FrameTransitions {
        if self.protocol == Protocol::MultiTouchAnonymous {
            for slot in 0..self.slot_count {
                if !self.anonymous_seen[slot] {
                    self.slots[slot].active = false;
                }
            }
            self.reset_anonymous_frame();
        }

        let mut out = FrameTransitions::new();
        for slot in 0..self.slot_count {
            if let Some(previous) = self.replaced[slot].take() {
                let _ = out.push(transition(TransitionKind::Up, &previous, time_us));
            }
            let contact = &mut self.slots[slot];
            if contact.active {
                let kind = if contact.down_emitted {
                    TransitionKind::Move
                } else {
                    contact.down_emitted = true;
                    TransitionKind::Down
                };
                let _ = out.push(transition(kind, contact, time_us));
            } else if contact.down_emitted {
                contact.down_emitted = false;
                let _ = out.push(transition(TransitionKind::Up, contact, time_us));
            }
        }
        out
    }
}

fn transition(kind: TransitionKind, contact: &TouchContact, time_us: u64) -> ContactTransition {
    ContactTransition {
        kind,
        slot: contact.slot_index,
        raw_x: contact.raw_x,
        raw_y: contact.raw_y,
        pressure_raw: contact.pressure_raw,
        time_us,
    }
}
