use core::fmt;

use bitflags::bitflags;
use log::debug;

use super::{
    codes::{
        abs_axis_label, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE, ABS_MT_SLOT,
        ABS_PRESSURE, ABS_X, ABS_Y, BTN_LEFT, EV_ABS, KEY_A, KEY_ENTER,
    },
    contacts::MAX_SLOTS,
    query::DeviceQuery,
};
use crate::error::{InputError, Result};

bitflags! {
    /// Event types advertised by a device (`EV_*` bit positions).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventTypes: u32 {
        const SYN = 1 << 0x00;
        const KEY = 1 << 0x01;
        const REL = 1 << 0x02;
        const ABS = 1 << 0x03;
        const MSC = 1 << 0x04;
        const SW = 1 << 0x05;
        const LED = 1 << 0x11;
        const SND = 1 << 0x12;
        const REP = 1 << 0x14;
        const FF = 1 << 0x15;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u8 {
        const TOUCH = 1 << 0;
        const MOUSE = 1 << 1;
        const KEYBOARD = 1 << 2;
        const PRESSURE = 1 << 3;
        const MULTI_TOUCH = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub const fn span(&self) -> i64 {
        self.max as i64 - self.min as i64
    }

    pub fn normalize(&self, raw: i32) -> f32 {
        crate::normalize::normalize_axis(raw, *self)
    }
}

impl fmt::Display for AxisRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.min, self.max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// Type B: slotted contacts with tracking ids.
    MultiTouchSlots,
    /// Type A: anonymous contacts separated by `SYN_MT_REPORT`.
    MultiTouchAnonymous,
    /// `ABS_X`/`ABS_Y` with `BTN_TOUCH`, one permanent slot 0.
    SingleTouch,
}

impl Protocol {
    pub const fn label(self) -> &'static str {
        match self {
            Protocol::MultiTouchSlots => "mt-slots",
            Protocol::MultiTouchAnonymous => "mt-anonymous",
            Protocol::SingleTouch => "single-touch",
        }
    }

    pub const fn is_multi_touch(self) -> bool {
        !matches!(self, Protocol::SingleTouch)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub name: String,
    pub event_types: EventTypes,
    pub flags: CapabilityFlags,
    pub protocol: Protocol,
    pub x: AxisRange,
    pub y: AxisRange,
    pub pressure: Option<AxisRange>,
    pub slot_count: usize,
}

impl DeviceCapabilities {
    /// Type B panel with zero-based axes, for dumps read away from the device.
    pub fn slotted_panel(x_max: i32, y_max: i32, slot_count: usize) -> Self {
        Self {
            name: "recorded panel".into(),
            event_types: EventTypes::SYN | EventTypes::KEY | EventTypes::ABS,
            flags: CapabilityFlags::TOUCH | CapabilityFlags::MULTI_TOUCH,
            protocol: Protocol::MultiTouchSlots,
            x: AxisRange::new(0, x_max),
            y: AxisRange::new(0, y_max),
            pressure: None,
            slot_count: slot_count.clamp(1, MAX_SLOTS),
        }
    }

    pub fn is_multi_touch(&self) -> bool {
        self.flags.contains(CapabilityFlags::MULTI_TOUCH)
    }

    pub fn has_pressure(&self) -> bool {
        self.pressure.is_some()
    }
}

impl fmt::Display for DeviceCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name=\"{}\" protocol={} slots={} x={} y={}",
            self.name,
            self.protocol.label(),
            self.slot_count,
            self.x,
            self.y
        )?;
        match self.pressure {
            Some(range) => write!(f, " pressure={range}")?,
            None => f.write_str(" pressure=none")?,
        }
        write!(f, " flags={:?} events={:?}", self.flags, self.event_types)
    }
}

const fn has_axis(mask: u64, axis: u16) -> bool {
    axis < 64 && mask & (1u64 << axis) != 0
}

fn axis_range(query: &dyn DeviceQuery, axis: u16) -> Result<AxisRange> {
    let (min, max) = query.abs_range(axis).ok_or_else(|| {
        InputError::not_touch(format!("no range reported for {}", abs_axis_label(axis)))
    })?;
    if max <= min {
        return Err(InputError::not_touch(format!(
            "degenerate {} range [{min}..{max}]",
            abs_axis_label(axis)
        )));
    }
    Ok(AxisRange::new(min, max))
}

/// Decodes the device's capability masks into `DeviceCapabilities`.
///
/// Multi-touch position axes win over legacy `ABS_X`/`ABS_Y` when both are
/// advertised.
pub fn probe_capabilities(query: &dyn DeviceQuery) -> Result<DeviceCapabilities> {
    let event_types = EventTypes::from_bits_retain(query.event_types());
    if query.event_types() & (1u32 << EV_ABS) == 0 {
        return Err(InputError::not_touch("no EV_ABS support"));
    }

    let axes = query.abs_axes();
    let mt = has_axis(axes, ABS_MT_POSITION_X) && has_axis(axes, ABS_MT_POSITION_Y);
    let legacy = has_axis(axes, ABS_X) && has_axis(axes, ABS_Y);

    let (protocol, x_axis, y_axis, pressure_axis) = if mt {
        let protocol = if has_axis(axes, ABS_MT_SLOT) {
            Protocol::MultiTouchSlots
        } else {
            Protocol::MultiTouchAnonymous
        };
        (protocol, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE)
    } else if legacy {
        (Protocol::SingleTouch, ABS_X, ABS_Y, ABS_PRESSURE)
    } else {
        return Err(InputError::not_touch("missing X/Y absolute axes"));
    };

    let x = axis_range(query, x_axis)?;
    let y = axis_range(query, y_axis)?;
    let pressure = if has_axis(axes, pressure_axis) {
        match axis_range(query, pressure_axis) {
            Ok(range) => Some(range),
            Err(err) => {
                debug!("input: ignoring pressure axis: {err}");
                None
            }
        }
    } else {
        None
    };

    let slot_count = match protocol {
        Protocol::SingleTouch => 1,
        Protocol::MultiTouchAnonymous => MAX_SLOTS,
        Protocol::MultiTouchSlots => query
            .abs_range(ABS_MT_SLOT)
            .map(|(_, max)| (max.max(0) as usize).saturating_add(1))
            .unwrap_or(MAX_SLOTS)
            .clamp(1, MAX_SLOTS),
    };

    let mut flags = CapabilityFlags::TOUCH;
    if protocol.is_multi_touch() {
        flags |= CapabilityFlags::MULTI_TOUCH;
    }
    if pressure.is_some() {
        flags |= CapabilityFlags::PRESSURE;
    }
    if event_types.contains(EventTypes::REL) && query.has_key(BTN_LEFT) {
        flags |= CapabilityFlags::MOUSE;
    }
    if query.has_key(KEY_A) && query.has_key(KEY_ENTER) {
        flags |= CapabilityFlags::KEYBOARD;
    }

    Ok(DeviceCapabilities {
        name: query.name().unwrap_or_else(|| "unknown".to_string()),
        event_types,
        flags,
        protocol,
        x,
        y,
        pressure,
        slot_count,
    })
}

#[cfg(test)]
mod tests;
