//! Linux input subsystem constants (`linux/input-event-codes.h`).

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;
pub const EV_MSC: u16 = 0x04;
pub const EV_MAX: u16 = 0x1f;

pub const SYN_REPORT: u16 = 0;
pub const SYN_MT_REPORT: u16 = 2;
pub const SYN_DROPPED: u16 = 3;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_PRESSURE: u16 = 0x18;
pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_TOUCH_MAJOR: u16 = 0x30;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;
pub const ABS_MT_PRESSURE: u16 = 0x3a;
pub const ABS_MAX: u16 = 0x3f;

pub const KEY_A: u16 = 30;
pub const KEY_ENTER: u16 = 28;
pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_TOUCH: u16 = 0x14a;

pub const TRACKING_ID_NONE: i32 = -1;

pub const fn event_type_label(kind: u16) -> &'static str {
    match kind {
        EV_SYN => "EV_SYN",
        EV_KEY => "EV_KEY",
        EV_REL => "EV_REL",
        EV_ABS => "EV_ABS",
        EV_MSC => "EV_MSC",
        _ => "EV_?",
    }
}

pub const fn abs_axis_label(axis: u16) -> &'static str {
    match axis {
        ABS_X => "ABS_X",
        ABS_Y => "ABS_Y",
        ABS_PRESSURE => "ABS_PRESSURE",
        ABS_MT_SLOT => "ABS_MT_SLOT",
        ABS_MT_TOUCH_MAJOR => "ABS_MT_TOUCH_MAJOR",
        ABS_MT_POSITION_X => "ABS_MT_POSITION_X",
        ABS_MT_POSITION_Y => "ABS_MT_POSITION_Y",
        ABS_MT_TRACKING_ID => "ABS_MT_TRACKING_ID",
        ABS_MT_PRESSURE => "ABS_MT_PRESSURE",
        _ => "ABS_?",
    }
}
