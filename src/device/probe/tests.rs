use super::*;
use crate::device::{codes::*, fake::FakeDevice};

#[test]
fn slotted_panel_reports_mt_ranges_and_slot_count() {
    let caps = probe_capabilities(&FakeDevice::mt_panel()).unwrap();
    assert_eq!(caps.protocol, Protocol::MultiTouchSlots);
    assert_eq!(caps.x, AxisRange::new(0, 4095));
    assert_eq!(caps.y, AxisRange::new(0, 4095));
    assert_eq!(caps.pressure, Some(AxisRange::new(0, 255)));
    assert_eq!(caps.slot_count, 2);
    assert!(caps.flags.contains(
        CapabilityFlags::TOUCH | CapabilityFlags::MULTI_TOUCH | CapabilityFlags::PRESSURE
    ));
    assert!(!caps.flags.contains(CapabilityFlags::MOUSE));
    assert!(caps.event_types.contains(EventTypes::ABS | EventTypes::KEY));
}

#[test]
fn legacy_axes_become_single_slot() {
    let caps = probe_capabilities(&FakeDevice::single_touch()).unwrap();
    assert_eq!(caps.protocol, Protocol::SingleTouch);
    assert_eq!(caps.slot_count, 1);
    assert_eq!(caps.x, AxisRange::new(100, 3900));
    assert!(caps.pressure.is_none());
    assert!(!caps.is_multi_touch());
}

#[test]
fn mt_axes_without_slot_axis_are_protocol_a() {
    let device = FakeDevice::new("type-a")
        .with_axis(ABS_MT_POSITION_X, 0, 1023)
        .with_axis(ABS_MT_POSITION_Y, 0, 599);
    let caps = probe_capabilities(&device).unwrap();
    assert_eq!(caps.protocol, Protocol::MultiTouchAnonymous);
    assert_eq!(caps.slot_count, MAX_SLOTS);
}

#[test]
fn slot_count_is_clamped() {
    let device = FakeDevice::mt_panel().with_axis(ABS_MT_SLOT, 0, 40);
    let caps = probe_capabilities(&device).unwrap();
    assert_eq!(caps.slot_count, MAX_SLOTS);
}

#[test]
fn keyboard_without_abs_is_rejected() {
    let err = probe_capabilities(&FakeDevice::keyboard()).unwrap_err();
    assert!(matches!(err, InputError::NotATouchDevice { .. }));
}

#[test]
fn missing_y_axis_is_rejected() {
    let device = FakeDevice::new("half").with_axis(ABS_MT_POSITION_X, 0, 100);
    assert!(matches!(
        probe_capabilities(&device),
        Err(InputError::NotATouchDevice { .. })
    ));
}

#[test]
fn degenerate_range_is_rejected() {
    let device = FakeDevice::new("flat")
        .with_axis(ABS_X, 0, 0)
        .with_axis(ABS_Y, 0, 100);
    assert!(matches!(
        probe_capabilities(&device),
        Err(InputError::NotATouchDevice { reason }) if reason.contains("ABS_X")
    ));
}

#[test]
fn mouse_and_keyboard_flags_follow_keys() {
    let device = FakeDevice::single_touch()
        .with_event_type(EV_REL)
        .with_key(BTN_LEFT)
        .with_key(KEY_A)
        .with_key(KEY_ENTER);
    let caps = probe_capabilities(&device).unwrap();
    assert!(caps
        .flags
        .contains(CapabilityFlags::MOUSE | CapabilityFlags::KEYBOARD));
}

#[test]
fn probing_is_repeatable() {
    let device = FakeDevice::mt_panel();
    assert_eq!(
        probe_capabilities(&device).unwrap(),
        probe_capabilities(&device).unwrap()
    );
}
