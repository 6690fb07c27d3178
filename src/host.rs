//! Boundary with the host toolkit: its native event shape, and the pump/sink
//! traits the native source and `InputHandler::forward_to` talk through.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{
    InputEvent, KeyEvent, MouseAction, MouseButton, MouseEvent, PointerEvent, PointerKind,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NativeFinger {
    pub finger_id: u32,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NativeEvent {
    FingerDown(NativeFinger),
    FingerMotion(NativeFinger),
    FingerUp(NativeFinger),
    MouseButtonDown {
        button: MouseButton,
        x: i32,
        y: i32,
        timestamp_ms: u64,
    },
    MouseButtonUp {
        button: MouseButton,
        x: i32,
        y: i32,
        timestamp_ms: u64,
    },
    MouseMotion {
        x: i32,
        y: i32,
        timestamp_ms: u64,
    },
    KeyDown {
        scancode: u32,
        timestamp_ms: u64,
    },
    KeyUp {
        scancode: u32,
        timestamp_ms: u64,
    },
    /// Window, quit and other toolkit events the input layer passes over.
    Other,
}

/// Native event source of the host toolkit, drained on the consumer thread.
pub trait HostEventPump: Send {
    fn poll_event(&mut self) -> Option<NativeEvent>;
    fn touch_device_count(&self) -> usize;
}

/// Where processed events are injected back into the host toolkit.
pub trait HostEventSink {
    fn inject(&mut self, event: NativeEvent);
}

impl HostEventSink for Vec<NativeEvent> {
    fn inject(&mut self, event: NativeEvent) {
        self.push(event);
    }
}

/// Pump backed by an in-memory queue.
#[derive(Debug, Default)]
pub struct QueuedPump {
    events: VecDeque<NativeEvent>,
    touch_devices: usize,
}

impl QueuedPump {
    pub fn new(touch_devices: usize) -> Self {
        Self {
            events: VecDeque::new(),
            touch_devices,
        }
    }

    pub fn push(&mut self, event: NativeEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl HostEventPump for QueuedPump {
    fn poll_event(&mut self) -> Option<NativeEvent> {
        self.events.pop_front()
    }

    fn touch_device_count(&self) -> usize {
        self.touch_devices
    }
}

/// Normalized coordinates to reference-surface pixels, truncating.
pub fn to_pixels(x: f32, y: f32, reference: (u32, u32)) -> (i32, i32) {
    (
        (x * reference.0 as f32) as i32,
        (y * reference.1 as f32) as i32,
    )
}

/// Reference-surface pixels to normalized coordinates.
pub fn from_pixels(x: i32, y: i32, reference: (u32, u32)) -> (f32, f32) {
    let w = reference.0.max(1) as f32;
    let h = reference.1.max(1) as f32;
    ((x as f32 / w).clamp(0.0, 1.0), (y as f32 / h).clamp(0.0, 1.0))
}

/// Left-button mouse event mirroring a primary-contact pointer event.
pub fn emulate_mouse(event: &PointerEvent, reference: (u32, u32)) -> MouseEvent {
    let (x, y) = to_pixels(event.x, event.y, reference);
    let action = match event.kind {
        PointerKind::Down => MouseAction::ButtonDown(MouseButton::Left),
        PointerKind::Move => MouseAction::Motion,
        PointerKind::Up => MouseAction::ButtonUp(MouseButton::Left),
    };
    MouseEvent {
        action,
        x,
        y,
        timestamp_ms: event.timestamp_ms,
    }
}

pub fn native_finger(event: &PointerEvent) -> NativeFinger {
    NativeFinger {
        finger_id: event.touch_id,
        x: event.x,
        y: event.y,
        pressure: event.pressure,
        timestamp_ms: event.timestamp_ms,
    }
}

pub fn to_native(event: &InputEvent) -> NativeEvent {
    match event {
        InputEvent::Pointer(pointer) => {
            let finger = native_finger(pointer);
            match pointer.kind {
                PointerKind::Down => NativeEvent::FingerDown(finger),
                PointerKind::Move => NativeEvent::FingerMotion(finger),
                PointerKind::Up => NativeEvent::FingerUp(finger),
            }
        }
        InputEvent::Mouse(MouseEvent {
            action,
            x,
            y,
            timestamp_ms,
        }) => match *action {
            MouseAction::ButtonDown(button) => NativeEvent::MouseButtonDown {
                button,
                x: *x,
                y: *y,
                timestamp_ms: *timestamp_ms,
            },
            MouseAction::ButtonUp(button) => NativeEvent::MouseButtonUp {
                button,
                x: *x,
                y: *y,
                timestamp_ms: *timestamp_ms,
            },
            MouseAction::Motion => NativeEvent::MouseMotion {
                x: *x,
                y: *y,
                timestamp_ms: *timestamp_ms,
            },
        },
        InputEvent::Key(KeyEvent {
            scancode,
            pressed,
            timestamp_ms,
        }) => {
            if *pressed {
                NativeEvent::KeyDown {
                    scancode: *scancode,
                    timestamp_ms: *timestamp_ms,
                }
            } else {
                NativeEvent::KeyUp {
                    scancode: *scancode,
                    timestamp_ms: *timestamp_ms,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceLabel;

    #[test]
    fn pointer_fields_map_bit_exactly() {
        let pointer = PointerEvent::new(
            PointerKind::Move,
            4,
            0.123_456,
            0.987_654,
            77,
            SourceLabel::Touch,
        )
        .with_pressure(0.333);
        let NativeEvent::FingerMotion(finger) = to_native(&pointer.into()) else {
            panic!("expected finger motion");
        };
        assert_eq!(finger.finger_id, 4);
        assert_eq!(finger.x.to_bits(), pointer.x.to_bits());
        assert_eq!(finger.y.to_bits(), pointer.y.to_bits());
        assert_eq!(finger.pressure.to_bits(), pointer.pressure.to_bits());
        assert_eq!(finger.timestamp_ms, 77);
    }

    #[test]
    fn mouse_emulation_uses_reference_size() {
        let pointer = PointerEvent::new(PointerKind::Down, 0, 0.5, 0.999, 5, SourceLabel::Touch);
        let mouse = emulate_mouse(&pointer, (800, 480));
        assert_eq!(mouse.action, MouseAction::ButtonDown(MouseButton::Left));
        assert_eq!((mouse.x, mouse.y), (400, 479));

        let mouse = emulate_mouse(&pointer.with_kind(PointerKind::Up), (1024, 600));
        assert_eq!(mouse.action, MouseAction::ButtonUp(MouseButton::Left));
        assert_eq!((mouse.x, mouse.y), (512, 599));
    }

    #[test]
    fn keys_map_to_key_down_and_up() {
        let key = KeyEvent {
            scancode: 30,
            pressed: false,
            timestamp_ms: 1,
        };
        assert_eq!(
            to_native(&key.into()),
            NativeEvent::KeyUp {
                scancode: 30,
                timestamp_ms: 1
            }
        );
    }

    #[test]
    fn pixels_round_trip_within_one_pixel() {
        let (nx, ny) = from_pixels(200, 120, (800, 480));
        assert_eq!((nx, ny), (0.25, 0.25));
        assert_eq!(to_pixels(nx, ny, (800, 480)), (200, 120));
    }

    #[test]
    fn queued_pump_is_fifo() {
        let mut pump = QueuedPump::new(1);
        pump.push(NativeEvent::Other);
        pump.push(NativeEvent::KeyDown {
            scancode: 1,
            timestamp_ms: 0,
        });
        assert_eq!(pump.len(), 2);
        assert_eq!(pump.poll_event(), Some(NativeEvent::Other));
        assert!(matches!(pump.poll_event(), Some(NativeEvent::KeyDown { .. })));
        assert!(pump.is_empty());
    }
}
