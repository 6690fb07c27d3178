use log::{debug, info};

use super::{InputSource, SourceCapabilities, SourceStatus, StatusCell};
use crate::{
    config::{InputConfig, SourceKind},
    device::{contacts::MAX_SLOTS, probe::CapabilityFlags},
    error::{InputError, Result},
    handler::sink::EventSink,
    host::{from_pixels, HostEventPump, NativeEvent, NativeFinger},
    types::{
        InputEvent, KeyEvent, MouseAction, MouseButton, MouseEvent, PointerEvent, PointerKind,
        SourceLabel,
    },
};

/// Passes the host toolkit's own events through. No thread: `poll` drains the
/// pump on the consumer thread.
pub struct NativeSource {
    pump: Option<Box<dyn HostEventPump>>,
    sink: Option<EventSink>,
    reference: (u32, u32),
    left_held: bool,
    status: StatusCell,
}

impl NativeSource {
    pub fn new(pump: Option<Box<dyn HostEventPump>>) -> Self {
        Self {
            pump,
            sink: None,
            reference: (1, 1),
            left_held: false,
            status: StatusCell::default(),
        }
    }

    fn translate(&mut self, event: NativeEvent, now_ms: u64) -> Option<InputEvent> {
        let finger = |kind: PointerKind, finger: NativeFinger| -> InputEvent {
            PointerEvent::new(
                kind,
                finger.finger_id,
                finger.x,
                finger.y,
                now_ms,
                SourceLabel::Touch,
            )
            .with_pressure(finger.pressure)
            .into()
        };
        let mouse = |kind: PointerKind, x: i32, y: i32, reference: (u32, u32)| -> InputEvent {
            let (nx, ny) = from_pixels(x, y, reference);
            PointerEvent::new(kind, 0, nx, ny, now_ms, SourceLabel::Mouse).into()
        };
        let raw_mouse = |action: MouseAction, x: i32, y: i32| -> InputEvent {
            MouseEvent {
                action,
                x,
                y,
                timestamp_ms: now_ms,
            }
            .into()
        };

        match event {
            NativeEvent::FingerDown(f) => Some(finger(PointerKind::Down, f)),
            NativeEvent::FingerMotion(f) => Some(finger(PointerKind::Move, f)),
            NativeEvent::FingerUp(f) => Some(finger(PointerKind::Up, f)),
            NativeEvent::MouseButtonDown {
                button: MouseButton::Left,
                x,
                y,
                ..
            } => {
                self.left_held = true;
                Some(mouse(PointerKind::Down, x, y, self.reference))
            }
            NativeEvent::MouseButtonUp {
                button: MouseButton::Left,
                x,
                y,
                ..
            } => {
                self.left_held = false;
                Some(mouse(PointerKind::Up, x, y, self.reference))
            }
            NativeEvent::MouseMotion { x, y, .. } if self.left_held => {
                Some(mouse(PointerKind::Move, x, y, self.reference))
            }
            NativeEvent::MouseMotion { x, y, .. } => Some(raw_mouse(MouseAction::Motion, x, y)),
            NativeEvent::MouseButtonDown { button, x, y, .. } => {
                Some(raw_mouse(MouseAction::ButtonDown(button), x, y))
            }
            NativeEvent::MouseButtonUp { button, x, y, .. } => {
                Some(raw_mouse(MouseAction::ButtonUp(button), x, y))
            }
            NativeEvent::KeyDown { scancode, .. } => Some(
                KeyEvent {
                    scancode,
                    pressed: true,
                    timestamp_ms: now_ms,
                }
                .into(),
            ),
            NativeEvent::KeyUp { scancode, .. } => Some(
                KeyEvent {
                    scancode,
                    pressed: false,
                    timestamp_ms: now_ms,
                }
                .into(),
            ),
            NativeEvent::Other => None,
        }
    }
}

impl InputSource for NativeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Native
    }

    fn initialize(&mut self, config: &InputConfig) -> Result<()> {
        if self.pump.is_none() {
            return Err(InputError::config("native source needs a host event pump"));
        }
        self.reference = config.reference_size();
        self.status.set(SourceStatus::Initialized);
        Ok(())
    }

    fn start(&mut self, sink: EventSink) -> Result<()> {
        match self.status.get() {
            SourceStatus::Idle => return Err(InputError::NotInitialized),
            SourceStatus::Running => return Err(InputError::AlreadyRunning),
            _ => {}
        }
        self.sink = Some(sink);
        self.left_held = false;
        self.status.set(SourceStatus::Running);
        info!("input: native passthrough started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.sink.take().is_some() {
            self.status.set(SourceStatus::Stopped);
            info!("input: native passthrough stopped");
        }
    }

    /// Pulls until the pump is empty or the sink has no room left.
    fn poll(&mut self) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        while sink.has_capacity(2) {
            let Some(native) = self.pump.as_mut().and_then(|pump| pump.poll_event()) else {
                break;
            };
            let Some(event) = self.translate(native, sink.now_ms()) else {
                continue;
            };
            if let Err(err) = sink.push_event(event) {
                debug!("input: native passthrough paused: {err}");
                break;
            }
        }
    }

    fn capabilities(&self) -> SourceCapabilities {
        let touch_devices = self
            .pump
            .as_ref()
            .map_or(0, |pump| pump.touch_device_count());
        let mut flags = CapabilityFlags::MOUSE | CapabilityFlags::KEYBOARD;
        if touch_devices > 0 {
            flags |= CapabilityFlags::TOUCH | CapabilityFlags::MULTI_TOUCH;
        }
        SourceCapabilities {
            kind: SourceKind::Native,
            flags,
            max_contacts: if touch_devices > 0 { MAX_SLOTS } else { 1 },
            device: None,
        }
    }

    fn cleanup(&mut self) {
        self.stop();
        self.status.set(SourceStatus::Idle);
    }

    fn status(&self) -> SourceStatus {
        self.status.get()
    }
}
