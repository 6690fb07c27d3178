use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

impl PointerKind {
    pub const fn label(self) -> &'static str {
        match self {
            PointerKind::Down => "down",
            PointerKind::Move => "move",
            PointerKind::Up => "up",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "down" => Some(PointerKind::Down),
            "move" => Some(PointerKind::Move),
            "up" => Some(PointerKind::Up),
            _ => None,
        }
    }
}

/// Which kind of producer a pointer event came from. Diagnostic only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLabel {
    Mouse,
    Touch,
    Mock,
}

impl SourceLabel {
    pub const fn label(self) -> &'static str {
        match self {
            SourceLabel::Mouse => "mouse",
            SourceLabel::Touch => "touch",
            SourceLabel::Mock => "mock",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "mouse" => Some(SourceLabel::Mouse),
            "touch" => Some(SourceLabel::Touch),
            "mock" => Some(SourceLabel::Mock),
            _ => None,
        }
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Source-agnostic pointer sample. Coordinates are normalized to the unit
/// square with the origin at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub touch_id: u32,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
    pub timestamp_ms: u64,
    pub source: SourceLabel,
}

impl PointerEvent {
    pub fn new(
        kind: PointerKind,
        touch_id: u32,
        x: f32,
        y: f32,
        timestamp_ms: u64,
        source: SourceLabel,
    ) -> Self {
        Self {
            kind,
            touch_id,
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            pressure: 1.0,
            timestamp_ms,
            source,
        }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = pressure.clamp(0.0, 1.0);
        self
    }

    pub fn with_kind(mut self, kind: PointerKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseAction {
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    Motion,
}

/// Pixel-space mouse event, produced by mouse emulation of the primary contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseEvent {
    pub action: MouseAction,
    pub x: i32,
    pub y: i32,
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub scancode: u32,
    pub pressed: bool,
    pub timestamp_ms: u64,
}

/// Unit carried through the handler's sink.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Mouse(MouseEvent),
    Key(KeyEvent),
}

impl InputEvent {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            InputEvent::Pointer(event) => event.timestamp_ms,
            InputEvent::Mouse(event) => event.timestamp_ms,
            InputEvent::Key(event) => event.timestamp_ms,
        }
    }

    pub fn as_pointer(&self) -> Option<&PointerEvent> {
        match self {
            InputEvent::Pointer(event) => Some(event),
            _ => None,
        }
    }
}

impl From<PointerEvent> for InputEvent {
    fn from(value: PointerEvent) -> Self {
        InputEvent::Pointer(value)
    }
}

impl From<MouseEvent> for InputEvent {
    fn from(value: MouseEvent) -> Self {
        InputEvent::Mouse(value)
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(value: KeyEvent) -> Self {
        InputEvent::Key(value)
    }
}
