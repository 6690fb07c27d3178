//! Click / hold / drag classification of the primary contact.
//!
//! Pointer events are mapped onto integer pixels of the reference surface
//! before any threshold is applied, so the same trace classifies identically
//! regardless of the producing device's resolution.

use serde::Serialize;
use statig::blocking::IntoStateMachineExt as _;

use crate::{
    config::{DEFAULT_REFERENCE_HEIGHT, DEFAULT_REFERENCE_WIDTH},
    types::{PointerEvent, PointerKind},
};

mod hsm;
mod utils;

use hsm::GestureHsm;

pub const CLICK_TIMEOUT_MS: u64 = 300;
pub const HOLD_THRESHOLD_MS: u64 = 500;
pub const DRAG_THRESHOLD_PX: i32 = 10;
pub const PAGE_SWIPE_THRESHOLD_PX: i32 = 100;
/// Major axis must exceed 1.5x the minor one.
pub const AXIS_DOMINANCE_X100: i32 = 150;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GesturePoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DragAxis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    #[default]
    Idle,
    Potential,
    Click,
    Hold,
    DragHorizontal,
    DragVertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Click,
    Hold,
    DragHorizontal,
    DragVertical,
    DragEnd {
        axis: DragAxis,
        page_swipe: Option<SwipeDirection>,
    },
}

impl GestureKind {
    pub const fn label(self) -> &'static str {
        match self {
            GestureKind::Click => "click",
            GestureKind::Hold => "hold",
            GestureKind::DragHorizontal => "drag_horizontal",
            GestureKind::DragVertical => "drag_vertical",
            GestureKind::DragEnd {
                axis: DragAxis::Vertical,
                ..
            } => "drag_end_vertical",
            GestureKind::DragEnd {
                page_swipe: Some(SwipeDirection::Left),
                ..
            } => "page_swipe_left",
            GestureKind::DragEnd {
                page_swipe: Some(SwipeDirection::Right),
                ..
            } => "page_swipe_right",
            GestureKind::DragEnd { .. } => "drag_end_horizontal",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let kind = match label.trim().to_ascii_lowercase().as_str() {
            "click" => GestureKind::Click,
            "hold" => GestureKind::Hold,
            "drag_horizontal" => GestureKind::DragHorizontal,
            "drag_vertical" => GestureKind::DragVertical,
            "drag_end_vertical" => GestureKind::DragEnd {
                axis: DragAxis::Vertical,
                page_swipe: None,
            },
            "drag_end_horizontal" => GestureKind::DragEnd {
                axis: DragAxis::Horizontal,
                page_swipe: None,
            },
            "page_swipe_left" => GestureKind::DragEnd {
                axis: DragAxis::Horizontal,
                page_swipe: Some(SwipeDirection::Left),
            },
            "page_swipe_right" => GestureKind::DragEnd {
                axis: DragAxis::Horizontal,
                page_swipe: Some(SwipeDirection::Right),
            },
            _ => return None,
        };
        Some(kind)
    }
}

/// Positions are reference-surface pixels. For drag updates `dx`/`dy` are the
/// step since the previous report; for `DragEnd` they are the whole drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub touch_id: u32,
    pub x: i32,
    pub y: i32,
    pub start_x: i32,
    pub start_y: i32,
    pub dx: i32,
    pub dy: i32,
    pub timestamp_ms: u64,
    pub duration_ms: u64,
}

#[derive(Clone, Copy, Debug)]
enum GestureHsmEvent {
    Pointer {
        kind: PointerKind,
        touch_id: u32,
        point: GesturePoint,
        now_ms: u64,
    },
    Tick {
        now_ms: u64,
    },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GestureOutput {
    pub events: [Option<GestureEvent>; 3],
}

impl GestureOutput {
    pub fn iter(&self) -> impl Iterator<Item = &GestureEvent> {
        self.events.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.events.iter().all(Option::is_none)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct DispatchContext {
    events: [Option<GestureEvent>; 3],
}

impl DispatchContext {
    fn emit(&mut self, event: GestureEvent) {
        for slot in &mut self.events {
            if slot.is_none() {
                *slot = Some(event);
                return;
            }
        }
    }

    fn finish(self) -> GestureOutput {
        GestureOutput {
            events: self.events,
        }
    }
}

/// Gesture state machine fed from the consumer thread.
pub struct GestureClassifier {
    machine: statig::blocking::StateMachine<GestureHsm>,
    reference: (u32, u32),
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self::with_reference(DEFAULT_REFERENCE_WIDTH, DEFAULT_REFERENCE_HEIGHT)
    }

    pub fn with_reference(width: u32, height: u32) -> Self {
        Self {
            machine: GestureHsm::new().state_machine(),
            reference: (width.max(1), height.max(1)),
        }
    }

    pub fn reference(&self) -> (u32, u32) {
        self.reference
    }

    pub fn handle(&mut self, event: &PointerEvent) -> GestureOutput {
        let point = utils::to_reference_px(event.x, event.y, self.reference);
        self.dispatch(GestureHsmEvent::Pointer {
            kind: event.kind,
            touch_id: event.touch_id,
            point,
            now_ms: event.timestamp_ms,
        })
    }

    /// Lets a stationary press turn into a hold without waiting for the next
    /// pointer event.
    pub fn tick(&mut self, now_ms: u64) -> GestureOutput {
        self.dispatch(GestureHsmEvent::Tick { now_ms })
    }

    /// Current phase of the machine; `Idle` between interactions.
    pub fn phase(&self) -> GesturePhase {
        self.machine.inner().phase
    }

    /// What the current or most recent interaction was classified as.
    pub fn classification(&self) -> GesturePhase {
        self.machine.inner().classification
    }

    pub fn primary_touch(&self) -> Option<u32> {
        self.machine.inner().primary
    }

    fn dispatch(&mut self, event: GestureHsmEvent) -> GestureOutput {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        context.finish()
    }
}
