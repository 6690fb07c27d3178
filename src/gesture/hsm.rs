use super::utils::{axis_dominates, exceeds, squared_distance, squared_i32};
use super::*;
use statig::prelude::*;

mod core;

pub(super) struct GestureHsm {
    pub(super) phase: GesturePhase,
    pub(super) classification: GesturePhase,
    pub(super) primary: Option<u32>,
    start_ms: u64,
    start_point: GesturePoint,
    last_point: GesturePoint,
    max_travel_sq: i32,
}

#[state_machine(initial = "State::idle()")]
impl GestureHsm {
    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        let _ = context;
        match *event {
            GestureHsmEvent::Pointer {
                kind: PointerKind::Down,
                touch_id,
                point,
                now_ms,
            } => {
                self.begin_press(touch_id, now_ms, point);
                Transition(State::potential())
            }
            _ => Handled,
        }
    }

    #[state]
    fn potential(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        match *event {
            GestureHsmEvent::Tick { now_ms } => {
                if self.hold_reached(now_ms) {
                    self.emit(context, GestureKind::Hold, now_ms, 0, 0);
                    return self.enter(GesturePhase::Hold);
                }
                Handled
            }
            GestureHsmEvent::Pointer { touch_id, .. } if !self.is_primary(touch_id) => Handled,
            GestureHsmEvent::Pointer {
                kind: PointerKind::Down,
                touch_id,
                point,
                now_ms,
            } => {
                self.begin_press(touch_id, now_ms, point);
                Handled
            }
            GestureHsmEvent::Pointer {
                kind: PointerKind::Move,
                point,
                now_ms,
                ..
            } => {
                self.observe(point);
                if self.hold_reached(now_ms) {
                    self.emit(context, GestureKind::Hold, now_ms, 0, 0);
                    return self.enter(GesturePhase::Hold);
                }
                let dx = point.x - self.start_point.x;
                let dy = point.y - self.start_point.y;
                // Horizontal is tested first; strict dominance keeps the two
                // rules mutually exclusive.
                if exceeds(dx, DRAG_THRESHOLD_PX) && axis_dominates(dx, dy, AXIS_DOMINANCE_X100) {
                    self.emit(context, GestureKind::DragHorizontal, now_ms, dx, dy);
                    return self.enter(GesturePhase::DragHorizontal);
                }
                if exceeds(dy, DRAG_THRESHOLD_PX) && axis_dominates(dy, dx, AXIS_DOMINANCE_X100) {
                    self.emit(context, GestureKind::DragVertical, now_ms, dx, dy);
                    return self.enter(GesturePhase::DragVertical);
                }
                Handled
            }
            GestureHsmEvent::Pointer {
                kind: PointerKind::Up,
                point,
                now_ms,
                ..
            } => {
                self.observe(point);
                let elapsed = now_ms.saturating_sub(self.start_ms);
                if self.hold_reached(now_ms) {
                    self.emit(context, GestureKind::Hold, now_ms, 0, 0);
                    self.classification = GesturePhase::Hold;
                } else if elapsed < CLICK_TIMEOUT_MS && self.is_stationary() {
                    self.emit(context, GestureKind::Click, now_ms, 0, 0);
                    self.classification = GesturePhase::Click;
                }
                self.release()
            }
        }
    }

    #[state]
    fn hold(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        let _ = context;
        match *event {
            GestureHsmEvent::Pointer {
                kind: PointerKind::Up,
                touch_id,
                point,
                ..
            } if self.is_primary(touch_id) => {
                self.observe(point);
                self.release()
            }
            GestureHsmEvent::Pointer {
                kind: PointerKind::Move,
                touch_id,
                point,
                ..
            } if self.is_primary(touch_id) => {
                self.observe(point);
                Handled
            }
            _ => Handled,
        }
    }

    #[state]
    fn drag_horizontal(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        self.dragging(context, event, DragAxis::Horizontal)
    }

    #[state]
    fn drag_vertical(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        self.dragging(context, event, DragAxis::Vertical)
    }
}

impl GestureHsm {
    fn dragging(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
        axis: DragAxis,
    ) -> Outcome<State> {
        match *event {
            GestureHsmEvent::Pointer {
                kind: PointerKind::Move,
                touch_id,
                point,
                now_ms,
            } if self.is_primary(touch_id) => {
                let step_x = point.x - self.last_point.x;
                let step_y = point.y - self.last_point.y;
                self.observe(point);
                if step_x != 0 || step_y != 0 {
                    let kind = match axis {
                        DragAxis::Horizontal => GestureKind::DragHorizontal,
                        DragAxis::Vertical => GestureKind::DragVertical,
                    };
                    self.emit(context, kind, now_ms, step_x, step_y);
                }
                Handled
            }
            GestureHsmEvent::Pointer {
                kind: PointerKind::Up,
                touch_id,
                point,
                now_ms,
            } if self.is_primary(touch_id) => {
                self.observe(point);
                let dx = point.x - self.start_point.x;
                let dy = point.y - self.start_point.y;
                let page_swipe = match axis {
                    DragAxis::Horizontal if exceeds(dx, PAGE_SWIPE_THRESHOLD_PX) => {
                        Some(if dx < 0 {
                            SwipeDirection::Left
                        } else {
                            SwipeDirection::Right
                        })
                    }
                    _ => None,
                };
                self.emit(
                    context,
                    GestureKind::DragEnd { axis, page_swipe },
                    now_ms,
                    dx,
                    dy,
                );
                self.release()
            }
            _ => Handled,
        }
    }

    fn is_stationary(&self) -> bool {
        self.max_travel_sq < squared_i32(DRAG_THRESHOLD_PX)
    }

    fn hold_reached(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.start_ms) >= HOLD_THRESHOLD_MS && self.is_stationary()
    }

    fn observe(&mut self, point: GesturePoint) {
        self.last_point = point;
        self.max_travel_sq = self
            .max_travel_sq
            .max(squared_distance(point, self.start_point));
    }
}
