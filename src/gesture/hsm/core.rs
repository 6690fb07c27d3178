use super::*;

impl GestureHsm {
    pub(crate) fn new() -> Self {
        Self {
            phase: GesturePhase::Idle,
            classification: GesturePhase::Idle,
            primary: None,
            start_ms: 0,
            start_point: GesturePoint::default(),
            last_point: GesturePoint::default(),
            max_travel_sq: 0,
        }
    }

    pub(super) fn begin_press(&mut self, touch_id: u32, now_ms: u64, point: GesturePoint) {
        self.primary = Some(touch_id);
        self.start_ms = now_ms;
        self.start_point = point;
        self.last_point = point;
        self.max_travel_sq = 0;
        self.phase = GesturePhase::Potential;
        self.classification = GesturePhase::Potential;
    }

    pub(super) fn is_primary(&self, touch_id: u32) -> bool {
        self.primary == Some(touch_id)
    }

    pub(super) fn enter(&mut self, phase: GesturePhase) -> Outcome<State> {
        self.phase = phase;
        self.classification = phase;
        match phase {
            GesturePhase::Hold => Transition(State::hold()),
            GesturePhase::DragHorizontal => Transition(State::drag_horizontal()),
            GesturePhase::DragVertical => Transition(State::drag_vertical()),
            GesturePhase::Potential => Transition(State::potential()),
            GesturePhase::Idle | GesturePhase::Click => Transition(State::idle()),
        }
    }

    /// Primary contact lifted: back to idle, classification kept.
    pub(super) fn release(&mut self) -> Outcome<State> {
        self.primary = None;
        self.phase = GesturePhase::Idle;
        Transition(State::idle())
    }

    pub(super) fn emit(
        &self,
        context: &mut DispatchContext,
        kind: GestureKind,
        now_ms: u64,
        dx: i32,
        dy: i32,
    ) {
        context.emit(GestureEvent {
            kind,
            touch_id: self.primary.unwrap_or_default(),
            x: self.last_point.x,
            y: self.last_point.y,
            start_x: self.start_point.x,
            start_y: self.start_point.y,
            dx,
            dy,
            timestamp_ms: now_ms,
            duration_ms: now_ms.saturating_sub(self.start_ms),
        });
    }
}
