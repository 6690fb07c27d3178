use super::GesturePoint;

/// Normalized coordinates to the nearest reference-surface pixel.
pub(super) fn to_reference_px(x: f32, y: f32, reference: (u32, u32)) -> GesturePoint {
    GesturePoint {
        x: (x.clamp(0.0, 1.0) * reference.0 as f32).round() as i32,
        y: (y.clamp(0.0, 1.0) * reference.1 as f32).round() as i32,
    }
}

pub(super) fn squared_distance(a: GesturePoint, b: GesturePoint) -> i32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
}

pub(super) fn squared_i32(value: i32) -> i32 {
    value.saturating_mul(value)
}

pub(super) fn exceeds(delta: i32, threshold_px: i32) -> bool {
    delta.saturating_abs() > threshold_px
}

/// `|major| > ratio * |minor|`, strict, in integer hundredths.
pub(super) fn axis_dominates(major: i32, minor: i32, ratio_x100: i32) -> bool {
    major.saturating_abs().saturating_mul(100) > minor.saturating_abs().saturating_mul(ratio_x100)
}
