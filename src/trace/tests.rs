use std::io::{BufReader, Cursor};

use super::*;
use crate::gesture::{DragAxis, SwipeDirection};

fn pointer(kind: PointerKind, x: f32, y: f32, t_ms: u64) -> PointerEvent {
    PointerEvent::new(kind, 0, x, y, t_ms, SourceLabel::Touch)
}

#[test]
fn dump_parses_back_into_same_pointer_stream() {
    let mut log = TraceLog::new();
    log.on_pointer(pointer(PointerKind::Down, 0.125, 0.5, 10).with_pressure(0.25));
    log.on_pointer(pointer(PointerKind::Move, 0.5, 0.5, 26));
    log.on_pointer(pointer(PointerKind::Up, 0.875, 0.5, 42));

    let mut dump = Vec::new();
    log.write_dump(&mut dump).unwrap();
    let text = String::from_utf8(dump).unwrap();
    assert!(text.starts_with("# TRACE_DUMP start_ms=10 end_ms=42 pointers=3"));

    let parsed = parse_pointer_trace(BufReader::new(Cursor::new(text))).unwrap();
    assert_eq!(parsed, log.pointers());
}

#[test]
fn full_log_keeps_newest_entries() {
    let mut log = TraceLog::new();
    for t in 0..(POINTER_TRACE_CAPACITY as u64 + 5) {
        log.on_pointer(pointer(PointerKind::Move, 0.5, 0.5, t));
    }
    assert!(log.overflowed());
    assert_eq!(log.pointers().len(), POINTER_TRACE_CAPACITY);
    assert_eq!(log.pointers()[0].timestamp_ms, 5);
}

#[test]
fn short_rows_default_pressure_and_source() {
    let text = "pointer_trace,5,down,2,0.5,0.25\nother,1,2\n";
    let parsed = parse_pointer_trace(Cursor::new(text)).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].touch_id, 2);
    assert_eq!(parsed[0].pressure, 1.0);
    assert_eq!(parsed[0].source, SourceLabel::Touch);
}

#[test]
fn malformed_row_reports_line_number() {
    let text = "# header\npointer_trace,5,down,0,0.5,0.5\npointer_trace,x,move,0,0.5,0.5\n";
    match parse_pointer_trace(Cursor::new(text)) {
        Err(InputError::Trace { line, reason }) => {
            assert_eq!(line, 3);
            assert!(reason.contains("invalid ms"));
        }
        other => panic!("expected trace error, got {other:?}"),
    }
}

#[test]
fn expected_kinds_accept_comments() {
    let text = "# swipe test\nclick\n\npage_swipe_left\n";
    let kinds = parse_expected_kinds(Cursor::new(text)).unwrap();
    assert_eq!(
        kinds,
        vec![
            GestureKind::Click,
            GestureKind::DragEnd {
                axis: DragAxis::Horizontal,
                page_swipe: Some(SwipeDirection::Left),
            },
        ]
    );
    assert!(parse_expected_kinds(Cursor::new("rotate\n")).is_err());
}

#[test]
fn replay_settles_trailing_hold() {
    let events = [pointer(PointerKind::Down, 0.5, 0.5, 0)];
    let gestures = replay(&events, (800, 480));
    let kinds: Vec<_> = gestures.iter().map(|g| g.kind).collect();
    assert_eq!(kinds, vec![GestureKind::Hold]);
}

#[test]
fn replay_classifies_click_then_swipe() {
    let events = [
        pointer(PointerKind::Down, 0.5, 0.5, 0),
        pointer(PointerKind::Up, 0.5, 0.5, 90),
        pointer(PointerKind::Down, 0.9, 0.5, 400),
        pointer(PointerKind::Move, 0.5, 0.5, 430),
        pointer(PointerKind::Move, 0.2, 0.5, 460),
        pointer(PointerKind::Up, 0.2, 0.5, 470),
    ];
    let labels: Vec<_> = replay(&events, (800, 480))
        .iter()
        .map(|g| g.kind.label())
        .collect();
    assert_eq!(
        labels,
        vec!["click", "drag_horizontal", "drag_horizontal", "page_swipe_left"]
    );
}

fn encode_wide(records: &[(u64, u16, u16, i32)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(time_us, kind, code, value) in records {
        out.extend_from_slice(&((time_us / 1_000_000) as i64).to_le_bytes());
        out.extend_from_slice(&((time_us % 1_000_000) as i64).to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&code.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[test]
fn raw_dump_tap_replays_as_click() {
    use crate::device::codes::*;

    let t0 = 5_000_000;
    let bytes = encode_wide(&[
        (t0, EV_ABS, ABS_MT_SLOT, 0),
        (t0, EV_ABS, ABS_MT_TRACKING_ID, 3),
        (t0, EV_ABS, ABS_MT_POSITION_X, 2047),
        (t0, EV_ABS, ABS_MT_POSITION_Y, 2047),
        (t0, EV_SYN, SYN_REPORT, 0),
        (t0 + 120_000, EV_ABS, ABS_MT_TRACKING_ID, -1),
        (t0 + 120_000, EV_SYN, SYN_REPORT, 0),
    ]);
    let capabilities = DeviceCapabilities::slotted_panel(4095, 4095, 2);
    let pointers = pointers_from_dump(&bytes, RecordLayout::Wide, &capabilities);

    let stream: Vec<_> = pointers.iter().map(|p| (p.kind, p.timestamp_ms)).collect();
    assert_eq!(stream, vec![(PointerKind::Down, 0), (PointerKind::Up, 120)]);
    assert!((pointers[0].x - 0.5).abs() < 0.001);

    let gestures = replay(&pointers, (800, 480));
    let kinds: Vec<_> = gestures.iter().map(|g| g.kind).collect();
    assert_eq!(kinds, vec![GestureKind::Click]);
}

#[test]
fn truncated_raw_dump_releases_open_contact() {
    use crate::device::codes::*;

    let bytes = encode_wide(&[
        (0, EV_ABS, ABS_MT_TRACKING_ID, 1),
        (0, EV_ABS, ABS_MT_POSITION_X, 100),
        (0, EV_ABS, ABS_MT_POSITION_Y, 100),
        (0, EV_SYN, SYN_REPORT, 0),
        (40_000, EV_ABS, ABS_MT_POSITION_X, 900),
        (40_000, EV_SYN, SYN_REPORT, 0),
    ]);
    let capabilities = DeviceCapabilities::slotted_panel(1000, 1000, 2);
    let pointers = pointers_from_dump(&bytes[..bytes.len() - 3], RecordLayout::Wide, &capabilities);
    // The partial trailing record is ignored, so the move is never reported.
    let kinds: Vec<_> = pointers.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![PointerKind::Down, PointerKind::Up]);

    let pointers = pointers_from_dump(&bytes, RecordLayout::Wide, &capabilities);
    let stream: Vec<_> = pointers.iter().map(|p| (p.kind, p.timestamp_ms)).collect();
    assert_eq!(
        stream,
        vec![
            (PointerKind::Down, 0),
            (PointerKind::Move, 40),
            (PointerKind::Up, 40)
        ]
    );
    assert_eq!(pointers[2].x, 0.9);
}
