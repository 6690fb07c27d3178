use std::{
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use super::*;
use crate::{
    config::{SourceKind, SyntheticPattern},
    device::{
        codes::*,
        fake::{FakeDevice, FakeOpener},
        record::{InputRecord, ReplaySource},
    },
    host::{NativeEvent, NativeFinger, QueuedPump},
    source::{NativeSource, RawDeviceSource},
    types::{KeyEvent, MouseButton, PointerEvent, PointerKind, SourceLabel},
};

fn finger(finger_id: u32, x: f32, y: f32) -> NativeFinger {
    NativeFinger {
        finger_id,
        x,
        y,
        pressure: 0.5,
        timestamp_ms: 0,
    }
}

fn native_config() -> InputConfig {
    InputConfig {
        source: SourceKind::Native,
        ..InputConfig::default()
    }
}

fn raw_handler(records: ReplaySource) -> InputHandler {
    let device = FakeDevice::mt_panel().with_records(records);
    let opener = FakeOpener::default().with("/dev/input/event1", device);
    let config = InputConfig {
        device_path: Some(PathBuf::from("/dev/input/event1")),
        ..InputConfig::default()
    };
    let source = Source::RawDevice(RawDeviceSource::with_opener(Arc::new(opener)));
    InputHandler::with_source(config, source).unwrap()
}

fn drain_until(handler: &mut InputHandler, count: usize) -> Vec<InputEvent> {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut out = Vec::new();
    while out.len() < count && Instant::now() < deadline {
        match handler.poll_event() {
            Some(event) => out.push(event),
            None => thread::sleep(Duration::from_millis(1)),
        }
    }
    out
}

fn pointer(kind: PointerKind, touch_id: u32) -> PointerEvent {
    PointerEvent::new(kind, touch_id, 0.5, 0.5, 0, SourceLabel::Mock)
}

#[test]
fn invalid_config_fails_construction() {
    let config = InputConfig {
        reference_width: 0,
        ..InputConfig::synthetic(None)
    };
    assert!(matches!(
        InputHandler::new(config),
        Err(InputError::Config(_))
    ));
}

#[test]
fn native_without_pump_fails_construction() {
    assert!(matches!(
        InputHandler::new(native_config()),
        Err(InputError::Config(_))
    ));
}

#[test]
fn mismatched_source_is_rejected() {
    let source = Source::Native(NativeSource::new(Some(Box::new(QueuedPump::new(0)))));
    assert!(matches!(
        InputHandler::with_source(InputConfig::synthetic(None), source),
        Err(InputError::Config(_))
    ));
}

#[test]
fn native_passthrough_round_trips_to_host() {
    let mut pump = QueuedPump::new(1);
    pump.push(NativeEvent::FingerDown(finger(2, 0.25, 0.75)));
    pump.push(NativeEvent::FingerMotion(finger(2, 0.30, 0.70)));
    pump.push(NativeEvent::FingerUp(finger(2, 0.30, 0.70)));
    pump.push(NativeEvent::Other);
    pump.push(NativeEvent::KeyDown {
        scancode: 44,
        timestamp_ms: 0,
    });
    pump.push(NativeEvent::MouseButtonDown {
        button: MouseButton::Right,
        x: 10,
        y: 20,
        timestamp_ms: 0,
    });

    let mut handler = InputHandler::with_host_pump(native_config(), Box::new(pump)).unwrap();
    assert!(handler.capabilities().has_touch());
    handler.start().unwrap();
    assert!(handler.is_running());

    let mut host: Vec<NativeEvent> = Vec::new();
    assert_eq!(handler.forward_to(&mut host), 5);

    let NativeEvent::FingerDown(down) = host[0] else {
        panic!("expected finger down, got {:?}", host[0]);
    };
    assert_eq!((down.finger_id, down.x, down.y), (2, 0.25, 0.75));
    assert_eq!(down.pressure, 0.5);
    assert!(matches!(host[1], NativeEvent::FingerMotion(f) if f.x == 0.30));
    assert!(matches!(host[2], NativeEvent::FingerUp(_)));
    assert!(matches!(host[3], NativeEvent::KeyDown { scancode: 44, .. }));
    assert!(matches!(
        host[4],
        NativeEvent::MouseButtonDown {
            button: MouseButton::Right,
            x: 10,
            y: 20,
            ..
        }
    ));

    let counters = handler.counters();
    assert_eq!(
        (counters.total, counters.touch, counters.mouse, counters.keyboard),
        (5, 3, 1, 1)
    );
}

#[test]
fn start_twice_is_rejected() {
    let mut handler = InputHandler::new(InputConfig::synthetic(None)).unwrap();
    handler.start().unwrap();
    assert!(matches!(handler.start(), Err(InputError::AlreadyRunning)));
    handler.stop();
    assert!(!handler.is_running());
    handler.start().unwrap();
    handler.stop();
}

#[test]
fn push_after_stop_reports_closed_sink() {
    let mut handler = InputHandler::new(InputConfig::synthetic(None)).unwrap();
    handler.start().unwrap();
    let sink = handler.sink().clone();
    handler.stop();
    assert!(!sink.is_open());
    assert!(matches!(
        sink.push_event(pointer(PointerKind::Down, 0)),
        Err(InputError::SinkClosed)
    ));
}

#[test]
fn lifecycle_violations_are_counted_not_queued() {
    let mut handler = InputHandler::new(InputConfig::synthetic(None)).unwrap();
    handler.start().unwrap();
    let sink = handler.sink().clone();

    sink.push_event(pointer(PointerKind::Move, 4)).unwrap();
    sink.push_event(pointer(PointerKind::Up, 4)).unwrap();
    sink.push_event(pointer(PointerKind::Down, 1)).unwrap();
    sink.push_event(pointer(PointerKind::Down, 1)).unwrap();
    sink.push_event(pointer(PointerKind::Up, 1)).unwrap();

    let kinds: Vec<_> = handler
        .drain()
        .iter()
        .filter_map(InputEvent::as_pointer)
        .map(|p| (p.kind, p.touch_id))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (PointerKind::Down, 1),
            (PointerKind::Up, 1),
            (PointerKind::Down, 1),
            (PointerKind::Up, 1),
        ]
    );
    let counters = handler.counters();
    assert_eq!(counters.rejected, 2);
    assert_eq!(counters.implicit_release, 1);
}

#[test]
fn stop_releases_contacts_left_down() {
    let records = ReplaySource::new(
        vec![
            InputRecord::abs(ABS_MT_SLOT, 1),
            InputRecord::abs(ABS_MT_TRACKING_ID, 9),
            InputRecord::abs(ABS_MT_POSITION_X, 2048),
            InputRecord::abs(ABS_MT_POSITION_Y, 1024),
            InputRecord::syn(),
        ],
        8,
    );
    let mut handler = raw_handler(records);
    handler.start().unwrap();
    let down = drain_until(&mut handler, 1);
    assert_eq!(down.len(), 1);
    assert_eq!(handler.sink().active_contacts(), 1);

    handler.stop();
    let rest = handler.drain();
    assert_eq!(rest.len(), 1);
    let up = rest[0].as_pointer().unwrap();
    assert_eq!((up.kind, up.touch_id), (PointerKind::Up, 1));
    assert_eq!(handler.sink().active_contacts(), 0);
    assert_eq!(handler.status(), SourceStatus::Stopped);
}

#[test]
fn release_survives_a_full_queue_at_stop() {
    let mut handler = InputHandler::new(InputConfig::synthetic(None)).unwrap();
    handler.start().unwrap();
    let sink = handler.sink().clone();
    sink.push_event(pointer(PointerKind::Down, 0)).unwrap();
    for scancode in 0..(sink::SINK_CAPACITY - 1) as u32 {
        sink.push_event(KeyEvent {
            scancode,
            pressed: true,
            timestamp_ms: 0,
        })
        .unwrap();
    }
    assert!(!sink.has_capacity(1));

    handler.stop();
    let events = handler.drain();
    assert_eq!(events.len(), sink::SINK_CAPACITY + 1);
    let kinds: Vec<_> = events
        .iter()
        .filter_map(InputEvent::as_pointer)
        .map(|p| (p.kind, p.touch_id))
        .collect();
    assert_eq!(kinds, vec![(PointerKind::Down, 0), (PointerKind::Up, 0)]);
    assert_eq!(handler.counters().touch, 2);
    assert!(handler.drain().is_empty());
}

#[test]
fn disconnect_clears_running_flag() {
    let records = ReplaySource::new(Vec::new(), 1).ending_with_os_error(19);
    let mut handler = raw_handler(records);
    handler.start().unwrap();
    let deadline = Instant::now() + Duration::from_secs(2);
    while handler.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!handler.is_running());
    assert_eq!(handler.status(), SourceStatus::Disconnected);

    handler.stop();
    assert!(matches!(
        handler.start(),
        Err(InputError::DeviceDisconnected)
    ));
}

#[test]
fn counters_survive_restart() {
    let mut handler = InputHandler::new(InputConfig::synthetic(None)).unwrap();
    handler.start().unwrap();
    handler
        .sink()
        .push_event(pointer(PointerKind::Down, 0))
        .unwrap();
    handler.stop();
    let before = handler.counters();
    assert_eq!(before.total, 2);

    handler.start().unwrap();
    handler
        .sink()
        .push_event(pointer(PointerKind::Down, 0))
        .unwrap();
    assert!(handler.counters().total > before.total);
}

#[test]
fn dump_state_reports_source_and_counters() {
    let mut config = InputConfig::synthetic(Some(SyntheticPattern::Tap));
    config.mouse_emulation = true;
    let handler = InputHandler::new(config).unwrap();
    let dump = handler.dump_state();
    assert!(dump.contains("source: synthetic"));
    assert!(dump.contains("status: initialized"));
    assert!(dump.contains("counters: total=0"));
    assert!(dump.contains("mouse_emulation=true"));
}
