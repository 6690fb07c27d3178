//! Bounded session log of pointer and gesture events, dumped as CSV and read
//! back for replays.

use std::io::{self, BufRead, Write};

use crate::{
    device::{
        contacts::ContactTracker,
        probe::DeviceCapabilities,
        record::{decode_all, RecordLayout},
    },
    error::{InputError, Result},
    gesture::{GestureClassifier, GestureEvent, GestureKind},
    normalize::ContactNormalizer,
    types::{PointerEvent, PointerKind, SourceLabel},
};

pub const POINTER_TRACE_CAPACITY: usize = 2048;
pub const GESTURE_TRACE_CAPACITY: usize = 256;

pub const POINTER_TRACE_HEADER: &str = "pointer_trace,ms,kind,touch_id,x,y,pressure,source";
pub const GESTURE_TRACE_HEADER: &str =
    "gesture,ms,kind,touch_id,x,y,start_x,start_y,dx,dy,duration_ms";

/// Keeps the newest events once full and remembers that it dropped some.
pub struct TraceLog {
    start_ms: Option<u64>,
    end_ms: Option<u64>,
    pointer_overflow: bool,
    gesture_overflow: bool,
    pointers: heapless::Vec<PointerEvent, POINTER_TRACE_CAPACITY>,
    gestures: heapless::Vec<GestureEvent, GESTURE_TRACE_CAPACITY>,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceLog {
    pub fn new() -> Self {
        Self {
            start_ms: None,
            end_ms: None,
            pointer_overflow: false,
            gesture_overflow: false,
            pointers: heapless::Vec::new(),
            gestures: heapless::Vec::new(),
        }
    }

    fn touch(&mut self, t_ms: u64) {
        self.start_ms.get_or_insert(t_ms);
        self.end_ms = Some(t_ms);
    }

    pub fn on_pointer(&mut self, event: PointerEvent) {
        self.touch(event.timestamp_ms);
        if self.pointers.push(event).is_err() {
            self.pointer_overflow = true;
            let _ = self.pointers.remove(0);
            let _ = self.pointers.push(event);
        }
    }

    pub fn on_gesture(&mut self, event: GestureEvent) {
        self.touch(event.timestamp_ms);
        if self.gestures.push(event).is_err() {
            self.gesture_overflow = true;
            let _ = self.gestures.remove(0);
            let _ = self.gestures.push(event);
        }
    }

    pub fn pointers(&self) -> &[PointerEvent] {
        &self.pointers
    }

    pub fn gestures(&self) -> &[GestureEvent] {
        &self.gestures
    }

    pub fn overflowed(&self) -> bool {
        self.pointer_overflow || self.gesture_overflow
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn write_dump(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(
            out,
            "# TRACE_DUMP start_ms={} end_ms={} pointers={} pointer_overflow={} gestures={} gesture_overflow={}",
            self.start_ms.unwrap_or(0),
            self.end_ms.unwrap_or(0),
            self.pointers.len(),
            u8::from(self.pointer_overflow),
            self.gestures.len(),
            u8::from(self.gesture_overflow),
        )?;
        writeln!(out, "{POINTER_TRACE_HEADER}")?;
        for event in &self.pointers {
            write_pointer_line(out, event)?;
        }
        writeln!(out, "{GESTURE_TRACE_HEADER}")?;
        for event in &self.gestures {
            write_gesture_line(out, event)?;
        }
        Ok(())
    }
}

pub fn write_pointer_line(out: &mut impl Write, event: &PointerEvent) -> io::Result<()> {
    writeln!(
        out,
        "pointer_trace,{},{},{},{:.6},{:.6},{:.4},{}",
        event.timestamp_ms,
        event.kind.label(),
        event.touch_id,
        event.x,
        event.y,
        event.pressure,
        event.source.label()
    )
}

pub fn write_gesture_line(out: &mut impl Write, event: &GestureEvent) -> io::Result<()> {
    writeln!(
        out,
        "gesture,{},{},{},{},{},{},{},{},{},{}",
        event.timestamp_ms,
        event.kind.label(),
        event.touch_id,
        event.x,
        event.y,
        event.start_x,
        event.start_y,
        event.dx,
        event.dy,
        event.duration_ms
    )
}

fn parse_field<T: core::str::FromStr>(raw: &str, line_no: usize, field: &str) -> Result<T>
where
    T::Err: core::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| InputError::trace(line_no, format!("invalid {field} '{}': {e}", raw.trim())))
}

/// Reads the `pointer_trace` rows of a dump. Other rows, blank lines and `#`
/// comments are skipped.
pub fn parse_pointer_trace(reader: impl BufRead) -> Result<Vec<PointerEvent>> {
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == POINTER_TRACE_HEADER {
            continue;
        }
        let parts: Vec<&str> = trimmed.split(',').collect();
        if parts[0].trim() != "pointer_trace" {
            continue;
        }
        if parts.len() < 6 {
            return Err(InputError::trace(
                line_no,
                "expected at least 6 columns (ms,kind,touch_id,x,y)",
            ));
        }
        let ms: u64 = parse_field(parts[1], line_no, "ms")?;
        let kind = PointerKind::from_label(parts[2])
            .ok_or_else(|| InputError::trace(line_no, format!("invalid kind '{}'", parts[2])))?;
        let touch_id: u32 = parse_field(parts[3], line_no, "touch_id")?;
        let x: f32 = parse_field(parts[4], line_no, "x")?;
        let y: f32 = parse_field(parts[5], line_no, "y")?;
        let pressure: f32 = match parts.get(6) {
            Some(raw) => parse_field(raw, line_no, "pressure")?,
            None => 1.0,
        };
        let source = match parts.get(7) {
            Some(raw) => SourceLabel::from_label(raw)
                .ok_or_else(|| InputError::trace(line_no, format!("invalid source '{raw}'")))?,
            None => SourceLabel::Touch,
        };
        out.push(PointerEvent::new(kind, touch_id, x, y, ms, source).with_pressure(pressure));
    }
    Ok(out)
}

/// One gesture label per line.
pub fn parse_expected_kinds(reader: impl BufRead) -> Result<Vec<GestureKind>> {
    let mut kinds = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let token = line.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }
        let kind = GestureKind::from_label(token)
            .ok_or_else(|| InputError::trace(idx + 1, format!("invalid gesture kind '{token}'")))?;
        kinds.push(kind);
    }
    Ok(kinds)
}

/// Recovers the pointer stream from a raw `input_event` dump of a device
/// with `capabilities`. Timestamps count from the first record; contacts
/// still down at the end of the dump are released at the last record.
pub fn pointers_from_dump(
    bytes: &[u8],
    layout: RecordLayout,
    capabilities: &DeviceCapabilities,
) -> Vec<PointerEvent> {
    let records = decode_all(layout, bytes);
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Vec::new();
    };
    let base_us = first.time_us;
    let to_ms = |time_us: u64| time_us.saturating_sub(base_us) / 1_000;

    let mut tracker = ContactTracker::new(capabilities.protocol, capabilities.slot_count);
    let normalizer = ContactNormalizer::new(capabilities);
    let mut out = Vec::new();
    for record in &records {
        if let Some(frame) = tracker.process(record) {
            out.extend(
                frame
                    .iter()
                    .map(|transition| normalizer.to_pointer(transition, to_ms(record.time_us))),
            );
        }
    }
    let releases = tracker.release_all(last.time_us);
    out.extend(
        releases
            .iter()
            .map(|transition| normalizer.to_pointer(transition, to_ms(last.time_us))),
    );
    out
}

/// Runs a recorded pointer stream through a fresh classifier. A trailing
/// tick lets a press still down at the end of the trace settle into a hold.
pub fn replay(events: &[PointerEvent], reference: (u32, u32)) -> Vec<GestureEvent> {
    let mut classifier = GestureClassifier::with_reference(reference.0, reference.1);
    let mut out = Vec::new();
    for event in events {
        out.extend(classifier.tick(event.timestamp_ms).iter().copied());
        out.extend(classifier.handle(event).iter().copied());
    }
    if let Some(last) = events.last() {
        let tail_ms = last.timestamp_ms.saturating_add(crate::gesture::HOLD_THRESHOLD_MS);
        out.extend(classifier.tick(tail_ms).iter().copied());
    }
    out
}

#[cfg(test)]
mod tests;
