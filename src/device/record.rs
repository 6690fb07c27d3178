use std::{collections::VecDeque, io};

use super::codes::{event_type_label, EV_ABS, EV_KEY, EV_SYN, SYN_REPORT};

/// One decoded kernel `input_event`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputRecord {
    pub time_us: u64,
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputRecord {
    pub const fn new(kind: u16, code: u16, value: i32) -> Self {
        Self {
            time_us: 0,
            kind,
            code,
            value,
        }
    }

    pub const fn abs(code: u16, value: i32) -> Self {
        Self::new(EV_ABS, code, value)
    }

    pub const fn key(code: u16, value: i32) -> Self {
        Self::new(EV_KEY, code, value)
    }

    pub const fn syn() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    pub fn is_sync_report(&self) -> bool {
        self.kind == EV_SYN && self.code == SYN_REPORT
    }
}

impl core::fmt::Display for InputRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} code=0x{:03x} value={}",
            event_type_label(self.kind),
            self.code,
            self.value
        )
    }
}

/// `struct input_event` layouts: `timeval` is two longs, so the record is
/// 24 bytes on 64-bit userspace and 16 bytes on 32-bit (e.g. armv7 panels).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordLayout {
    Wide,
    Compact,
}

impl RecordLayout {
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            RecordLayout::Wide
        } else {
            RecordLayout::Compact
        }
    }

    pub const fn size(self) -> usize {
        match self {
            RecordLayout::Wide => 24,
            RecordLayout::Compact => 16,
        }
    }

    pub fn decode(self, buf: &[u8]) -> Option<InputRecord> {
        if buf.len() < self.size() {
            return None;
        }
        let (sec, usec, rest) = match self {
            RecordLayout::Wide => (
                i64::from_le_bytes(buf[0..8].try_into().ok()?),
                i64::from_le_bytes(buf[8..16].try_into().ok()?),
                &buf[16..24],
            ),
            RecordLayout::Compact => (
                i64::from(i32::from_le_bytes(buf[0..4].try_into().ok()?)),
                i64::from(i32::from_le_bytes(buf[4..8].try_into().ok()?)),
                &buf[8..16],
            ),
        };
        let kind = u16::from_le_bytes([rest[0], rest[1]]);
        let code = u16::from_le_bytes([rest[2], rest[3]]);
        let value = i32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
        let time_us = (sec.max(0) as u64)
            .saturating_mul(1_000_000)
            .saturating_add(usec.max(0) as u64);
        Some(InputRecord {
            time_us,
            kind,
            code,
            value,
        })
    }
}

/// Splits a byte stream into records; partial trailing bytes are kept for the
/// next `push`.
pub struct RecordDecoder {
    layout: RecordLayout,
    pending: Vec<u8>,
}

impl RecordDecoder {
    pub fn new(layout: RecordLayout) -> Self {
        Self {
            layout,
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, bytes: &[u8], out: &mut Vec<InputRecord>) {
        self.pending.extend_from_slice(bytes);
        let size = self.layout.size();
        let whole = self.pending.len() / size * size;
        for chunk in self.pending[..whole].chunks_exact(size) {
            if let Some(record) = self.layout.decode(chunk) {
                out.push(record);
            }
        }
        self.pending.drain(..whole);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

pub fn decode_all(layout: RecordLayout, bytes: &[u8]) -> Vec<InputRecord> {
    let mut decoder = RecordDecoder::new(layout);
    let mut out = Vec::with_capacity(bytes.len() / layout.size());
    decoder.push(bytes, &mut out);
    out
}

/// Producer of raw records for the device reader thread.
///
/// `fetch` appends whatever is available and returns `WouldBlock` when the
/// device has nothing queued.
pub trait RecordSource: Send {
    fn fetch(&mut self, out: &mut Vec<InputRecord>) -> io::Result<()>;
}

/// Replays a fixed record list, `batch` records per fetch. Once drained it
/// reports `WouldBlock`, or `end_error` if one was set.
#[derive(Clone, Debug)]
pub struct ReplaySource {
    records: VecDeque<InputRecord>,
    batch: usize,
    end_error: Option<i32>,
}

impl ReplaySource {
    pub fn new(records: impl IntoIterator<Item = InputRecord>, batch: usize) -> Self {
        Self {
            records: records.into_iter().collect(),
            batch: batch.max(1),
            end_error: None,
        }
    }

    pub fn ending_with_os_error(mut self, errno: i32) -> Self {
        self.end_error = Some(errno);
        self
    }
}

impl RecordSource for ReplaySource {
    fn fetch(&mut self, out: &mut Vec<InputRecord>) -> io::Result<()> {
        if self.records.is_empty() {
            return Err(match self.end_error {
                Some(errno) => io::Error::from_raw_os_error(errno),
                None => io::ErrorKind::WouldBlock.into(),
            });
        }
        let take = self.batch.min(self.records.len());
        out.extend(self.records.drain(..take));
        Ok(())
    }
}
