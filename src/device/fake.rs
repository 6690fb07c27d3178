//! In-memory devices for tests.

use std::{
    collections::{BTreeMap, HashMap},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use super::{
    codes::*,
    query::{DeviceOpener, DeviceQuery, InputDevice},
    record::{InputRecord, RecordSource, ReplaySource},
};

#[derive(Clone)]
pub(crate) struct FakeDevice {
    name: String,
    event_types: u32,
    axes: BTreeMap<u16, (i32, i32)>,
    keys: Vec<u16>,
    records: ReplaySource,
}

impl FakeDevice {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            event_types: 1 << EV_SYN,
            axes: BTreeMap::new(),
            keys: Vec::new(),
            records: ReplaySource::new([], 1),
        }
    }

    pub(crate) fn with_event_type(mut self, kind: u16) -> Self {
        self.event_types |= 1 << kind;
        self
    }

    pub(crate) fn with_axis(mut self, axis: u16, min: i32, max: i32) -> Self {
        self.event_types |= 1 << EV_ABS;
        self.axes.insert(axis, (min, max));
        self
    }

    pub(crate) fn with_key(mut self, code: u16) -> Self {
        self.event_types |= 1 << EV_KEY;
        self.keys.push(code);
        self
    }

    pub(crate) fn with_records(mut self, records: ReplaySource) -> Self {
        self.records = records;
        self
    }

    /// Two-slot type B panel, 0..4095 on both axes, pressure 0..255.
    pub(crate) fn mt_panel() -> Self {
        Self::new("fake-mt-panel")
            .with_axis(ABS_MT_SLOT, 0, 1)
            .with_axis(ABS_MT_TRACKING_ID, 0, 65535)
            .with_axis(ABS_MT_POSITION_X, 0, 4095)
            .with_axis(ABS_MT_POSITION_Y, 0, 4095)
            .with_axis(ABS_MT_PRESSURE, 0, 255)
            .with_key(BTN_TOUCH)
    }

    pub(crate) fn single_touch() -> Self {
        Self::new("fake-resistive")
            .with_axis(ABS_X, 100, 3900)
            .with_axis(ABS_Y, 200, 3800)
            .with_key(BTN_TOUCH)
    }

    pub(crate) fn keyboard() -> Self {
        Self::new("fake-keyboard")
            .with_key(KEY_A)
            .with_key(KEY_ENTER)
    }
}

impl DeviceQuery for FakeDevice {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn event_types(&self) -> u32 {
        self.event_types
    }

    fn abs_axes(&self) -> u64 {
        self.axes.keys().fold(0, |mask, axis| mask | (1u64 << axis))
    }

    fn has_key(&self, code: u16) -> bool {
        self.keys.contains(&code)
    }

    fn abs_range(&self, axis: u16) -> Option<(i32, i32)> {
        self.axes.get(&axis).copied()
    }
}

impl RecordSource for FakeDevice {
    fn fetch(&mut self, out: &mut Vec<InputRecord>) -> io::Result<()> {
        self.records.fetch(out)
    }
}

/// Hands out clones of pre-registered devices by path.
#[derive(Default)]
pub(crate) struct FakeOpener {
    devices: Mutex<HashMap<PathBuf, FakeDevice>>,
}

impl FakeOpener {
    pub(crate) fn with(self, path: impl Into<PathBuf>, device: FakeDevice) -> Self {
        if let Ok(mut devices) = self.devices.lock() {
            devices.insert(path.into(), device);
        }
        self
    }
}

impl DeviceOpener for FakeOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn InputDevice>> {
        let devices = self
            .devices
            .lock()
            .map_err(|_| io::Error::other("fake opener poisoned"))?;
        match devices.get(path) {
            Some(device) => Ok(Box::new(device.clone())),
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }
}
