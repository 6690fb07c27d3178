use std::{io, path::Path, time::UNIX_EPOCH};

use evdev::{AbsoluteAxisCode, Device, KeyCode};

use super::record::{InputRecord, RecordSource};

/// Read-only capability queries against one open device node.
///
/// Masks are the kernel's raw bit layout: bit `n` of `event_types` is event
/// type `n`, bit `n` of `abs_axes` is absolute axis `n`.
pub trait DeviceQuery {
    fn name(&self) -> Option<String>;
    fn event_types(&self) -> u32;
    fn abs_axes(&self) -> u64;
    fn has_key(&self, code: u16) -> bool;
    /// `(minimum, maximum)` reported for `axis`.
    fn abs_range(&self, axis: u16) -> Option<(i32, i32)>;
}

pub trait InputDevice: DeviceQuery + RecordSource {}

impl<T: DeviceQuery + RecordSource> InputDevice for T {}

pub trait DeviceOpener: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Box<dyn InputDevice>>;
}

/// Opens nodes through the `evdev` crate, read-only and non-blocking.
#[derive(Clone, Copy, Debug, Default)]
pub struct EvdevOpener;

impl DeviceOpener for EvdevOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn InputDevice>> {
        let device = Device::open(path)?;
        device.set_nonblocking(true)?;
        Ok(Box::new(device))
    }
}

impl DeviceQuery for Device {
    fn name(&self) -> Option<String> {
        Device::name(self).map(str::to_owned)
    }

    fn event_types(&self) -> u32 {
        self.supported_events()
            .iter()
            .filter(|ty| ty.0 < 32)
            .fold(0, |mask, ty| mask | (1u32 << ty.0))
    }

    fn abs_axes(&self) -> u64 {
        self.supported_absolute_axes().map_or(0, |axes| {
            axes.iter()
                .filter(|axis| axis.0 < 64)
                .fold(0, |mask, axis| mask | (1u64 << axis.0))
        })
    }

    fn has_key(&self, code: u16) -> bool {
        self.supported_keys()
            .is_some_and(|keys| keys.contains(KeyCode(code)))
    }

    fn abs_range(&self, axis: u16) -> Option<(i32, i32)> {
        self.get_absinfo()
            .ok()?
            .find(|(code, _)| *code == AbsoluteAxisCode(axis))
            .map(|(_, info)| (info.minimum(), info.maximum()))
    }
}

impl RecordSource for Device {
    fn fetch(&mut self, out: &mut Vec<InputRecord>) -> io::Result<()> {
        for event in self.fetch_events()? {
            let time_us = event
                .timestamp()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_micros() as u64);
            out.push(InputRecord {
                time_us,
                kind: event.event_type().0,
                code: event.code(),
                value: event.value(),
            });
        }
        Ok(())
    }
}
