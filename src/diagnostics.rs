//! Human-readable dumps for bring-up. Not a stable format.

use core::fmt::Write as _;
use std::path::Path;

use crate::{
    device::{
        codes::{abs_axis_label, BTN_LEFT, BTN_TOUCH},
        probe::{probe_capabilities, EventTypes},
        query::{DeviceOpener, DeviceQuery, EvdevOpener},
        scan::ScanEntry,
    },
    error::{InputError, Result},
};

/// Raw capabilities of the device at `path`, read through evdev.
pub fn describe_device(path: &Path) -> Result<String> {
    describe_device_with(&EvdevOpener, path)
}

pub fn describe_device_with(opener: &dyn DeviceOpener, path: &Path) -> Result<String> {
    let device = opener.open(path).map_err(|source| InputError::DeviceOpen {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(describe_query(path, device.as_ref()))
}

fn describe_query(path: &Path, query: &dyn DeviceQuery) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "device: {}", path.display());
    let _ = writeln!(
        out,
        "name: {}",
        query.name().unwrap_or_else(|| "unknown".into())
    );
    let _ = writeln!(
        out,
        "event types: {:?}",
        EventTypes::from_bits_retain(query.event_types())
    );
    let axes = query.abs_axes();
    for axis in (0u16..64).filter(|axis| axes & (1u64 << axis) != 0) {
        let label = abs_axis_label(axis);
        match query.abs_range(axis) {
            Some((min, max)) => {
                let _ = writeln!(out, "  {label} (0x{axis:02x}): [{min}..{max}]");
            }
            None => {
                let _ = writeln!(out, "  {label} (0x{axis:02x}): no range");
            }
        }
    }
    let _ = writeln!(
        out,
        "keys: BTN_TOUCH={} BTN_LEFT={}",
        query.has_key(BTN_TOUCH),
        query.has_key(BTN_LEFT)
    );
    match probe_capabilities(query) {
        Ok(capabilities) => {
            let _ = writeln!(out, "touch: {capabilities}");
        }
        Err(err) => {
            let _ = writeln!(out, "touch: unusable ({err})");
        }
    }
    out
}

/// One line per node from `DeviceScanner::scan_all`.
pub fn describe_scan(entries: &[ScanEntry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        out.push_str("no readable input nodes\n");
    }
    for entry in entries {
        let _ = match &entry.probe {
            Ok(capabilities) => writeln!(out, "{}: {capabilities}", entry.path.display()),
            Err(err) => writeln!(out, "{}: {err}", entry.path.display()),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::device::{
        fake::{FakeDevice, FakeOpener},
        scan::{node_path, DeviceScanner},
    };

    #[test]
    fn device_dump_lists_axes_and_probe_outcome() {
        let opener = FakeOpener::default().with("/dev/input/event5", FakeDevice::mt_panel());
        let dump = describe_device_with(&opener, Path::new("/dev/input/event5")).unwrap();
        assert!(dump.contains("name: fake-mt-panel"));
        assert!(dump.contains("ABS_MT_POSITION_X (0x35): [0..4095]"));
        assert!(dump.contains("keys: BTN_TOUCH=true"));
        assert!(dump.contains("protocol=mt-slots slots=2"));
    }

    #[test]
    fn keyboard_dump_explains_rejection() {
        let opener = FakeOpener::default().with("/dev/input/event0", FakeDevice::keyboard());
        let dump = describe_device_with(&opener, Path::new("/dev/input/event0")).unwrap();
        assert!(dump.contains("touch: unusable (not a touch device"));
    }

    #[test]
    fn missing_device_is_open_error() {
        let opener = FakeOpener::default();
        assert!(matches!(
            describe_device_with(&opener, Path::new("/dev/input/event7")),
            Err(InputError::DeviceOpen { .. })
        ));
    }

    #[test]
    fn scan_dump_has_line_per_node() {
        let root = PathBuf::from("/fake/input");
        let opener = FakeOpener::default()
            .with(node_path(&root, 0), FakeDevice::keyboard())
            .with(node_path(&root, 2), FakeDevice::single_touch());
        let dump = describe_scan(&DeviceScanner::new(&root, &opener).scan_all());
        assert_eq!(dump.lines().count(), 2);
        assert!(dump.contains("event2: name=\"fake-resistive\""));
        assert_eq!(describe_scan(&[]), "no readable input nodes\n");
    }
}
