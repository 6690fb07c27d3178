use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use log::info;

use super::{InputSource, SourceCapabilities, SourceStatus, StatusCell};
use crate::{
    config::{InputConfig, SourceKind},
    device::{
        probe::{probe_capabilities, DeviceCapabilities},
        query::{DeviceOpener, EvdevOpener, InputDevice},
        reader::{RawDeviceReader, ReaderSettings},
        scan::DeviceScanner,
    },
    error::{InputError, Result},
    handler::sink::EventSink,
};

/// Kernel input device read on a dedicated thread.
pub struct RawDeviceSource {
    opener: Arc<dyn DeviceOpener>,
    path: Option<PathBuf>,
    device: Option<Box<dyn InputDevice>>,
    capabilities: Option<DeviceCapabilities>,
    settings: ReaderSettings,
    reader: Option<RawDeviceReader>,
    status: StatusCell,
}

impl Default for RawDeviceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RawDeviceSource {
    pub fn new() -> Self {
        Self::with_opener(Arc::new(EvdevOpener))
    }

    pub fn with_opener(opener: Arc<dyn DeviceOpener>) -> Self {
        Self {
            opener,
            path: None,
            device: None,
            capabilities: None,
            settings: ReaderSettings {
                mouse_emulation: false,
                reference: (1, 1),
            },
            reader: None,
            status: StatusCell::default(),
        }
    }

    pub fn device_path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn device_capabilities(&self) -> Option<&DeviceCapabilities> {
        self.capabilities.as_ref()
    }

    fn resolve_path(&self, config: &InputConfig) -> Result<PathBuf> {
        if let Some(path) = &config.device_path {
            return Ok(path.clone());
        }
        if config.auto_detect_device && config.auto_detect_devices {
            let hit = DeviceScanner::new(&config.device_root, self.opener.as_ref()).scan()?;
            return Ok(hit.path);
        }
        Err(InputError::config(
            "raw-device source needs device_path or auto_detect_device",
        ))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn InputDevice>> {
        self.opener
            .open(path)
            .map_err(|source| InputError::DeviceOpen {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl InputSource for RawDeviceSource {
    fn kind(&self) -> SourceKind {
        SourceKind::RawDevice
    }

    fn initialize(&mut self, config: &InputConfig) -> Result<()> {
        let path = self.resolve_path(config)?;
        let device = self.open(&path)?;
        let capabilities = probe_capabilities(device.as_ref())?;
        info!(
            "input: opened {} ({}, {} slots)",
            path.display(),
            capabilities.name,
            capabilities.slot_count
        );
        self.settings = ReaderSettings {
            mouse_emulation: config.mouse_emulation,
            reference: config.reference_size(),
        };
        self.path = Some(path);
        self.device = Some(device);
        self.capabilities = Some(capabilities);
        self.status.set(SourceStatus::Initialized);
        Ok(())
    }

    fn start(&mut self, sink: EventSink) -> Result<()> {
        if self.reader.as_ref().is_some_and(RawDeviceReader::is_running) {
            return Err(InputError::AlreadyRunning);
        }
        // A node that went away is not reopened by this instance.
        if self.status.get() == SourceStatus::Disconnected {
            return Err(InputError::DeviceDisconnected);
        }
        let (Some(path), Some(capabilities)) = (self.path.clone(), self.capabilities.as_ref())
        else {
            return Err(InputError::NotInitialized);
        };
        // The previous reader consumed the handle; reopen for a restart.
        let device = match self.device.take() {
            Some(device) => device,
            None => self.open(&path)?,
        };
        self.reader = None;
        let reader = RawDeviceReader::spawn(
            device,
            capabilities,
            self.settings,
            sink,
            self.status.clone(),
        )?;
        self.reader = Some(reader);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
            self.status
                .transition(SourceStatus::Running, SourceStatus::Stopped);
        }
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            kind: SourceKind::RawDevice,
            flags: self
                .capabilities
                .as_ref()
                .map(|caps| caps.flags)
                .unwrap_or_default(),
            max_contacts: self
                .capabilities
                .as_ref()
                .map_or(0, |caps| caps.slot_count),
            device: self.capabilities.clone(),
        }
    }

    fn cleanup(&mut self) {
        self.stop();
        self.device = None;
        self.status.set(SourceStatus::Idle);
    }

    fn status(&self) -> SourceStatus {
        self.status.get()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{
        device::{
            codes::*,
            fake::{FakeDevice, FakeOpener},
            record::{InputRecord, ReplaySource},
            scan::node_path,
        },
        normalize::Clock,
        types::{InputEvent, MouseAction, PointerKind},
    };

    fn touch_stroke() -> Vec<InputRecord> {
        vec![
            InputRecord::abs(ABS_MT_SLOT, 0),
            InputRecord::abs(ABS_MT_TRACKING_ID, 5),
            InputRecord::abs(ABS_MT_POSITION_X, 0),
            InputRecord::abs(ABS_MT_POSITION_Y, 4095),
            InputRecord::syn(),
            InputRecord::abs(ABS_MT_POSITION_X, 4095),
            InputRecord::syn(),
            InputRecord::abs(ABS_MT_TRACKING_ID, -1),
            InputRecord::syn(),
        ]
    }

    fn drain_until(sink: &EventSink, count: usize) -> Vec<InputEvent> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut out = Vec::new();
        while out.len() < count && Instant::now() < deadline {
            match sink.try_receive() {
                Some(event) => out.push(event),
                None => thread::sleep(Duration::from_millis(1)),
            }
        }
        out
    }

    fn config(path: &str, mouse_emulation: bool) -> InputConfig {
        InputConfig {
            device_path: Some(PathBuf::from(path)),
            mouse_emulation,
            ..InputConfig::default()
        }
    }

    #[test]
    fn start_before_initialize_fails() {
        let mut source = RawDeviceSource::with_opener(Arc::new(FakeOpener::default()));
        let sink = EventSink::new(Clock::new());
        assert!(matches!(source.start(sink), Err(InputError::NotInitialized)));
    }

    #[test]
    fn missing_explicit_device_is_open_error() {
        let mut source = RawDeviceSource::with_opener(Arc::new(FakeOpener::default()));
        let err = source.initialize(&config("/dev/input/event9", false)).unwrap_err();
        assert!(matches!(err, InputError::DeviceOpen { .. }));
        assert_eq!(source.status(), SourceStatus::Idle);
    }

    #[test]
    fn auto_detect_uses_scanner() {
        let root = PathBuf::from("/fake/input");
        let opener = FakeOpener::default()
            .with(node_path(&root, 0), FakeDevice::keyboard())
            .with(node_path(&root, 1), FakeDevice::mt_panel());
        let mut source = RawDeviceSource::with_opener(Arc::new(opener));
        let config = InputConfig {
            device_root: root.clone(),
            ..InputConfig::default()
        };
        source.initialize(&config).unwrap();
        assert_eq!(source.device_path(), Some(&node_path(&root, 1)));
        assert_eq!(
            source.device_capabilities().map(|caps| caps.name.as_str()),
            Some("fake-mt-panel")
        );
    }

    #[test]
    fn reader_emits_normalized_stroke_with_mouse_emulation() {
        let device = FakeDevice::mt_panel().with_records(ReplaySource::new(touch_stroke(), 3));
        let opener = FakeOpener::default().with("/dev/input/event2", device);
        let mut source = RawDeviceSource::with_opener(Arc::new(opener));
        source.initialize(&config("/dev/input/event2", true)).unwrap();
        assert!(source.capabilities().has_touch());

        let sink = EventSink::new(Clock::new());
        source.start(sink.clone()).unwrap();
        assert_eq!(source.status(), SourceStatus::Running);
        let events = drain_until(&sink, 6);
        source.stop();
        assert_eq!(source.status(), SourceStatus::Stopped);

        let pointers: Vec<_> = events.iter().filter_map(InputEvent::as_pointer).collect();
        let kinds: Vec<_> = pointers.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PointerKind::Down, PointerKind::Move, PointerKind::Up]);
        assert_eq!((pointers[0].x, pointers[0].y), (0.0, 1.0));
        assert_eq!(pointers[1].x, 1.0);

        let mouse: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                InputEvent::Mouse(mouse) => Some(mouse.action),
                _ => None,
            })
            .collect();
        assert_eq!(mouse.len(), 3);
        assert_eq!(mouse[1], MouseAction::Motion);
        assert_eq!(sink.counters().touch, 3);
        assert_eq!(sink.counters().mouse, 3);
    }

    #[test]
    fn device_removal_surfaces_as_disconnected() {
        let records = ReplaySource::new(touch_stroke()[..5].to_vec(), 16).ending_with_os_error(19);
        let device = FakeDevice::mt_panel().with_records(records);
        let opener = FakeOpener::default().with("/dev/input/event4", device);
        let mut source = RawDeviceSource::with_opener(Arc::new(opener));
        source.initialize(&config("/dev/input/event4", false)).unwrap();

        let sink = EventSink::new(Clock::new());
        source.start(sink.clone()).unwrap();
        let events = drain_until(&sink, 2);
        let deadline = Instant::now() + Duration::from_secs(2);
        while source.status() == SourceStatus::Running && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(source.status(), SourceStatus::Disconnected);
        source.stop();
        assert_eq!(source.status(), SourceStatus::Disconnected);
        assert!(matches!(
            source.start(sink.clone()),
            Err(InputError::DeviceDisconnected)
        ));

        // The open contact is released when the loop exits.
        let kinds: Vec<_> = events
            .iter()
            .filter_map(InputEvent::as_pointer)
            .map(|p| p.kind)
            .collect();
        assert_eq!(kinds, vec![PointerKind::Down, PointerKind::Up]);
    }
}
