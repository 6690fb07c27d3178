use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::{
    config::{InputConfig, SourceKind},
    device::probe::{CapabilityFlags, DeviceCapabilities},
    error::Result,
    handler::sink::EventSink,
    host::HostEventPump,
};

pub mod native;
pub mod raw_device;
pub mod synthetic;

pub use native::NativeSource;
pub use raw_device::RawDeviceSource;
pub use synthetic::{SyntheticScript, SyntheticSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SourceStatus {
    Idle = 0,
    Initialized = 1,
    Running = 2,
    Stopped = 3,
    Disconnected = 4,
    Failed = 5,
}

impl SourceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SourceStatus::Idle => "idle",
            SourceStatus::Initialized => "initialized",
            SourceStatus::Running => "running",
            SourceStatus::Stopped => "stopped",
            SourceStatus::Disconnected => "disconnected",
            SourceStatus::Failed => "failed",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SourceStatus::Initialized,
            2 => SourceStatus::Running,
            3 => SourceStatus::Stopped,
            4 => SourceStatus::Disconnected,
            5 => SourceStatus::Failed,
            _ => SourceStatus::Idle,
        }
    }
}

/// Status shared between a source and its background thread.
#[derive(Clone, Debug, Default)]
pub struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    pub fn get(&self) -> SourceStatus {
        SourceStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, status: SourceStatus) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Moves `from` to `to`; a terminal status set by the thread is kept.
    pub fn transition(&self, from: SourceStatus, to: SourceStatus) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceCapabilities {
    pub kind: SourceKind,
    pub flags: CapabilityFlags,
    pub max_contacts: usize,
    pub device: Option<DeviceCapabilities>,
}

impl SourceCapabilities {
    pub fn has_touch(&self) -> bool {
        self.flags.contains(CapabilityFlags::TOUCH)
    }

    pub fn has_mouse(&self) -> bool {
        self.flags.contains(CapabilityFlags::MOUSE)
    }

    pub fn has_keyboard(&self) -> bool {
        self.flags.contains(CapabilityFlags::KEYBOARD)
    }
}

/// Contract every producer of input events fulfils.
///
/// `initialize` must succeed before `start`. `stop` blocks until any
/// background thread has exited.
pub trait InputSource {
    fn kind(&self) -> SourceKind;
    fn initialize(&mut self, config: &InputConfig) -> Result<()>;
    fn start(&mut self, sink: EventSink) -> Result<()>;
    fn stop(&mut self);
    /// Synchronous work on the consumer thread.
    fn poll(&mut self) {}
    fn capabilities(&self) -> SourceCapabilities;
    fn cleanup(&mut self);
    fn status(&self) -> SourceStatus;
}

pub enum Source {
    Native(NativeSource),
    RawDevice(RawDeviceSource),
    Synthetic(SyntheticSource),
}

impl Source {
    /// Uninitialized source for `kind`.
    pub fn for_kind(kind: SourceKind, pump: Option<Box<dyn HostEventPump>>) -> Self {
        match kind {
            SourceKind::Native => Source::Native(NativeSource::new(pump)),
            SourceKind::RawDevice => Source::RawDevice(RawDeviceSource::new()),
            SourceKind::Synthetic => Source::Synthetic(SyntheticSource::new()),
        }
    }

    pub fn as_synthetic(&self) -> Option<&SyntheticSource> {
        match self {
            Source::Synthetic(source) => Some(source),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn InputSource {
        match self {
            Source::Native(source) => source,
            Source::RawDevice(source) => source,
            Source::Synthetic(source) => source,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn InputSource {
        match self {
            Source::Native(source) => source,
            Source::RawDevice(source) => source,
            Source::Synthetic(source) => source,
        }
    }
}

impl InputSource for Source {
    fn kind(&self) -> SourceKind {
        self.inner().kind()
    }

    fn initialize(&mut self, config: &InputConfig) -> Result<()> {
        self.inner_mut().initialize(config)
    }

    fn start(&mut self, sink: EventSink) -> Result<()> {
        self.inner_mut().start(sink)
    }

    fn stop(&mut self) {
        self.inner_mut().stop()
    }

    fn poll(&mut self) {
        self.inner_mut().poll()
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.inner().capabilities()
    }

    fn cleanup(&mut self) {
        self.inner_mut().cleanup()
    }

    fn status(&self) -> SourceStatus {
        self.inner().status()
    }
}
