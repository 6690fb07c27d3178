use core::sync::atomic::{AtomicBool, Ordering};
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, info, warn};

use super::{
    contacts::{ContactTracker, FrameTransitions},
    probe::DeviceCapabilities,
    query::InputDevice,
    record::InputRecord,
};
use crate::{
    error::{InputError, Result},
    handler::sink::EventSink,
    host::emulate_mouse,
    normalize::ContactNormalizer,
    source::{SourceStatus, StatusCell},
};

pub const READER_THREAD_NAME: &str = "panel-input-evdev";
pub const READER_IDLE_SLEEP: Duration = Duration::from_micros(500);

const ENODEV: i32 = 19;
const ENXIO: i32 = 6;
const EIO: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderSettings {
    pub mouse_emulation: bool,
    pub reference: (u32, u32),
}

/// Background thread turning one device's record stream into pointer events.
pub struct RawDeviceReader {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(ENODEV | ENXIO | EIO))
}

impl RawDeviceReader {
    pub fn spawn(
        device: Box<dyn InputDevice>,
        capabilities: &DeviceCapabilities,
        settings: ReaderSettings,
        sink: EventSink,
        status: StatusCell,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let mut worker = ReaderLoop {
            device,
            tracker: ContactTracker::new(capabilities.protocol, capabilities.slot_count),
            normalizer: ContactNormalizer::new(capabilities),
            settings,
            sink,
            status: status.clone(),
            running: running.clone(),
        };
        status.set(SourceStatus::Running);
        let handle = thread::Builder::new()
            .name(READER_THREAD_NAME.into())
            .spawn(move || worker.run())
            .map_err(|err| {
                status.set(SourceStatus::Failed);
                InputError::Thread(err)
            })?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signals the loop and joins the thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("input: reader thread panicked");
            }
        }
    }
}

impl Drop for RawDeviceReader {
    fn drop(&mut self) {
        self.stop();
    }
}

struct ReaderLoop {
    device: Box<dyn InputDevice>,
    tracker: ContactTracker,
    normalizer: ContactNormalizer,
    settings: ReaderSettings,
    sink: EventSink,
    status: StatusCell,
    running: Arc<AtomicBool>,
}

impl ReaderLoop {
    fn run(&mut self) {
        info!("input: reader started");
        let mut records: Vec<InputRecord> = Vec::with_capacity(64);
        'read: while self.running.load(Ordering::Acquire) {
            records.clear();
            match self.device.fetch(&mut records) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(READER_IDLE_SLEEP);
                    continue;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if is_disconnect(&err) => {
                    warn!("input: device disconnected: {err}");
                    self.status.set(SourceStatus::Disconnected);
                    break;
                }
                Err(err) => {
                    error!("input: device read failed: {err}");
                    self.status.set(SourceStatus::Failed);
                    break;
                }
            }
            if records.is_empty() {
                thread::sleep(READER_IDLE_SLEEP);
                continue;
            }
            for record in &records {
                if let Some(frame) = self.tracker.process(record) {
                    if let Err(err) = self.emit(&frame) {
                        debug!("input: reader stopping: {err}");
                        break 'read;
                    }
                }
            }
        }

        let releases = self.tracker.release_all(0);
        let _ = self.emit(&releases);
        self.running.store(false, Ordering::Release);
        info!("input: reader exited ({})", self.status.get().label());
    }

    fn emit(&self, frame: &FrameTransitions) -> Result<()> {
        for transition in frame {
            let pointer = self.normalizer.to_pointer(transition, self.sink.now_ms());
            self.sink.push_event(pointer)?;
            if self.settings.mouse_emulation && transition.slot == 0 {
                self.sink
                    .push_event(emulate_mouse(&pointer, self.settings.reference))?;
            }
        }
        Ok(())
    }
}
