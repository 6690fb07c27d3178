use core::sync::atomic::{AtomicBool, Ordering};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use log::{debug, error, info};

use super::{InputSource, SourceCapabilities, SourceStatus, StatusCell};
use crate::{
    config::{InputConfig, SourceKind, SyntheticConfig},
    device::probe::CapabilityFlags,
    error::{InputError, Result},
    handler::sink::EventSink,
    types::{InputEvent, PointerEvent, PointerKind, SourceLabel},
};

pub mod pattern;

use pattern::{FrameDiff, PatternFrames};

pub const SYNTHETIC_THREAD_NAME: &str = "panel-input-synthetic";
pub const SCRIPT_CAPACITY: usize = 64;
const STOP_POLL: Duration = Duration::from_millis(1);

type ScriptQueue = Channel<CriticalSectionRawMutex, InputEvent, SCRIPT_CAPACITY>;

/// Handle for feeding hand-written events into a running synthetic source.
///
/// Queued events are forwarded on the next generator frame with a fresh
/// timestamp; pointer events are relabelled as mock input.
#[derive(Clone)]
pub struct SyntheticScript {
    queue: Arc<ScriptQueue>,
}

impl Default for SyntheticScript {
    fn default() -> Self {
        Self {
            queue: Arc::new(Channel::new()),
        }
    }
}

impl SyntheticScript {
    /// `false` when the script queue is full.
    pub fn push(&self, event: impl Into<InputEvent>) -> bool {
        self.queue.try_send(event.into()).is_ok()
    }

    pub fn pointer(&self, kind: PointerKind, touch_id: u32, x: f32, y: f32) -> bool {
        self.push(PointerEvent::new(kind, touch_id, x, y, 0, SourceLabel::Mock))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn forward(&self, sink: &EventSink) -> Result<()> {
        while let Ok(event) = self.queue.try_receive() {
            sink.push_event(restamp(event, sink.now_ms()))?;
        }
        Ok(())
    }
}

fn restamp(event: InputEvent, now_ms: u64) -> InputEvent {
    match event {
        InputEvent::Pointer(mut pointer) => {
            pointer.timestamp_ms = now_ms;
            pointer.source = SourceLabel::Mock;
            pointer.into()
        }
        InputEvent::Mouse(mut mouse) => {
            mouse.timestamp_ms = now_ms;
            mouse.into()
        }
        InputEvent::Key(mut key) => {
            key.timestamp_ms = now_ms;
            key.into()
        }
    }
}

/// Generates gesture patterns and scripted events on a background thread.
pub struct SyntheticSource {
    config: Option<SyntheticConfig>,
    script: SyntheticScript,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    status: StatusCell,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            config: None,
            script: SyntheticScript::default(),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            status: StatusCell::default(),
        }
    }

    pub fn script(&self) -> SyntheticScript {
        self.script.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl InputSource for SyntheticSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }

    fn initialize(&mut self, config: &InputConfig) -> Result<()> {
        let synthetic = &config.synthetic;
        if synthetic.frame_interval_ms == 0 || synthetic.duration_ms == 0 {
            return Err(InputError::config(
                "synthetic frame_interval_ms and duration_ms must be > 0",
            ));
        }
        self.config = Some(synthetic.clone());
        self.status.set(SourceStatus::Initialized);
        Ok(())
    }

    fn start(&mut self, sink: EventSink) -> Result<()> {
        if self.is_running() {
            return Err(InputError::AlreadyRunning);
        }
        let Some(config) = self.config.clone() else {
            return Err(InputError::NotInitialized);
        };
        // Reap a generator that finished on its own.
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        self.running.store(true, Ordering::Release);
        let mut generator = Generator {
            config,
            script: self.script.clone(),
            sink,
            running: self.running.clone(),
        };
        let handle = thread::Builder::new()
            .name(SYNTHETIC_THREAD_NAME.into())
            .spawn(move || generator.run())
            .map_err(|err| {
                self.running.store(false, Ordering::Release);
                self.status.set(SourceStatus::Failed);
                InputError::Thread(err)
            })?;
        self.handle = Some(handle);
        self.status.set(SourceStatus::Running);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("input: synthetic generator panicked");
            }
            self.status
                .transition(SourceStatus::Running, SourceStatus::Stopped);
        }
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            kind: SourceKind::Synthetic,
            flags: CapabilityFlags::TOUCH | CapabilityFlags::MULTI_TOUCH,
            max_contacts: 2,
            device: None,
        }
    }

    fn cleanup(&mut self) {
        self.stop();
        while self.script.queue.try_receive().is_ok() {}
        self.status.set(SourceStatus::Idle);
    }

    fn status(&self) -> SourceStatus {
        self.status.get()
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Generator {
    config: SyntheticConfig,
    script: SyntheticScript,
    sink: EventSink,
    running: Arc<AtomicBool>,
}

impl Generator {
    fn run(&mut self) {
        let pattern = self.config.pattern;
        info!(
            "input: synthetic generator started (pattern={})",
            pattern.map_or("none", |p| p.label())
        );
        if let Err(err) = self.generate() {
            debug!("input: synthetic generator stopping: {err}");
        }
        self.running.store(false, Ordering::Release);
        info!("input: synthetic generator exited");
    }

    fn generate(&mut self) -> Result<()> {
        let interval = Duration::from_millis(self.config.frame_interval_ms);
        if let Some(pattern) = self.config.pattern {
            loop {
                let cycle_start = Instant::now();
                let mut diff = FrameDiff::default();
                let frames = PatternFrames::new(
                    pattern,
                    self.config.frame_interval_ms,
                    self.config.duration_ms,
                );
                for frame in frames {
                    if !self.sleep_until(cycle_start + Duration::from_millis(frame.t_ms)) {
                        return Ok(());
                    }
                    self.script.forward(&self.sink)?;
                    let now_ms = self.sink.now_ms();
                    for (kind, contact) in diff.apply(&frame) {
                        let event = PointerEvent::new(
                            kind,
                            contact.id,
                            contact.x,
                            contact.y,
                            now_ms,
                            SourceLabel::Mock,
                        );
                        self.sink.push_event(event)?;
                    }
                }
                if !self.config.repeat {
                    break;
                }
            }
        }
        // Pattern done (or none configured): keep forwarding the script.
        while self.sleep_until(Instant::now() + interval) {
            self.script.forward(&self.sink)?;
        }
        Ok(())
    }

    /// `false` once stop was requested.
    fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if !self.running.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(STOP_POLL));
        }
    }
}
