use core::fmt::Write as _;
use std::collections::VecDeque;

use log::{info, warn};

use crate::{
    config::InputConfig,
    error::{InputError, Result},
    host::{to_native, HostEventPump, HostEventSink},
    normalize::Clock,
    source::{InputSource, Source, SourceCapabilities, SourceStatus},
    types::InputEvent,
};

pub mod counters;
pub mod sink;

use counters::CounterSnapshot;
use sink::EventSink;

/// Owns one input source and the consumer side of its event sink.
///
/// Producers (source threads, tests) push through [`EventSink`]; the thread
/// owning the handler reads with [`InputHandler::poll_event`] or
/// [`InputHandler::drain`].
pub struct InputHandler {
    config: InputConfig,
    source: Source,
    sink: EventSink,
    clock: Clock,
    // Events parked at stop, served ahead of the queue.
    backlog: VecDeque<InputEvent>,
    running: bool,
}

impl InputHandler {
    /// Validates `config`, builds the selected source and initializes it.
    pub fn new(config: InputConfig) -> Result<Self> {
        let source = Source::for_kind(config.source, None);
        Self::with_source(config, source)
    }

    /// Native passthrough fed from the host toolkit's event pump.
    pub fn with_host_pump(config: InputConfig, pump: Box<dyn HostEventPump>) -> Result<Self> {
        let source = Source::for_kind(config.source, Some(pump));
        Self::with_source(config, source)
    }

    pub fn with_source(config: InputConfig, mut source: Source) -> Result<Self> {
        config.validate()?;
        if source.kind() != config.source {
            return Err(InputError::config(format!(
                "configured source `{}` does not match provided `{}`",
                config.source,
                source.kind()
            )));
        }
        source.initialize(&config)?;
        let clock = Clock::new();
        info!("input: handler ready (source={})", config.source);
        Ok(Self {
            config,
            source,
            sink: EventSink::new(clock),
            clock,
            backlog: VecDeque::new(),
            running: false,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Err(InputError::AlreadyRunning);
        }
        self.sink.open();
        if let Err(err) = self.source.start(self.sink.clone()) {
            self.sink.close();
            warn!("input: {} source failed to start: {err}", self.config.source);
            return Err(err);
        }
        self.running = true;
        info!("input: handler started");
        Ok(())
    }

    /// Blocks until the source's thread has exited. Contacts still down are
    /// released into the queue.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        // Close first so a producer stuck on a full queue can return.
        self.sink.close();
        self.source.stop();
        // The queue may be full; park it so the releases can follow in order.
        while let Some(event) = self.sink.try_receive() {
            self.backlog.push_back(event);
        }
        let released = self.sink.release_open_contacts();
        if !released.is_empty() {
            info!("input: released {} open contact(s)", released.len());
        }
        self.backlog.extend(released);
        self.running = false;
        info!("input: handler stopped");
    }

    /// `false` once stopped or once the source thread gave up.
    pub fn is_running(&self) -> bool {
        self.running && self.source.status() == SourceStatus::Running
    }

    pub fn poll_event(&mut self) -> Option<InputEvent> {
        if self.running {
            self.source.poll();
        }
        self.backlog
            .pop_front()
            .or_else(|| self.sink.try_receive())
    }

    pub fn drain(&mut self) -> Vec<InputEvent> {
        if self.running {
            self.source.poll();
        }
        let mut events = Vec::with_capacity(self.backlog.len() + self.sink.len());
        events.extend(self.backlog.drain(..));
        while let Some(event) = self.sink.try_receive() {
            events.push(event);
        }
        events
    }

    /// Injects every queued event into the host toolkit. Returns the count.
    pub fn forward_to(&mut self, host: &mut dyn HostEventSink) -> usize {
        let events = self.drain();
        for event in &events {
            host.inject(to_native(event));
        }
        events.len()
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.sink.counters()
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        self.source.capabilities()
    }

    pub fn status(&self) -> SourceStatus {
        self.source.status()
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn dump_state(&self) -> String {
        let capabilities = self.capabilities();
        let counters = self.counters();
        let mut out = String::new();
        let _ = writeln!(out, "source: {}", self.source.kind());
        let _ = writeln!(out, "status: {}", self.status().label());
        let _ = writeln!(out, "running: {}", self.is_running());
        let _ = writeln!(
            out,
            "capabilities: {:?} max_contacts={}",
            capabilities.flags, capabilities.max_contacts
        );
        if let Some(device) = &capabilities.device {
            let _ = writeln!(out, "device: {device}");
        }
        let _ = writeln!(
            out,
            "counters: total={} touch={} mouse={} keyboard={} rejected={} implicit_release={}",
            counters.total,
            counters.touch,
            counters.mouse,
            counters.keyboard,
            counters.rejected,
            counters.implicit_release
        );
        let _ = writeln!(
            out,
            "queue: {} pending, {} contact(s) down",
            self.backlog.len() + self.sink.len(),
            self.sink.active_contacts()
        );
        let _ = writeln!(
            out,
            "config: mouse_emulation={} reference={}x{} auto_detect={} device_path={}",
            self.config.mouse_emulation,
            self.config.reference_width,
            self.config.reference_height,
            self.config.auto_detect_device,
            self.config
                .device_path
                .as_deref()
                .map_or_else(|| "-".into(), |path| path.display().to_string())
        );
        out
    }
}

impl Drop for InputHandler {
    fn drop(&mut self) {
        self.stop();
        self.source.cleanup();
    }
}

#[cfg(test)]
mod tests;
