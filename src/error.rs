use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid input configuration: {0}")]
    Config(String),

    #[error("unknown input source `{0}` (use native|raw-device|synthetic)")]
    UnknownSource(String),

    #[error("failed to open {path}: {source}")]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a touch device: {reason}")]
    NotATouchDevice { reason: String },

    #[error("no multi-touch device found under {root}")]
    NoDeviceFound { root: PathBuf },

    #[error("input device disconnected")]
    DeviceDisconnected,

    #[error("input source used before initialize")]
    NotInitialized,

    #[error("input source already running")]
    AlreadyRunning,

    #[error("event sink closed")]
    SinkClosed,

    #[error("failed to spawn input thread: {0}")]
    Thread(#[source] io::Error),

    #[error("trace line {line}: {reason}")]
    Trace { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl InputError {
    pub(crate) fn not_touch(reason: impl Into<String>) -> Self {
        InputError::NotATouchDevice {
            reason: reason.into(),
        }
    }

    pub(crate) fn trace(line: usize, reason: impl Into<String>) -> Self {
        InputError::Trace {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        InputError::Config(reason.into())
    }
}

pub type Result<T, E = InputError> = core::result::Result<T, E>;
