use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{anyhow, Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::json;

pub const LOG_JSON_PATH_ENV: &str = "PANEL_INPUT_LOG_JSON_PATH";
pub const LOG_LEVEL_ENV: &str = "PANEL_INPUT_LOG";

pub fn parse_level(raw: &str) -> Result<LevelFilter> {
    raw.trim()
        .parse::<LevelFilter>()
        .with_context(|| format!("{LOG_LEVEL_ENV} must be off|error|warn|info|debug|trace"))
}

/// Console logger with an optional JSON-lines mirror.
pub struct Logger {
    level: LevelFilter,
    json_file: Mutex<Option<File>>,
}

impl Logger {
    pub fn from_env() -> Result<Self> {
        let level = match std::env::var(LOG_LEVEL_ENV) {
            Ok(raw) => parse_level(&raw)?,
            Err(std::env::VarError::NotPresent) => LevelFilter::Info,
            Err(err) => return Err(anyhow!("{LOG_LEVEL_ENV} invalid: {err}")),
        };
        let path = std::env::var(LOG_JSON_PATH_ENV).ok();
        Self::new(level, path.map(PathBuf::from))
    }

    pub fn new(level: LevelFilter, path: Option<PathBuf>) -> Result<Self> {
        let json_file = match path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                Some(file)
            }
            None => None,
        };
        Ok(Self {
            level,
            json_file: Mutex::new(json_file),
        })
    }

    /// Installs `self` as the global `log` backend.
    pub fn install(self) -> Result<()> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self)).map_err(|err| anyhow!("logger: {err}"))?;
        log::set_max_level(level);
        Ok(())
    }

    fn event(&self, level: Level, target: &str, message: &str) {
        let Ok(mut guard) = self.json_file.lock() else {
            return;
        };
        let Some(file) = guard.as_mut() else {
            return;
        };

        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let entry = json!({
            "ts_ms": ts_ms,
            "level": level.as_str().to_ascii_lowercase(),
            "target": target,
            "msg": message,
        });

        let _ = writeln!(file, "{}", entry);
        let _ = file.flush();
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        match record.level() {
            Level::Error | Level::Warn => eprintln!("[{}] {message}", record.level()),
            _ => println!("[{}] {message}", record.level()),
        }
        self.event(record.level(), record.target(), &message);
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.json_file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}
