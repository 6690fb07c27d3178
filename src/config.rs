use core::{fmt, str::FromStr};
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{InputError, Result};

pub const DEFAULT_DEVICE_ROOT: &str = "/dev/input";
pub const DEFAULT_REFERENCE_WIDTH: u32 = 800;
pub const DEFAULT_REFERENCE_HEIGHT: u32 = 480;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;
pub const DEFAULT_PATTERN_DURATION_MS: u64 = 1_000;
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 3;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Native,
    RawDevice,
    Synthetic,
}

impl SourceKind {
    pub const fn label(self) -> &'static str {
        match self {
            SourceKind::Native => "native",
            SourceKind::RawDevice => "raw-device",
            SourceKind::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceKind {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "native" | "sdl" => Ok(SourceKind::Native),
            "raw-device" | "raw_device" | "evdev" => Ok(SourceKind::RawDevice),
            "synthetic" | "mock" => Ok(SourceKind::Synthetic),
            other => Err(InputError::UnknownSource(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    Tap,
    Swipe,
    Pinch,
    Circle,
}

impl SyntheticPattern {
    pub const fn label(self) -> &'static str {
        match self {
            SyntheticPattern::Tap => "tap",
            SyntheticPattern::Swipe => "swipe",
            SyntheticPattern::Pinch => "pinch",
            SyntheticPattern::Circle => "circle",
        }
    }
}

impl FromStr for SyntheticPattern {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tap" => Ok(SyntheticPattern::Tap),
            "swipe" => Ok(SyntheticPattern::Swipe),
            "pinch" => Ok(SyntheticPattern::Pinch),
            "circle" => Ok(SyntheticPattern::Circle),
            other => Err(InputError::config(format!(
                "unknown synthetic pattern `{other}` (use tap|swipe|pinch|circle)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// `None` runs scripted events only.
    pub pattern: Option<SyntheticPattern>,
    pub frame_interval_ms: u64,
    pub duration_ms: u64,
    pub repeat: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            pattern: Some(SyntheticPattern::Swipe),
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            duration_ms: DEFAULT_PATTERN_DURATION_MS,
            repeat: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub source: SourceKind,
    pub device_path: Option<PathBuf>,
    pub auto_detect_device: bool,
    pub auto_detect_devices: bool,
    pub device_root: PathBuf,
    pub mouse_emulation: bool,
    pub reference_width: u32,
    pub reference_height: u32,
    // Reserved: reconnection policy belongs to the caller.
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub synthetic: SyntheticConfig,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::RawDevice,
            device_path: None,
            auto_detect_device: true,
            auto_detect_devices: true,
            device_root: PathBuf::from(DEFAULT_DEVICE_ROOT),
            mouse_emulation: false,
            reference_width: DEFAULT_REFERENCE_WIDTH,
            reference_height: DEFAULT_REFERENCE_HEIGHT,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl InputConfig {
    pub fn synthetic(pattern: Option<SyntheticPattern>) -> Self {
        Self {
            source: SourceKind::Synthetic,
            synthetic: SyntheticConfig {
                pattern,
                ..SyntheticConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)
            .map_err(|e| InputError::config(format!("failed to parse input config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            InputError::config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reference_width == 0 || self.reference_height == 0 {
            return Err(InputError::config(format!(
                "reference size must be non-zero, got {}x{}",
                self.reference_width, self.reference_height
            )));
        }
        if self.source == SourceKind::RawDevice
            && self.device_path.is_none()
            && !(self.auto_detect_device && self.auto_detect_devices)
        {
            return Err(InputError::config(
                "raw-device source needs device_path or auto_detect_device",
            ));
        }
        if self.source == SourceKind::Synthetic {
            if self.synthetic.frame_interval_ms == 0 {
                return Err(InputError::config("synthetic frame_interval_ms must be > 0"));
            }
            if self.synthetic.duration_ms == 0 {
                return Err(InputError::config("synthetic duration_ms must be > 0"));
            }
        }
        Ok(())
    }

    pub fn reference_size(&self) -> (u32, u32) {
        (self.reference_width, self.reference_height)
    }
}
