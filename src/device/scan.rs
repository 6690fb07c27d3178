use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{
    probe::{probe_capabilities, DeviceCapabilities},
    query::DeviceOpener,
};
use crate::error::{InputError, Result};

/// Nodes `event0` through `event31` are considered.
pub const SCAN_NODE_COUNT: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanHit {
    pub path: PathBuf,
    pub capabilities: DeviceCapabilities,
}

/// One opened node as seen by `scan_all`.
#[derive(Debug)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub probe: Result<DeviceCapabilities>,
}

pub struct DeviceScanner<'a> {
    root: PathBuf,
    opener: &'a dyn DeviceOpener,
}

pub fn node_path(root: &Path, index: usize) -> PathBuf {
    root.join(format!("event{index}"))
}

impl<'a> DeviceScanner<'a> {
    pub fn new(root: impl Into<PathBuf>, opener: &'a dyn DeviceOpener) -> Self {
        Self {
            root: root.into(),
            opener,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First node, in numeric order, that advertises multi-touch positioning.
    pub fn scan(&self) -> Result<ScanHit> {
        for index in 0..SCAN_NODE_COUNT {
            let path = node_path(&self.root, index);
            let device = match self.opener.open(&path) {
                Ok(device) => device,
                Err(err) => {
                    debug!("input: scan skip {}: {err}", path.display());
                    continue;
                }
            };
            match probe_capabilities(device.as_ref()) {
                Ok(capabilities) if capabilities.is_multi_touch() => {
                    info!(
                        "input: scan selected {} ({})",
                        path.display(),
                        capabilities.name
                    );
                    return Ok(ScanHit { path, capabilities });
                }
                Ok(capabilities) => {
                    debug!(
                        "input: scan skip {}: {} has no multi-touch axes",
                        path.display(),
                        capabilities.name
                    );
                }
                Err(err) => {
                    debug!("input: scan skip {}: {err}", path.display());
                }
            }
        }
        Err(InputError::NoDeviceFound {
            root: self.root.clone(),
        })
    }

    /// Every node that opened, with its probe outcome.
    pub fn scan_all(&self) -> Vec<ScanEntry> {
        (0..SCAN_NODE_COUNT)
            .filter_map(|index| {
                let path = node_path(&self.root, index);
                let device = self.opener.open(&path).ok()?;
                let probe = probe_capabilities(device.as_ref());
                Some(ScanEntry { path, probe })
            })
            .collect()
    }
}
