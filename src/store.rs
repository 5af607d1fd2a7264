//! Small persisted record the gateway carries across restarts: the profile
//! version marker and the last reported device count.

use crate::error::Result;
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prof_ver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices_found: Option<u32>,
}

/// Custom data kept in memory and, when a path is set, mirrored to a JSON file
/// on every change.
#[derive(Debug)]
pub struct CustomDataStore {
    path: Option<PathBuf>,
    data: Mutex<CustomData>,
}

impl Default for CustomDataStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl CustomDataStore {
    pub fn in_memory() -> Self {
        Self::with_data(CustomData::default())
    }

    /// In-memory store seeded with existing data.
    pub fn with_data(data: CustomData) -> Self {
        Self {
            path: None,
            data: Mutex::new(data),
        }
    }

    /// Opens a file-backed store. A missing file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.is_file() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                CustomData::default()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            debug!("No custom data at {}, starting empty", path.display());
            CustomData::default()
        };
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    pub fn get(&self) -> CustomData {
        self.data.lock().clone()
    }

    pub fn profile_version(&self) -> Option<String> {
        self.data.lock().prof_ver.clone()
    }

    pub fn devices_found(&self) -> Option<u32> {
        self.data.lock().devices_found
    }

    pub fn set_profile_version(&self, version: &str) -> Result<()> {
        self.update(|d| d.prof_ver = Some(version.to_string()))
    }

    pub fn set_devices_found(&self, count: u32) -> Result<()> {
        self.update(|d| d.devices_found = Some(count))
    }

    fn update(&self, change: impl FnOnce(&mut CustomData)) -> Result<()> {
        let mut guard = self.data.lock();
        change(&mut guard);
        if let Some(path) = &self.path {
            fs::write(path, serde_json::to_vec_pretty(&*guard)?)?;
        }
        Ok(())
    }
}

/// Reads a profile version marker file, newlines stripped.
pub fn read_profile_version<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(fs::read_to_string(path)?.replace(['\r', '\n'], ""))
}
