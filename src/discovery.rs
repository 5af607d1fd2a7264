//! Discovery: builds the device registry from a declarative device list.
//!
//! The device list is YAML (JSON works too) with a top-level `devices`
//! collection:
//!
//! ```yaml
//! devices:
//!   - name: Desk Lamp
//!     id: bf0123456789abcdef
//!     type: bulb
//!     ip: 192.168.1.40
//!     key: "0123456789abcdef"
//!     ver: "3.3"
//! ```
//!
//! Only one run may be active at a time; a second request is rejected
//! immediately rather than queued.

use crate::client::Connector;
use crate::error::{GatewayError, Result};
use crate::node::DeviceNode;
use crate::protocol::DeviceKind;
use crate::registry::Registry;
use crate::store::CustomDataStore;
use log::{debug, error, info, warn};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

/// Device ids are truncated to this many characters.
pub const ID_MAX_LEN: usize = 14;

const KEY_DEVICES: &str = "devices";

/// Static description of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub ip: String,
    pub key: String,
    /// Protocol version as written in the device list, e.g. "3.3".
    pub version: String,
}

/// One entry of the device list as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "scalar_string")]
    pub ip: String,
    #[serde(deserialize_with = "scalar_string")]
    pub key: String,
    /// Written unquoted (`ver: 3.3`) this arrives as a number.
    #[serde(deserialize_with = "scalar_string")]
    pub ver: String,
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!("expected a scalar, got {:?}", other))),
    }
}

impl DeviceRecord {
    /// Validated spec for this record. Fails on an unknown device type.
    pub fn to_spec(&self) -> Result<DeviceSpec> {
        Ok(DeviceSpec {
            id: self.id.chars().take(ID_MAX_LEN).collect(),
            name: self.name.clone(),
            kind: self.kind.parse()?,
            ip: self.ip.clone(),
            key: self.key.clone(),
            version: self.ver.clone(),
        })
    }
}

/// Parses a device list document.
pub fn parse_device_list(text: &str, source: &Path) -> Result<Vec<DeviceRecord>> {
    let doc: Value = serde_yaml::from_str(text).map_err(|e| {
        GatewayError::Config(format!("Failed to parse {} content: {}", source.display(), e))
    })?;

    let devices = doc
        .get(KEY_DEVICES)
        .filter(|v| !v.is_null())
        .ok_or_else(|| GatewayError::MissingDevices(source.to_path_buf()))?;

    serde_yaml::from_value(devices.clone()).map_err(|e| {
        GatewayError::Config(format!("Invalid devices in {}: {}", source.display(), e))
    })
}

/// Reads and parses a device list file.
pub fn load_device_list(path: &Path) -> Result<Vec<DeviceRecord>> {
    let text = fs::read_to_string(path).map_err(|e| {
        GatewayError::Config(format!("Failed to open {}: {}", path.display(), e))
    })?;
    parse_device_list(&text, path)
}

/// Discovery run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
}

/// Held for the duration of a discovery run; returns the engine to
/// [`RunState::Idle`] when dropped.
#[derive(Debug)]
pub struct RunGuard {
    state: Arc<AtomicU8>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.store(RunState::Idle as u8, Ordering::SeqCst);
    }
}

/// A node registered by a discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedNode {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
}

/// Result of a successful discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub added: Vec<AddedNode>,
    /// Devices found by this process so far.
    pub devices_found: u32,
    /// Count persisted by a previous run, if any.
    pub previous: Option<u32>,
    /// `devices_found` differs from `previous`.
    pub drifted: bool,
}

pub struct DiscoveryEngine {
    devlist: Option<PathBuf>,
    connector: Arc<dyn Connector>,
    store: Arc<CustomDataStore>,
    state: Arc<AtomicU8>,
    devices_found: AtomicU32,
}

impl DiscoveryEngine {
    pub fn new(
        devlist: Option<PathBuf>,
        connector: Arc<dyn Connector>,
        store: Arc<CustomDataStore>,
    ) -> Self {
        Self {
            devlist,
            connector,
            store,
            state: Arc::new(AtomicU8::new(RunState::Idle as u8)),
            devices_found: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> RunState {
        if self.state.load(Ordering::SeqCst) == RunState::Running as u8 {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    pub fn in_progress(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn devices_found(&self) -> u32 {
        self.devices_found.load(Ordering::SeqCst)
    }

    /// Claims the single discovery slot.
    pub fn try_begin(&self) -> Result<RunGuard> {
        match self.state.compare_exchange(
            RunState::Idle as u8,
            RunState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => Ok(RunGuard {
                state: self.state.clone(),
            }),
            Err(_) => {
                info!("Discovery is still in progress");
                Err(GatewayError::DiscoveryInProgress)
            }
        }
    }

    /// Runs one discovery pass while holding `guard`.
    ///
    /// `update_nodes` is only carried through to the log; the caller turns
    /// the returned additions into host notifications.
    pub async fn run(
        &self,
        guard: RunGuard,
        registry: &Registry,
        update_nodes: bool,
    ) -> Result<DiscoveryOutcome> {
        info!("Starting TUYA Discovery...");
        let previous = self.store.devices_found();

        let added = match &self.devlist {
            Some(path) => {
                info!("Attempting manual discovery...");
                match self.manual_discovery(path, registry, update_nodes).await {
                    Ok(added) => {
                        info!("Manual discovery is complete");
                        added
                    }
                    Err(e) => {
                        error!("Manual discovery failed: (Error {}) {}", e.code(), e);
                        return Err(e);
                    }
                }
            }
            None => {
                debug!("No device list configured, nothing to discover");
                Vec::new()
            }
        };

        let devices_found = self.devices_found();
        let drifted = previous.is_some_and(|p| p != devices_found);
        if let Some(previous) = previous
            && drifted
        {
            info!(
                "NOTICE: Device count {} is different, was {} previously",
                devices_found, previous
            );
        }
        if let Err(e) = self.store.set_devices_found(devices_found) {
            warn!("Failed to persist device count: {}", e);
        }

        drop(guard);
        info!("TUYA Discovery is complete.");
        Ok(DiscoveryOutcome {
            added,
            devices_found,
            previous,
            drifted,
        })
    }

    async fn manual_discovery(
        &self,
        path: &Path,
        registry: &Registry,
        update_nodes: bool,
    ) -> Result<Vec<AddedNode>> {
        // Read and parse everything up front; the registry is only touched
        // once the whole document is known to be usable.
        let records = load_device_list(path)?;

        let mut added = Vec::new();
        for record in &records {
            let spec = match record.to_spec() {
                Ok(spec) => spec,
                Err(e) => {
                    error!("{} ({})", e, record.name);
                    continue;
                }
            };

            let entry = AddedNode {
                id: spec.id.clone(),
                name: spec.name.clone(),
                kind: spec.kind,
            };
            let connector = self.connector.clone();
            if registry
                .add_if_absent(&entry.id, move || DeviceNode::new(spec, connector))
                .await
            {
                self.devices_found.fetch_add(1, Ordering::SeqCst);
                info!(
                    "Found {}: {} ({}){}",
                    entry.kind,
                    entry.name,
                    entry.id,
                    if update_nodes { " [update]" } else { "" }
                );
                added.push(entry);
            }
        }
        Ok(added)
    }
}
