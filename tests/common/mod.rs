//! Common test utilities: a scripted in-memory transport and device-list
//! fixtures.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tuyagate::discovery::DeviceSpec;
use tuyagate::{Command, Connector, DeviceClient, DeviceKind, GatewayError, RawStatus, Result, Version};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scripted device behind a [`MockConnector`].
#[derive(Default)]
pub struct MockDevice {
    status: Mutex<Option<Value>>,
    sent: Mutex<Vec<Command>>,
    status_calls: AtomicUsize,
    offline: AtomicBool,
}

impl MockDevice {
    /// Next status reads return this payload.
    pub fn set_status(&self, payload: Value) {
        *self.status.lock() = Some(payload);
    }

    pub fn set_dps(&self, dps: Value) {
        self.set_status(json!({ "dps": dps }));
    }

    /// While offline every read and write fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

struct MockClient {
    device: Arc<MockDevice>,
}

#[async_trait]
impl DeviceClient for MockClient {
    async fn status(&self) -> Result<RawStatus> {
        self.device.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.device.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Offline);
        }
        match self.device.status.lock().clone() {
            Some(payload) => Ok(RawStatus::new(payload)),
            None => Err(GatewayError::Timeout),
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        if self.device.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::ConnectionFailed);
        }
        self.device.sent.lock().push(command);
        Ok(())
    }
}

/// Connector handing out [`MockDevice`]s by id.
#[derive(Default)]
pub struct MockConnector {
    devices: Mutex<HashMap<String, Arc<MockDevice>>>,
    connects: AtomicUsize,
    refuse: AtomicBool,
    kinds: Mutex<Vec<DeviceKind>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The device behind `id`, created on first use.
    pub fn device(&self, id: &str) -> Arc<MockDevice> {
        self.devices.lock().entry(id.to_string()).or_default().clone()
    }

    /// While refusing, `connect` fails with `ConnectionFailed`.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Kinds seen by `connect`, in call order.
    pub fn connected_kinds(&self) -> Vec<DeviceKind> {
        self.kinds.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, spec: &DeviceSpec, _version: Version) -> Result<Box<dyn DeviceClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(GatewayError::ConnectionFailed);
        }
        self.kinds.lock().push(spec.kind);
        Ok(Box::new(MockClient {
            device: self.device(&spec.id),
        }))
    }
}

pub fn spec(id: &str, kind: DeviceKind) -> DeviceSpec {
    DeviceSpec {
        id: id.to_string(),
        name: format!("Test {}", id),
        kind,
        ip: "192.168.1.50".to_string(),
        key: "0123456789abcdef".to_string(),
        version: "3.3".to_string(),
    }
}

/// Bulb data points as a device would report them.
pub fn bulb_dps(on: bool, brightness: i64, temp: i64, mode: &str, scene: &str) -> Value {
    json!({
        "20": on,
        "21": mode,
        "22": brightness,
        "23": temp,
        "25": scene,
    })
}

/// Writes a YAML device list with one entry per `(id, type)`.
pub fn write_device_list(dir: &Path, entries: &[(&str, &str)]) -> PathBuf {
    let mut text = String::from("devices:\n");
    for (i, (id, kind)) in entries.iter().enumerate() {
        text.push_str(&format!(
            "  - name: Device {i}\n    id: {id}\n    type: {kind}\n    ip: 10.0.0.{ip}\n    key: key{i}\n    ver: \"3.3\"\n",
            ip = i + 2
        ));
    }
    let path = dir.join("devices.yaml");
    std::fs::write(&path, text).unwrap();
    path
}
