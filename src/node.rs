//! One managed device: lazy client, last-known state and command handlers.
//!
//! Every transport-facing call is contained here. A device that is offline,
//! slow or answering garbage is logged with its identity and the node falls
//! back to its cached state, so callers iterating many nodes never abort.
//!
//! Commands update the cache optimistically once the transport acknowledged
//! the write, without a confirming read. The next short poll corrects any
//! divergence.

use crate::client::{Connector, DeviceClient};
use crate::discovery::DeviceSpec;
use crate::error::{GatewayError, Result};
use crate::protocol::{Command, DeviceKind, Mode, Scene, Version};
use crate::report::{DriverValue, device_drivers};
use crate::translate::{DeviceState, try_translate};
use log::{debug, error, warn};
use std::sync::Arc;
use std::time::Instant;

/// Commands a host can address to a device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCommand {
    TurnOn,
    TurnOff,
    /// 1-based index into the mode catalog.
    SetMode(u8),
    /// Index into the scene catalog.
    SetScene(u8),
}

impl NodeCommand {
    pub fn name(&self) -> &'static str {
        match self {
            NodeCommand::TurnOn => "DON",
            NodeCommand::TurnOff => "DOF",
            NodeCommand::SetMode(_) => "SET_MODE",
            NodeCommand::SetScene(_) => "SET_SCENE",
        }
    }
}

pub struct DeviceNode {
    spec: DeviceSpec,
    connector: Arc<dyn Connector>,
    client: Option<Box<dyn DeviceClient>>,
    cached: Option<DeviceState>,
    last_update: Instant,
}

impl DeviceNode {
    pub fn new(spec: DeviceSpec, connector: Arc<dyn Connector>) -> Self {
        Self {
            spec,
            connector,
            client: None,
            cached: None,
            last_update: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.spec.kind
    }

    pub fn spec(&self) -> &DeviceSpec {
        &self.spec
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    /// Last observed or asserted state, `None` before the first one.
    pub fn cached(&self) -> Option<DeviceState> {
        self.cached
    }

    /// Cached state, or the kind default if nothing is known yet.
    pub fn state(&self) -> DeviceState {
        self.cached.unwrap_or_else(|| DeviceState::default_for(self.spec.kind))
    }

    /// Driver values for the current cache. Never performs I/O.
    pub fn report(&self) -> Vec<DriverValue> {
        device_drivers(&self.state())
    }

    fn label(&self) -> String {
        format!("{} ({}) - {}", self.spec.name, self.spec.kind, self.spec.id)
    }

    // -------------------------------------------------------------------------
    // Connection
    // -------------------------------------------------------------------------

    /// Returns the client, connecting first if there is none yet.
    ///
    /// A failed connection yields `None`; the next call tries again.
    pub async fn acquire_client(&mut self) -> Option<&dyn DeviceClient> {
        if self.client.is_none() {
            self.client = self.connect().await;
        }
        self.client.as_deref()
    }

    async fn connect(&self) -> Option<Box<dyn DeviceClient>> {
        let version = match self.spec.version.parse::<Version>() {
            Ok(v) => v,
            Err(e) => {
                error!("Error on {} device. {}", self.label(), e);
                return None;
            }
        };

        match self.connector.connect(&self.spec, version).await {
            Ok(client) => {
                debug!("Connected client for {} (v{})", self.label(), version);
                Some(client)
            }
            Err(e) => {
                error!("Error on {} device. (Error {}) {}", self.label(), e.code(), e);
                None
            }
        }
    }

    // -------------------------------------------------------------------------
    // Polling
    // -------------------------------------------------------------------------

    /// Reads the device and refreshes the cache. Never fails: on any error
    /// the previous state is kept and returned.
    pub async fn refresh(&mut self) -> DeviceState {
        let label = self.label();
        let kind = self.spec.kind;
        let previous = self.state();

        let Some(client) = self.acquire_client().await else {
            debug!("No client for {}, keeping cached state", label);
            return previous;
        };

        let result = client.status().await;
        match result {
            Ok(raw) => match try_translate(kind, &raw) {
                Some(state) => {
                    self.cached = Some(state);
                    self.last_update = Instant::now();
                    state
                }
                None => {
                    if raw.dps().is_none() {
                        warn!("Error on {}. DPS: {}. Missing dps", label, raw.payload());
                    } else {
                        warn!("Error on {}. DPS: {}. Incomplete dps", label, raw.payload());
                    }
                    previous
                }
            },
            Err(e) => {
                error!("Error on {}. Error {}", label, e);
                previous
            }
        }
    }

    /// Long-cycle housekeeping. Only timestamps for now.
    pub fn heartbeat(&mut self) {
        self.last_update = Instant::now();
    }

    /// Refresh plus heartbeat, as the host's QUERY command expects.
    pub async fn query(&mut self) -> DeviceState {
        let state = self.refresh().await;
        self.heartbeat();
        state
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Applies a host command.
    ///
    /// Returns `Ok(Some(state))` with the asserted state when the cache was
    /// updated and `Ok(None)` when the write did not go through (logged).
    /// Invalid catalog indexes and commands the kind does not support are
    /// returned as errors.
    pub async fn apply(&mut self, command: NodeCommand) -> Result<Option<DeviceState>> {
        match command {
            NodeCommand::TurnOn => Ok(self.set_power(true).await),
            NodeCommand::TurnOff => Ok(self.set_power(false).await),
            NodeCommand::SetMode(index) => self.set_mode(index).await,
            NodeCommand::SetScene(index) => self.set_scene(index).await,
        }
    }

    async fn set_power(&mut self, on: bool) -> Option<DeviceState> {
        let what = if on { "On" } else { "Off" };
        if !self.transmit(Command::power(self.spec.kind, on), what).await {
            return None;
        }
        Some(self.assert_state(|s| s.set_powered(on)))
    }

    async fn set_mode(&mut self, index: u8) -> Result<Option<DeviceState>> {
        self.require_bulb(NodeCommand::SetMode(index))?;
        let mode = Mode::from_index(index).ok_or(GatewayError::InvalidModeIndex(index))?;

        let what = format!("Mode: {} - {}", index, mode.code());
        if !self.transmit(Command::mode(mode), &what).await {
            return Ok(None);
        }
        Ok(Some(self.assert_state(|s| {
            if let Some(bulb) = s.as_bulb_mut() {
                bulb.mode = mode;
            }
        })))
    }

    async fn set_scene(&mut self, index: u8) -> Result<Option<DeviceState>> {
        self.require_bulb(NodeCommand::SetScene(index))?;
        let scene = Scene::from_index(index).ok_or(GatewayError::InvalidSceneIndex(index))?;

        if scene.is_placeholder() {
            debug!("Scene {:?} on {} is a placeholder, not sent", scene, self.label());
        } else {
            let what = format!("Scene: {} - {:?}", index, scene);
            if !self.transmit(Command::scene(scene), &what).await {
                return Ok(None);
            }
        }
        Ok(Some(self.assert_state(|s| {
            if let Some(bulb) = s.as_bulb_mut() {
                bulb.scene = scene;
            }
        })))
    }

    fn require_bulb(&self, command: NodeCommand) -> Result<()> {
        if self.spec.kind == DeviceKind::Bulb {
            Ok(())
        } else {
            Err(GatewayError::Unsupported {
                id: self.spec.id.clone(),
                command: command.name(),
            })
        }
    }

    /// Sends a write; `true` once the device acknowledged it.
    async fn transmit(&mut self, command: Command, what: &str) -> bool {
        let label = self.label();
        let Some(client) = self.acquire_client().await else {
            warn!("Setting {} {} skipped: no connection", label, what);
            return false;
        };

        let result = client.send(command).await;
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Setting {} {}. Error: {}", label, what, e);
                false
            }
        }
    }

    fn assert_state(&mut self, update: impl FnOnce(&mut DeviceState)) -> DeviceState {
        let mut state = self.state();
        update(&mut state);
        self.cached = Some(state);
        state
    }
}

impl std::fmt::Debug for DeviceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceNode")
            .field("spec", &self.spec)
            .field("connected", &self.client.is_some())
            .field("cached", &self.cached)
            .finish()
    }
}
