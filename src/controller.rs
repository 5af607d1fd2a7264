//! Top-level orchestrator: the only component the host runtime talks to.
//!
//! Owns the registry, the discovery engine and the poll scheduler, and
//! publishes every state change as a [`Report`] on a broadcast channel.

use crate::client::Connector;
use crate::config::GatewayConfig;
use crate::discovery::{DiscoveryEngine, DiscoveryOutcome, RunGuard};
use crate::error::{GatewayError, Result};
use crate::node::NodeCommand;
use crate::registry::{Registry, SharedNode};
use crate::report::{CONTROLLER_ADDRESS, Report, controller_drivers};
use crate::scheduler::{PollOutcome, PollingScheduler};
use crate::store::{CustomDataStore, read_profile_version};
use crate::translate::DeviceState;
use futures_core::Stream;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// What the host asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommandKind {
    Discover,
    TurnOn,
    TurnOff,
    Query,
    SetMode(u8),
    SetScene(u8),
}

impl HostCommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            HostCommandKind::Discover => "DISCOVER",
            HostCommandKind::TurnOn => "DON",
            HostCommandKind::TurnOff => "DOF",
            HostCommandKind::Query => "QUERY",
            HostCommandKind::SetMode(_) => "SET_MODE",
            HostCommandKind::SetScene(_) => "SET_SCENE",
        }
    }
}

/// A command relayed by the host, addressed to a device id or to
/// [`CONTROLLER_ADDRESS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub address: String,
    pub kind: HostCommandKind,
}

impl HostCommand {
    pub fn new<A: Into<String>>(address: A, kind: HostCommandKind) -> Self {
        Self {
            address: address.into(),
            kind,
        }
    }

    pub fn controller(kind: HostCommandKind) -> Self {
        Self::new(CONTROLLER_ADDRESS, kind)
    }
}

#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: GatewayConfig,
    registry: Arc<Registry>,
    discovery: Arc<DiscoveryEngine>,
    scheduler: PollingScheduler,
    store: Arc<CustomDataStore>,
    event_tx: broadcast::Sender<Report>,
    update_nodes: AtomicBool,
    cancel_token: CancellationToken,
}

impl Controller {
    /// Creates a controller, opening the custom data file named in `config`.
    pub fn new(config: GatewayConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let store = match &config.state_file {
            Some(path) => CustomDataStore::open(path)?,
            None => CustomDataStore::in_memory(),
        };
        Ok(Self::with_store(config, connector, store))
    }

    /// Creates a controller on top of an existing custom data store.
    pub fn with_store(
        config: GatewayConfig,
        connector: Arc<dyn Connector>,
        store: CustomDataStore,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let store = Arc::new(store);
        let registry = Arc::new(Registry::new());
        let discovery = Arc::new(DiscoveryEngine::new(
            config.devlist.clone(),
            connector,
            store.clone(),
        ));
        let scheduler = PollingScheduler::new(registry.clone(), discovery.clone(), event_tx.clone());

        Self {
            inner: Arc::new(ControllerInner {
                config,
                registry,
                discovery,
                scheduler,
                store,
                event_tx,
                update_nodes: AtomicBool::new(false),
                cancel_token: CancellationToken::new(),
            }),
        }
    }

    /// Returns a Stream of reports for the host.
    pub fn stream(&self) -> impl Stream<Item = Report> + Send + use<> {
        let mut rx = self.inner.event_tx.subscribe();
        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(report) => yield report,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Report> {
        self.inner.event_tx.subscribe()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn discovery(&self) -> &Arc<DiscoveryEngine> {
        &self.inner.discovery
    }

    pub fn store(&self) -> &Arc<CustomDataStore> {
        &self.inner.store
    }

    /// The controller's device-count driver value: the persisted count,
    /// which only a successful discovery run replaces.
    pub fn devices_found(&self) -> u32 {
        self.inner.store.devices_found().unwrap_or(0)
    }

    /// Whether nodes added by the next discovery should be force-updated.
    pub fn update_nodes(&self) -> bool {
        self.inner.update_nodes.load(Ordering::SeqCst)
    }

    fn publish(&self, report: Report) {
        let _ = self.inner.event_tx.send(report);
    }

    fn publish_controller(&self) {
        self.publish(Report::Drivers {
            address: CONTROLLER_ADDRESS.to_string(),
            values: controller_drivers(self.devices_found()),
        });
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Checks the profile marker, reports the controller and starts a
    /// background discovery run.
    pub fn start(&self) -> Result<()> {
        info!("Starting tuyagate version {}", crate::VERSION);
        self.check_profile();
        self.publish_controller();
        self.discover()?;
        debug!("Start complete");
        Ok(())
    }

    /// Stops the serve loop and its poll timers.
    pub fn stop(&self) {
        info!("Stopping tuyagate version {}", crate::VERSION);
        self.inner.cancel_token.cancel();
    }

    /// Compares the profile version file with the stored marker. On change
    /// (or when no marker is stored yet) flags nodes for update and persists
    /// the new marker. Returns whether it changed.
    pub fn check_profile(&self) -> bool {
        let Some(path) = &self.inner.config.profile_version_file else {
            return false;
        };
        if !path.is_file() {
            debug!("No profile version file at {}", path.display());
            return false;
        }

        let version = match read_profile_version(path) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return false;
            }
        };

        let stored = self.inner.store.profile_version();
        if stored.as_deref() == Some(version.as_str()) {
            return false;
        }

        info!(
            "New Profile Version detected: {}, all nodes will be updated",
            version
        );
        self.inner.update_nodes.store(true, Ordering::SeqCst);
        if let Err(e) = self.inner.store.set_profile_version(&version) {
            error!("Failed to persist profile version {}: {}", version, e);
        }
        self.publish(Report::ControllerUpdated {
            profile_version: version,
        });
        true
    }

    // -------------------------------------------------------------------------
    // Discovery & polling
    // -------------------------------------------------------------------------

    /// Starts a discovery run in the background.
    ///
    /// Fails with [`GatewayError::DiscoveryInProgress`] while another run is
    /// active; the request is not queued.
    pub fn discover(&self) -> Result<()> {
        let guard = self.inner.discovery.try_begin()?;
        let this = self.clone();
        tokio::spawn(async move {
            let _ = this.run_discovery(guard).await;
        });
        Ok(())
    }

    /// Runs discovery in the calling task and returns its outcome.
    pub async fn discover_and_wait(&self) -> Result<DiscoveryOutcome> {
        let guard = self.inner.discovery.try_begin()?;
        self.run_discovery(guard).await
    }

    async fn run_discovery(&self, guard: RunGuard) -> Result<DiscoveryOutcome> {
        let update = self.update_nodes();
        let result = self
            .inner
            .discovery
            .run(guard, &self.inner.registry, update)
            .await;

        if let Ok(outcome) = &result {
            for node in &outcome.added {
                self.publish(Report::NodeAdded {
                    address: node.id.clone(),
                    name: node.name.clone(),
                    kind: node.kind,
                    node_def: node.kind.node_def(),
                    update,
                });
            }
            self.inner.update_nodes.store(false, Ordering::SeqCst);
        }
        self.publish_controller();
        result
    }

    pub async fn short_poll(&self) -> PollOutcome {
        self.inner.scheduler.short_poll().await
    }

    pub async fn long_poll(&self) -> PollOutcome {
        self.inner.scheduler.long_poll().await
    }

    // -------------------------------------------------------------------------
    // Device commands
    // -------------------------------------------------------------------------

    async fn node(&self, id: &str) -> Result<SharedNode> {
        self.inner
            .registry
            .get(id)
            .await
            .ok_or_else(|| GatewayError::DeviceNotFound(id.to_string()))
    }

    pub async fn turn_on(&self, id: &str) -> Result<Option<DeviceState>> {
        self.command(id, NodeCommand::TurnOn).await
    }

    pub async fn turn_off(&self, id: &str) -> Result<Option<DeviceState>> {
        self.command(id, NodeCommand::TurnOff).await
    }

    pub async fn set_mode(&self, id: &str, index: u8) -> Result<Option<DeviceState>> {
        self.command(id, NodeCommand::SetMode(index)).await
    }

    pub async fn set_scene(&self, id: &str, index: u8) -> Result<Option<DeviceState>> {
        self.command(id, NodeCommand::SetScene(index)).await
    }

    /// Applies a command to one node and reports the asserted state.
    ///
    /// Transport failures come back as `Ok(None)`; only unknown ids and
    /// invalid arguments are errors.
    pub async fn command(&self, id: &str, command: NodeCommand) -> Result<Option<DeviceState>> {
        let node = self.node(id).await?;
        let mut node = node.lock().await;
        let state = node.apply(command).await?;
        if state.is_some() {
            self.publish(Report::Drivers {
                address: id.to_string(),
                values: node.report(),
            });
        }
        Ok(state)
    }

    /// Refreshes one node and reports all of its drivers.
    pub async fn query(&self, id: &str) -> Result<DeviceState> {
        let node = self.node(id).await?;
        let mut node = node.lock().await;
        let state = node.query().await;
        self.publish(Report::Drivers {
            address: id.to_string(),
            values: node.report(),
        });
        Ok(state)
    }

    /// Reports the controller drivers again.
    pub fn query_controller(&self) {
        self.publish_controller();
    }

    // -------------------------------------------------------------------------
    // Host command surface
    // -------------------------------------------------------------------------

    /// Dispatches one host command.
    pub async fn handle(&self, command: HostCommand) -> Result<()> {
        let HostCommand { address, kind } = command;

        if address == CONTROLLER_ADDRESS {
            return match kind {
                HostCommandKind::Discover => self.discover(),
                HostCommandKind::Query => {
                    self.query_controller();
                    Ok(())
                }
                _ => Err(GatewayError::Unsupported {
                    id: address,
                    command: kind.name(),
                }),
            };
        }

        match kind {
            HostCommandKind::Discover => Err(GatewayError::Unsupported {
                id: address,
                command: kind.name(),
            }),
            HostCommandKind::Query => self.query(&address).await.map(|_| ()),
            HostCommandKind::TurnOn => self.turn_on(&address).await.map(|_| ()),
            HostCommandKind::TurnOff => self.turn_off(&address).await.map(|_| ()),
            HostCommandKind::SetMode(i) => self.set_mode(&address, i).await.map(|_| ()),
            HostCommandKind::SetScene(i) => self.set_scene(&address, i).await.map(|_| ()),
        }
    }

    /// Serves host commands from `commands` while running the poll timers,
    /// until [`stop`](Self::stop) is called or the channel closes.
    pub async fn serve(&self, mut commands: mpsc::Receiver<HostCommand>) {
        let cancel = self.inner.cancel_token.clone();
        let poll_cancel = cancel.child_token();
        let scheduler = self.inner.scheduler.clone();
        let (short, long) = (
            self.inner.config.short_poll(),
            self.inner.config.long_poll(),
        );
        let poll_token = poll_cancel.clone();
        let poller = tokio::spawn(async move { scheduler.run(short, long, poll_token).await });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => {
                        let name = command.kind.name();
                        let address = command.address.clone();
                        if let Err(e) = self.handle(command).await {
                            error!("{} on {} failed: (Error {}) {}", name, address, e.code(), e);
                        }
                    }
                    None => {
                        info!("Command channel closed");
                        break;
                    }
                }
            }
        }

        poll_cancel.cancel();
        let _ = poller.await;
    }
}
