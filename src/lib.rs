//! # tuyagate
//!
//! Gateway between a home-automation host and Tuya LAN devices (bulbs,
//! outlets, lights). Devices come from a declarative device list, are polled
//! on a short and a long cadence, and have their raw data points translated
//! into host driver values.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run(connector: std::sync::Arc<dyn tuyagate::Connector>) -> tuyagate::Result<()> {
//! use tuyagate::{Controller, GatewayConfig};
//!
//! let config = GatewayConfig::new().with_devlist("devices.yaml");
//! let controller = Controller::new(config, connector)?;
//! controller.start()?;
//! # Ok(())
//! # }
//! ```
//!
#[macro_use]
pub mod macros;
pub mod client;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod node;
pub mod protocol;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod translate;

pub use client::{Connector, DeviceClient};
pub use config::GatewayConfig;
pub use controller::{Controller, HostCommand, HostCommandKind};
pub use discovery::{DeviceSpec, DiscoveryEngine, DiscoveryOutcome, RunState};
pub use error::{GatewayError, Result};
pub use node::{DeviceNode, NodeCommand};
pub use protocol::{Command, DeviceKind, Mode, RawStatus, Scene, Version};
pub use report::{Driver, DriverValue, Report};
pub use scheduler::PollOutcome;
pub use translate::{BulbState, DeviceState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
