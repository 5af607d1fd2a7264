//! Transport seam towards the Tuya LAN codec.
//!
//! The gateway never speaks the encrypted wire protocol itself. A host plugs
//! in a [`Connector`] that opens per-device [`DeviceClient`] handles; the
//! gateway only asks them for status and pushes data-point writes.

use crate::discovery::DeviceSpec;
use crate::error::Result;
use crate::protocol::{Command, RawStatus, Version};
use async_trait::async_trait;

/// An open connection to one device.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Reads the current data points.
    async fn status(&self) -> Result<RawStatus>;

    /// Writes one data point. Returns once the device acknowledged it.
    async fn send(&self, command: Command) -> Result<()>;
}

/// Factory for [`DeviceClient`]s, picking the kind-specific constructor.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, spec: &DeviceSpec, version: Version) -> Result<Box<dyn DeviceClient>>;
}
