//! Gateway configuration.
//!
//! ```yaml
//! devlist: /etc/tuyagate/devices.yaml
//! profile_version_file: profile/version.txt
//! state_file: /var/lib/tuyagate/custom.json
//! short_poll_secs: 10
//! long_poll_secs: 30
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SHORT_POLL_SECS: u64 = 10;
const DEFAULT_LONG_POLL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Declarative device list. Without one, discovery finds nothing.
    pub devlist: Option<PathBuf>,
    /// File holding the profile version marker.
    pub profile_version_file: Option<PathBuf>,
    /// Where custom data is persisted. In memory when unset.
    pub state_file: Option<PathBuf>,
    pub short_poll_secs: u64,
    pub long_poll_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            devlist: None,
            profile_version_file: None,
            state_file: None,
            short_poll_secs: DEFAULT_SHORT_POLL_SECS,
            long_poll_secs: DEFAULT_LONG_POLL_SECS,
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a YAML (or JSON) configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Set the device list file.
    pub fn with_devlist<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.devlist = Some(path.into());
        self
    }

    /// Set the profile version marker file.
    pub fn with_profile_version_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.profile_version_file = Some(path.into());
        self
    }

    /// Set the custom data file.
    pub fn with_state_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// Set both poll cadences.
    pub fn with_poll_intervals(mut self, short: Duration, long: Duration) -> Self {
        self.short_poll_secs = short.as_secs().max(1);
        self.long_poll_secs = long.as_secs().max(1);
        self
    }

    pub fn short_poll(&self) -> Duration {
        Duration::from_secs(self.short_poll_secs.max(1))
    }

    pub fn long_poll(&self) -> Duration {
        Duration::from_secs(self.long_poll_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.short_poll(), Duration::from_secs(10));
        assert_eq!(config.long_poll(), Duration::from_secs(30));
        assert!(config.devlist.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = GatewayConfig::from_yaml_str("devlist: devices.yaml\nlong_poll_secs: 120\n")
            .unwrap();
        assert_eq!(config.devlist, Some(PathBuf::from("devices.yaml")));
        assert_eq!(config.short_poll_secs, 10);
        assert_eq!(config.long_poll(), Duration::from_secs(120));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");
        fs::write(&path, "state_file: custom.json\nshort_poll_secs: 5\n").unwrap();

        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.state_file, Some(PathBuf::from("custom.json")));
        assert_eq!(config.short_poll(), Duration::from_secs(5));
        assert!(GatewayConfig::from_yaml_str("short_poll_secs: [1]").is_err());
    }

    #[test]
    fn test_builder() {
        let config = GatewayConfig::new()
            .with_devlist("d.yaml")
            .with_profile_version_file("version.txt")
            .with_poll_intervals(Duration::from_secs(2), Duration::from_millis(10));
        assert_eq!(config.devlist, Some(PathBuf::from("d.yaml")));
        assert_eq!(config.short_poll_secs, 2);
        assert_eq!(config.long_poll_secs, 1);
    }
}
