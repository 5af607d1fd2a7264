//! Error types and result definitions for the tuyagate crate.
//! Includes Tuya-style error codes and conversion from standard IO/JSON/YAML errors.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`GatewayError`], deciding who handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Device unreachable, timed out or answered garbage. Recovered at the node.
    Transport,
    /// Device list missing, unreadable or malformed. Fails a discovery run.
    Config,
    /// A discovery run is already active.
    Conflict,
    /// Caller bug such as an invalid catalog index. Always propagated.
    Programming,
    /// Unknown device address.
    Lookup,
}

/// Represents all possible errors raised by the gateway.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Standard IO error (network, file access, etc.)
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(String),

    /// TCP connection could not be established
    #[error("Socket connection failed")]
    ConnectionFailed,

    /// Request timed out
    #[error("Timeout waiting for device")]
    Timeout,

    /// Device is currently unreachable or disconnected
    #[error("Device offline")]
    Offline,

    /// The payload received from the device was malformed or unexpected
    #[error("Invalid payload")]
    InvalidPayload,

    /// Protocol version string not understood
    #[error("Unsupported protocol version '{0}'")]
    UnsupportedVersion(String),

    /// Device list could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device list parsed but has no top-level `devices` collection
    #[error("Device list {0} is missing devices section")]
    MissingDevices(PathBuf),

    /// Discovery was requested while another run is active
    #[error("Discovery is still in progress")]
    DiscoveryInProgress,

    /// Mode index outside the 1-based mode catalog
    #[error("Invalid mode index {0}")]
    InvalidModeIndex(u8),

    /// Scene index outside the scene catalog
    #[error("Invalid scene index {0}")]
    InvalidSceneIndex(u8),

    /// Command not available for this kind of device
    #[error("Device '{id}' does not support {command}")]
    Unsupported { id: String, command: &'static str },

    /// Device ID not found in the registry
    #[error("Device ID '{0}' not found")]
    DeviceNotFound(String),
}

/// A specialized Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        GatewayError::Yaml(err.to_string())
    }
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Io(_)
            | GatewayError::Json(_)
            | GatewayError::ConnectionFailed
            | GatewayError::Timeout
            | GatewayError::Offline
            | GatewayError::InvalidPayload
            | GatewayError::UnsupportedVersion(_) => ErrorKind::Transport,
            GatewayError::Yaml(_) | GatewayError::Config(_) | GatewayError::MissingDevices(_) => {
                ErrorKind::Config
            }
            GatewayError::DiscoveryInProgress => ErrorKind::Conflict,
            GatewayError::InvalidModeIndex(_)
            | GatewayError::InvalidSceneIndex(_)
            | GatewayError::Unsupported { .. } => ErrorKind::Programming,
            GatewayError::DeviceNotFound(_) => ErrorKind::Lookup,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    pub fn code(&self) -> u32 {
        match self {
            GatewayError::Io(_) => ERR_CONNECT,
            GatewayError::Json(_) => ERR_JSON,
            GatewayError::Yaml(_) => ERR_CONFIG,
            GatewayError::ConnectionFailed => ERR_CONNECT,
            GatewayError::Timeout => ERR_TIMEOUT,
            GatewayError::Offline => ERR_OFFLINE,
            GatewayError::InvalidPayload => ERR_PAYLOAD,
            GatewayError::UnsupportedVersion(_) => ERR_KEY_OR_VER,
            GatewayError::Config(_) => ERR_CONFIG,
            GatewayError::MissingDevices(_) => ERR_CONFIG,
            GatewayError::DiscoveryInProgress => ERR_BUSY,
            GatewayError::InvalidModeIndex(_) => ERR_RANGE,
            GatewayError::InvalidSceneIndex(_) => ERR_RANGE,
            GatewayError::Unsupported { .. } => ERR_FUNCTION,
            GatewayError::DeviceNotFound(_) => ERR_NOT_FOUND,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            ERR_JSON => GatewayError::Json("Generic JSON error".to_string()),
            ERR_CONNECT => GatewayError::ConnectionFailed,
            ERR_TIMEOUT => GatewayError::Timeout,
            ERR_OFFLINE => GatewayError::Offline,
            ERR_PAYLOAD => GatewayError::InvalidPayload,
            ERR_KEY_OR_VER => GatewayError::UnsupportedVersion("Unknown".to_string()),
            ERR_CONFIG => GatewayError::Config(get_error_message(code).to_string()),
            ERR_BUSY => GatewayError::DiscoveryInProgress,
            ERR_NOT_FOUND => GatewayError::DeviceNotFound("Unknown ID".to_string()),
            _ => GatewayError::Io(format!("Unknown error code: {}", code)),
        }
    }
}

// TinyTuya-compatible codes, extended with gateway-level ones from 920
define_error_codes! {
    ERR_SUCCESS = 0 => "Connection Successful",
    ERR_JSON = 900 => "Invalid JSON Response from Device",
    ERR_CONNECT = 901 => "Network Error: Unable to Connect",
    ERR_TIMEOUT = 902 => "Timeout Waiting for Device",
    ERR_RANGE = 903 => "Specified Value Out of Range",
    ERR_PAYLOAD = 904 => "Unexpected Payload from Device",
    ERR_OFFLINE = 905 => "Network Error: Device Unreachable",
    ERR_FUNCTION = 907 => "Function Not Supported by Device",
    ERR_KEY_OR_VER = 914 => "Check device key or version",
    ERR_CONFIG = 920 => "Invalid Device List",
    ERR_BUSY = 921 => "Discovery Already Running",
    ERR_NOT_FOUND = 922 => "Device ID Not Registered",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(GatewayError::Timeout.kind(), ErrorKind::Transport);
        assert_eq!(
            GatewayError::MissingDevices(PathBuf::from("devices.yaml")).kind(),
            ErrorKind::Config
        );
        assert_eq!(GatewayError::DiscoveryInProgress.kind(), ErrorKind::Conflict);
        assert_eq!(GatewayError::InvalidSceneIndex(42).kind(), ErrorKind::Programming);
        assert!(!GatewayError::InvalidModeIndex(0).is_transport());
    }

    #[test]
    fn test_code_round_trip_for_transport_errors() {
        for err in [
            GatewayError::ConnectionFailed,
            GatewayError::Timeout,
            GatewayError::Offline,
            GatewayError::InvalidPayload,
        ] {
            assert_eq!(GatewayError::from_code(err.code()).code(), err.code());
        }
        assert_eq!(get_error_message(ERR_BUSY), "Discovery Already Running");
        assert_eq!(get_error_message(12345), "Unknown Error");
        assert_eq!(ERR_SUCCESS, 0);
    }
}
