//! Tuya data-point vocabulary shared by the translator, nodes and transport.
//! Device kinds, data-point ids, protocol versions and the bulb catalogs.

use crate::error::{GatewayError, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Outlet / simple light power switch.
pub const DP_SWITCH: u32 = 1;
/// Bulb power switch.
pub const DP_BULB_SWITCH: u32 = 20;
/// Bulb work mode (`white`, `colour`, `scene`, `music`).
pub const DP_BULB_MODE: u32 = 21;
/// Bulb brightness, raw 0-1000.
pub const DP_BULB_BRIGHTNESS: u32 = 22;
/// Bulb colour temperature, raw 0-1000.
pub const DP_BULB_COLOR_TEMP: u32 = 23;
/// Bulb scene code.
pub const DP_BULB_SCENE: u32 = 25;

const KEY_DPS: &str = "dps";

define_version! {
    V3_1 = ("3.1", 3.1),
    V3_2 = ("3.2", 3.2),
    V3_3 = ("3.3", 3.3),
    V3_4 = ("3.4", 3.4),
    V3_5 = ("3.5", 3.5),
}

define_catalog! {
    /// Bulb work mode, reported 1-based.
    Mode {
        White = ("white", 1),
        Colour = ("colour", 2),
        Scene = ("scene", 3),
        Music = ("music", 4),
    }
}

define_catalog! {
    /// Built-in bulb scenes. `None` and `Other` are placeholders that are
    /// never written to a device.
    Scene {
        None = ("", 0),
        Night = ("000e0d0000000000000000c80000", 1),
        Read = ("010e0d0000000000000003e801f4", 2),
        Working = ("020e0d0000000000000003e803e8", 3),
        Leisure = ("030e0d0000000000000001f401f4", 4),
        Soft = ("04464602007803e803e800000000464602007803e8000a00000000", 5),
        Colorful = ("05464601000003e803e800000000464601007803e803e80000000046460100f003e803e800000000464601003d03e803e80000000046460100ae03e803e800000000464601011303e803e800000000", 6),
        Dazzling = ("06464601000003e803e800000000464601007803e803e80000000046460100f003e803e800000000", 7),
        Gorgeous = ("07464602000003e803e800000000464602007803e803e80000000046460200f003e803e800000000464602003d03e803e80000000046460200ae03e803e800000000464602011303e803e800000000", 8),
        Other = ("0", 9),
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::White
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::None
    }
}

impl Scene {
    /// Placeholder entries carry no lighting program and are not transmitted.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Scene::None | Scene::Other)
    }
}

/// The closed set of device kinds the gateway manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Bulb,
    Outlet,
    Light,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Bulb => "bulb",
            DeviceKind::Outlet => "outlet",
            DeviceKind::Light => "light",
        }
    }

    /// Data point that switches this kind of device on and off.
    pub fn power_dp(&self) -> u32 {
        match self {
            DeviceKind::Bulb => DP_BULB_SWITCH,
            DeviceKind::Outlet | DeviceKind::Light => DP_SWITCH,
        }
    }

    /// Host node definition id for this kind.
    pub fn node_def(&self) -> &'static str {
        match self {
            DeviceKind::Bulb => "tuyabulb",
            DeviceKind::Outlet => "tuyaoutlet",
            DeviceKind::Light => "tuyalight",
        }
    }
}

impl FromStr for DeviceKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bulb" => Ok(DeviceKind::Bulb),
            "outlet" => Ok(DeviceKind::Outlet),
            "light" => Ok(DeviceKind::Light),
            other => Err(GatewayError::Config(format!("Unknown type: {}", other))),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status payload as returned by a device, e.g. `{"devId": "...", "dps": {"1": true}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatus {
    payload: Value,
}

impl RawStatus {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Builds a status from a bare data-point map.
    pub fn from_dps(dps: Map<String, Value>) -> Self {
        Self::new(serde_json::json!({ KEY_DPS: Value::Object(dps) }))
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The `dps` object, if the payload carries one.
    pub fn dps(&self) -> Option<&Map<String, Value>> {
        self.payload.get(KEY_DPS).and_then(Value::as_object)
    }

    /// A single data point by numeric id.
    pub fn dp(&self, id: u32) -> Option<&Value> {
        self.dps().and_then(|dps| dps.get(&id.to_string()))
    }
}

/// A write request for the transport: set one data point to a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub dp: u32,
    pub value: Value,
}

impl Command {
    pub fn set_value(dp: u32, value: impl Into<Value>) -> Self {
        Self {
            dp,
            value: value.into(),
        }
    }

    pub fn power(kind: DeviceKind, on: bool) -> Self {
        Self::set_value(kind.power_dp(), on)
    }

    pub fn mode(mode: Mode) -> Self {
        Self::set_value(DP_BULB_MODE, mode.code())
    }

    pub fn scene(scene: Scene) -> Self {
        Self::set_value(DP_BULB_SCENE, scene.code())
    }

    /// The `{"<dp>": value}` object a transport puts on the wire.
    pub fn to_dps(&self) -> Value {
        serde_json::json!({ self.dp.to_string(): self.value.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_catalog_is_one_based() {
        assert_eq!(Mode::from_index(1), Some(Mode::White));
        assert_eq!(Mode::from_index(4), Some(Mode::Music));
        assert_eq!(Mode::from_index(0), None);
        assert_eq!(Mode::from_index(5), None);
        assert_eq!(Mode::from_code("colour"), Some(Mode::Colour));
        assert_eq!(Mode::ALL.len(), 4);
    }

    #[test]
    fn test_scene_catalog() {
        assert_eq!(Scene::ALL.len(), 10);
        assert_eq!(Scene::from_code(""), Some(Scene::None));
        assert_eq!(Scene::from_code("0"), Some(Scene::Other));
        assert_eq!(Scene::Other.index(), 9);
        assert_eq!(
            Scene::from_code("010e0d0000000000000003e801f4"),
            Some(Scene::Read)
        );
        assert!(Scene::None.is_placeholder());
        assert!(Scene::Other.is_placeholder());
        assert!(!Scene::Night.is_placeholder());
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!("3.3".parse::<Version>().unwrap(), Version::V3_3);
        assert_eq!(" 3.5 ".parse::<Version>().unwrap().val(), 3.5);
        assert!(matches!(
            "2.0".parse::<Version>(),
            Err(GatewayError::UnsupportedVersion(v)) if v == "2.0"
        ));
        assert_eq!(Version::V3_4.to_string(), "3.4");
    }

    #[test]
    fn test_device_kind_parsing() {
        assert_eq!("bulb".parse::<DeviceKind>().unwrap(), DeviceKind::Bulb);
        assert_eq!("Outlet".parse::<DeviceKind>().unwrap(), DeviceKind::Outlet);
        assert!("fan".parse::<DeviceKind>().is_err());
        assert_eq!(DeviceKind::Bulb.power_dp(), DP_BULB_SWITCH);
        assert_eq!(DeviceKind::Light.power_dp(), DP_SWITCH);
    }

    #[test]
    fn test_raw_status_access() {
        let raw = RawStatus::new(json!({"devId": "abc", "dps": {"1": true, "22": 500}}));
        assert_eq!(raw.dp(1), Some(&json!(true)));
        assert_eq!(raw.dp(22), Some(&json!(500)));
        assert_eq!(raw.dp(23), None);
        assert!(RawStatus::new(json!({"Err": "905"})).dps().is_none());
    }

    #[test]
    fn test_command_wire_shape() {
        assert_eq!(
            Command::power(DeviceKind::Bulb, true).to_dps(),
            json!({"20": true})
        );
        assert_eq!(Command::mode(Mode::Scene).to_dps(), json!({"21": "scene"}));
    }
}
