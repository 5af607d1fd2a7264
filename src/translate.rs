//! Raw data points to typed device state.
//!
//! Translation is all-or-nothing: if the payload has no `dps` object or any
//! data point the kind needs is missing or of the wrong shape, the previous
//! state is returned untouched. A transient misread never zeroes a value.

use crate::protocol::{
    DP_BULB_BRIGHTNESS, DP_BULB_COLOR_TEMP, DP_BULB_MODE, DP_BULB_SCENE, DP_BULB_SWITCH,
    DP_SWITCH, DeviceKind, Mode, RawStatus, Scene,
};
use serde_json::Value;

/// Typed state of a bulb.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BulbState {
    pub powered: bool,
    /// Percent, 0-100.
    pub brightness: f64,
    /// Percent, 0-100.
    pub color_temp: f64,
    pub mode: Mode,
    pub scene: Scene,
}

/// Last known state of a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceState {
    /// Outlets and simple lights.
    Switch { powered: bool },
    Bulb(BulbState),
}

impl DeviceState {
    /// State assumed before the first successful read.
    pub fn default_for(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Bulb => DeviceState::Bulb(BulbState::default()),
            DeviceKind::Outlet | DeviceKind::Light => DeviceState::Switch { powered: false },
        }
    }

    pub fn powered(&self) -> bool {
        match self {
            DeviceState::Switch { powered } => *powered,
            DeviceState::Bulb(bulb) => bulb.powered,
        }
    }

    pub fn set_powered(&mut self, on: bool) {
        match self {
            DeviceState::Switch { powered } => *powered = on,
            DeviceState::Bulb(bulb) => bulb.powered = on,
        }
    }

    pub fn as_bulb(&self) -> Option<&BulbState> {
        match self {
            DeviceState::Bulb(bulb) => Some(bulb),
            DeviceState::Switch { .. } => None,
        }
    }

    pub fn as_bulb_mut(&mut self) -> Option<&mut BulbState> {
        match self {
            DeviceState::Bulb(bulb) => Some(bulb),
            DeviceState::Switch { .. } => None,
        }
    }
}

/// Scales a raw 0-1000 reading to percent: `max(0, round(raw / 10, 4))`.
pub fn scale(raw: f64) -> f64 {
    let scaled = (raw / 10.0 * 10_000.0).round() / 10_000.0;
    scaled.max(0.0)
}

/// Maps a raw status onto a typed state for the given device kind.
pub fn translate(kind: DeviceKind, raw: &RawStatus, previous: &DeviceState) -> DeviceState {
    try_translate(kind, raw).unwrap_or(*previous)
}

/// Like [`translate`], but `None` when the payload is not usable.
pub fn try_translate(kind: DeviceKind, raw: &RawStatus) -> Option<DeviceState> {
    match kind {
        DeviceKind::Bulb => translate_bulb(raw).map(DeviceState::Bulb),
        DeviceKind::Outlet | DeviceKind::Light => raw
            .dp(DP_SWITCH)
            .and_then(truthy)
            .map(|powered| DeviceState::Switch { powered }),
    }
}

fn translate_bulb(raw: &RawStatus) -> Option<BulbState> {
    let powered = truthy(raw.dp(DP_BULB_SWITCH)?)?;
    let brightness = scale(raw.dp(DP_BULB_BRIGHTNESS)?.as_f64()?);
    let color_temp = scale(raw.dp(DP_BULB_COLOR_TEMP)?.as_f64()?);
    let mode = raw
        .dp(DP_BULB_MODE)?
        .as_str()
        .and_then(Mode::from_code)
        .unwrap_or(Mode::White);
    let scene = raw
        .dp(DP_BULB_SCENE)?
        .as_str()
        .and_then(Scene::from_code)
        .unwrap_or(Scene::Other);

    Some(BulbState {
        powered,
        brightness,
        color_temp,
        mode,
        scene,
    })
}

/// Boolean-like data point: booleans as-is, numbers by non-zero.
fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}
