//! Outbound driver values and events published to the host.

use crate::protocol::DeviceKind;
use crate::translate::DeviceState;

/// Address the host uses for the gateway itself.
pub const CONTROLLER_ADDRESS: &str = "controller";

/// Unit-of-measure ids understood by the host.
pub const UOM_BOOLEAN: u16 = 2;
pub const UOM_INDEX: u16 = 25;
pub const UOM_PERCENT: u16 = 51;
pub const UOM_RAW: u16 = 56;
pub const UOM_ON_OFF: u16 = 78;

/// Driver slots exposed per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    /// Status: power (devices) or running flag (controller).
    St,
    /// Bulb brightness.
    Brt,
    /// Bulb colour temperature.
    Lumin,
    /// Bulb mode, or device count on the controller.
    Gv0,
    /// Bulb scene.
    Gv1,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::St => "ST",
            Driver::Brt => "BRT",
            Driver::Lumin => "LUMIN",
            Driver::Gv0 => "GV0",
            Driver::Gv1 => "GV1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverValue {
    pub driver: Driver,
    pub value: f64,
    pub uom: u16,
}

impl DriverValue {
    pub fn new(driver: Driver, value: f64, uom: u16) -> Self {
        Self { driver, value, uom }
    }
}

/// Events published to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Current driver values of a node.
    Drivers {
        address: String,
        values: Vec<DriverValue>,
    },
    /// Discovery registered a node. `update` asks the host to refresh its
    /// definition because the profile version changed.
    NodeAdded {
        address: String,
        name: String,
        kind: DeviceKind,
        /// Host node definition id, e.g. `tuyabulb`.
        node_def: &'static str,
        update: bool,
    },
    /// The profile version marker changed since the last run.
    ControllerUpdated { profile_version: String },
}

/// Driver values for a device state. Power is reported as 0/100.
pub fn device_drivers(state: &DeviceState) -> Vec<DriverValue> {
    let st = DriverValue::new(
        Driver::St,
        if state.powered() { 100.0 } else { 0.0 },
        UOM_ON_OFF,
    );
    match state {
        DeviceState::Switch { .. } => vec![st],
        DeviceState::Bulb(bulb) => vec![
            st,
            DriverValue::new(Driver::Brt, bulb.brightness, UOM_PERCENT),
            DriverValue::new(Driver::Lumin, bulb.color_temp, UOM_PERCENT),
            DriverValue::new(Driver::Gv0, f64::from(bulb.mode.index()), UOM_INDEX),
            DriverValue::new(Driver::Gv1, f64::from(bulb.scene.index()), UOM_INDEX),
        ],
    }
}

/// Driver values for the controller node.
pub fn controller_drivers(devices_found: u32) -> Vec<DriverValue> {
    vec![
        DriverValue::new(Driver::St, 1.0, UOM_BOOLEAN),
        DriverValue::new(Driver::Gv0, f64::from(devices_found), UOM_RAW),
    ]
}
