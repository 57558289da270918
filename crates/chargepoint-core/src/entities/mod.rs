//! Host-facing entities.
//!
//! Sensors project the coordinator's latest update into display values.
//! They keep no state between updates, so an entity is unavailable exactly
//! when its value is missing from the current update.

pub mod device;
pub mod sensor;

pub use device::DeviceInfo;
pub use sensor::{
    build_sensors, DeviceClass, Sensor, SensorMeta, SensorState, SensorValue, StateClass,
    ACCOUNT_SENSORS, CHARGER_SENSORS,
};
