use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::coordinator::{CoordinatorData, CoordinatorUpdate};
use crate::models::{AccountSnapshot, ChargerId, ChargerSnapshot};
use crate::utils::{humanize_status, round_to};

use super::DeviceInfo;

/// A sensor reading in host display form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Text(String),
    Float(f64),
    Integer(i64),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Text(s) => f.write_str(s),
            SensorValue::Float(v) => write!(f, "{}", v),
            SensorValue::Integer(v) => write!(f, "{}", v),
            SensorValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorState {
    Available {
        value: SensorValue,
        unit: Option<String>,
    },
    Unavailable,
}

impl SensorState {
    pub fn value(&self) -> Option<&SensorValue> {
        match self {
            SensorState::Available { value, .. } => Some(value),
            SensorState::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SensorState::Available { .. })
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorState::Available { value, unit: Some(unit) } => write!(f, "{} {}", value, unit),
            SensorState::Available { value, unit: None } => write!(f, "{}", value),
            SensorState::Unavailable => f.write_str("unavailable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Monetary,
    Timestamp,
    Power,
    Energy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    Total,
    TotalIncreasing,
}

/// Static presentation metadata shared by every sensor kind.
#[derive(Debug)]
pub struct SensorMeta {
    pub key: &'static str,
    /// Appended to the account or charger name
    pub name_suffix: &'static str,
    pub icon: &'static str,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub native_unit: Option<&'static str>,
}

pub struct AccountSensorDescription {
    pub meta: SensorMeta,
    pub value: fn(&AccountSnapshot) -> Option<SensorValue>,
    /// Overrides `meta.native_unit` when set
    pub unit: Option<fn(&AccountSnapshot) -> Option<String>>,
}

pub struct ChargerSensorDescription {
    pub meta: SensorMeta,
    pub value: fn(&ChargerSnapshot, &AccountSnapshot) -> Option<SensorValue>,
    pub unit: Option<fn(&ChargerSnapshot, &AccountSnapshot) -> Option<String>>,
}

// ============================================================================
// Projections
// ============================================================================

fn text(s: impl Into<String>) -> Option<SensorValue> {
    Some(SensorValue::Text(s.into()))
}

fn account_balance(account: &AccountSnapshot) -> Option<SensorValue> {
    text(account.balance_display())
}

fn account_currency(account: &AccountSnapshot) -> Option<String> {
    Some(account.currency.clone())
}

fn charging_status(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    charger.charging_status.as_deref().and_then(|s| text(humanize_status(s)))
}

fn plugged_in(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    charger
        .plugged_in
        .and_then(|p| text(if p { "Plugged In" } else { "Unplugged" }))
}

fn network(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    charger
        .connected
        .and_then(|c| text(if c { "Connected" } else { "Disconnected" }))
}

fn connectivity(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    text(humanize_status(charger.state().as_str()))
}

fn last_connected_at(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    charger.last_connected_at.map(SensorValue::Timestamp)
}

fn session_charging_state(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    match charger.session {
        Some(ref s) => s.charging_state.as_deref().and_then(|st| text(humanize_status(st))),
        None => text("Not Charging"),
    }
}

fn session_charging_time(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    match charger.session {
        Some(ref s) => s.charging_time_secs().map(SensorValue::Integer),
        None => Some(SensorValue::Integer(0)),
    }
}

fn session_charging_time_minutes(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    match charger.session {
        Some(ref s) => s.charging_time_secs().map(|secs| SensorValue::Integer(secs / 60)),
        None => Some(SensorValue::Integer(0)),
    }
}

fn power_output(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    charger.power_kw().map(|kw| SensorValue::Float(round_to(kw, 2)))
}

fn energy_output(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    charger.energy_kwh().map(|kwh| SensorValue::Float(round_to(kwh, 2)))
}

fn miles_added(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    match charger.session {
        Some(ref s) => s.miles_added.map(|m| SensorValue::Float(round_to(m, 2))),
        None => Some(SensorValue::Float(0.0)),
    }
}

fn miles_added_per_hour(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    match charger.session {
        Some(ref s) => s.miles_added_per_hour.map(|m| SensorValue::Float(round_to(m, 2))),
        None => Some(SensorValue::Float(0.0)),
    }
}

fn session_cost(charger: &ChargerSnapshot, _: &AccountSnapshot) -> Option<SensorValue> {
    charger.session_cost().and_then(|cost| text(format!("{:.2}", cost)))
}

/// Session currency when the vendor reports one, else the account's
fn session_currency(charger: &ChargerSnapshot, account: &AccountSnapshot) -> Option<String> {
    charger
        .session
        .as_ref()
        .and_then(|s| s.currency.clone())
        .or_else(|| Some(account.currency.clone()))
}

pub static ACCOUNT_SENSORS: &[AccountSensorDescription] = &[AccountSensorDescription {
    meta: SensorMeta {
        key: "account_balance",
        name_suffix: "Account Balance",
        icon: "mdi:wallet",
        device_class: Some(DeviceClass::Monetary),
        state_class: Some(StateClass::Total),
        native_unit: None,
    },
    value: account_balance,
    unit: Some(account_currency),
}];

pub static CHARGER_SENSORS: &[ChargerSensorDescription] = &[
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "charging_status",
            name_suffix: "Charging Status",
            icon: "mdi:lightning-bolt",
            device_class: None,
            state_class: None,
            native_unit: None,
        },
        value: charging_status,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "plugged_in",
            name_suffix: "Charging Cable",
            icon: "mdi:power-plug",
            device_class: None,
            state_class: None,
            native_unit: None,
        },
        value: plugged_in,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "connected",
            name_suffix: "Network",
            icon: "mdi:wifi",
            device_class: None,
            state_class: None,
            native_unit: None,
        },
        value: network,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "connectivity",
            name_suffix: "Connectivity",
            icon: "mdi:ev-station",
            device_class: None,
            state_class: None,
            native_unit: None,
        },
        value: connectivity,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "last_connected_at",
            name_suffix: "Last Connected At",
            icon: "mdi:progress-clock",
            device_class: Some(DeviceClass::Timestamp),
            state_class: None,
            native_unit: None,
        },
        value: last_connected_at,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "session_charging_state",
            name_suffix: "Charger State",
            icon: "mdi:battery-charging",
            device_class: None,
            state_class: None,
            native_unit: None,
        },
        value: session_charging_state,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "session_charging_time",
            name_suffix: "Charging Time",
            icon: "mdi:timer",
            device_class: None,
            state_class: Some(StateClass::Measurement),
            native_unit: Some("s"),
        },
        value: session_charging_time,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "session_charging_time_minute",
            name_suffix: "Charging Time (Minute)",
            icon: "mdi:timer",
            device_class: None,
            state_class: Some(StateClass::Measurement),
            native_unit: Some("min"),
        },
        value: session_charging_time_minutes,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "session_power_kw",
            name_suffix: "Power Output",
            icon: "mdi:transmission-tower",
            device_class: Some(DeviceClass::Power),
            state_class: Some(StateClass::Measurement),
            native_unit: Some("kW"),
        },
        value: power_output,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "session_energy_kwh",
            name_suffix: "Energy Output",
            icon: "mdi:lightning-bolt-circle",
            device_class: Some(DeviceClass::Energy),
            state_class: Some(StateClass::TotalIncreasing),
            native_unit: Some("kWh"),
        },
        value: energy_output,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "session_miles_added",
            name_suffix: "Miles Added",
            icon: "mdi:road-variant",
            device_class: None,
            state_class: Some(StateClass::Measurement),
            native_unit: Some("miles"),
        },
        value: miles_added,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "session_miles_added_per_hour",
            name_suffix: "Miles / Hour Added",
            icon: "mdi:car-speed-limiter",
            device_class: None,
            state_class: Some(StateClass::Measurement),
            native_unit: Some("mph"),
        },
        value: miles_added_per_hour,
        unit: None,
    },
    ChargerSensorDescription {
        meta: SensorMeta {
            key: "session_cost",
            name_suffix: "Charge Cost",
            icon: "mdi:cash-multiple",
            device_class: Some(DeviceClass::Monetary),
            state_class: Some(StateClass::Total),
            native_unit: None,
        },
        value: session_cost,
        unit: Some(session_currency),
    },
];

// ============================================================================
// Sensor entities
// ============================================================================

enum SensorKind {
    Account(&'static AccountSensorDescription),
    Charger {
        charger_id: ChargerId,
        description: &'static ChargerSensorDescription,
    },
}

/// One sensor entity registered with the host.
///
/// Holds no state of its own; every read projects the latest coordinator
/// update.
pub struct Sensor {
    unique_id: String,
    name: String,
    device: Option<DeviceInfo>,
    kind: SensorKind,
}

impl Sensor {
    fn account(account: &AccountSnapshot, description: &'static AccountSensorDescription) -> Self {
        Self {
            unique_id: format!("{}_{}", account.user_id, description.meta.key),
            name: format!("{} {}", account.username, description.meta.name_suffix),
            device: None,
            kind: SensorKind::Account(description),
        }
    }

    fn charger(
        charger: &ChargerSnapshot,
        zone: Option<&str>,
        description: &'static ChargerSensorDescription,
    ) -> Self {
        let prefix = charger
            .short_model()
            .map(str::to_string)
            .unwrap_or_else(|| charger.id.to_string());

        Self {
            unique_id: format!("{}_{}", charger.id, description.meta.key),
            name: format!("{} {}", prefix, description.meta.name_suffix),
            device: Some(DeviceInfo::for_charger(charger, zone)),
            kind: SensorKind::Charger {
                charger_id: charger.id,
                description,
            },
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    pub fn meta(&self) -> &'static SensorMeta {
        match self.kind {
            SensorKind::Account(d) => &d.meta,
            SensorKind::Charger { description, .. } => &description.meta,
        }
    }

    pub fn charger_id(&self) -> Option<ChargerId> {
        match self.kind {
            SensorKind::Account(_) => None,
            SensorKind::Charger { charger_id, .. } => Some(charger_id),
        }
    }

    /// Project the latest update onto this sensor.
    pub fn state(&self, update: &CoordinatorUpdate) -> SensorState {
        match update.data {
            Some(ref data) => self.project(data),
            None => SensorState::Unavailable,
        }
    }

    fn project(&self, data: &CoordinatorData) -> SensorState {
        let account = &data.account;
        let (value, unit) = match self.kind {
            SensorKind::Account(d) => {
                let unit = match d.unit {
                    Some(unit_fn) => unit_fn(account),
                    None => d.meta.native_unit.map(str::to_string),
                };
                ((d.value)(account), unit)
            }
            SensorKind::Charger {
                charger_id,
                description: d,
            } => {
                let Some(charger) = data.chargers.get(&charger_id) else {
                    return SensorState::Unavailable;
                };
                let unit = match d.unit {
                    Some(unit_fn) => unit_fn(charger, account),
                    None => d.meta.native_unit.map(str::to_string),
                };
                ((d.value)(charger, account), unit)
            }
        };

        match value {
            Some(value) => SensorState::Available { value, unit },
            None => SensorState::Unavailable,
        }
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("unique_id", &self.unique_id)
            .field("name", &self.name)
            .finish()
    }
}

/// Build the account sensors plus one sensor set per charger.
pub fn build_sensors(data: &CoordinatorData, zones: &BTreeMap<ChargerId, String>) -> Vec<Sensor> {
    let mut sensors: Vec<Sensor> = ACCOUNT_SENSORS
        .iter()
        .map(|d| Sensor::account(&data.account, d))
        .collect();

    for charger in data.chargers.values() {
        let zone = zones.get(&charger.id).map(|z| z.as_str());
        sensors.extend(CHARGER_SENSORS.iter().map(|d| Sensor::charger(charger, zone, d)));
    }

    sensors
}
