//! ChargePoint home charger integration core.
//!
//! Reads account balance and home charger state from the ChargePoint cloud
//! and exposes it as host sensors. The host owns scheduling and storage:
//!
//! - [`config_flow`] turns a username and password into a [`ConfigEntry`]
//! - [`Coordinator`] polls the account when the host calls `refresh()`
//! - [`entities`] project each published update into sensor states

pub mod api;
pub mod auth;
pub mod config;
pub mod config_flow;
pub mod coordinator;
pub mod entities;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResult, AuthError, Endpoints};
pub use auth::{Credentials, SessionToken};
pub use config::{ConfigEntries, ConfigEntry, Options};
pub use config_flow::{ConfigError, ConfigFlow, FlowStep};
pub use coordinator::{Coordinator, CoordinatorData, CoordinatorUpdate, RefreshOutcome};
pub use entities::{build_sensors, Sensor, SensorState, SensorValue};
pub use models::{AccountSnapshot, ChargerId, ChargerSnapshot, ChargerState, ChargingSession};
