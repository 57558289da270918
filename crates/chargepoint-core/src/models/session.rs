use serde::{Deserialize, Serialize};

use super::ChargerId;

/// Vendor state string for a session that is actively drawing power
const SESSION_STATE_IN_USE: &str = "IN_USE";

/// An in-progress charging session as reported by the vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingSession {
    pub session_id: i64,
    pub device_id: ChargerId,
    pub charging_state: Option<String>,
    pub power_kw: Option<f64>,
    pub energy_kwh: Option<f64>,
    pub total_amount: Option<f64>,
    pub currency: Option<String>,
    /// Milliseconds since the session started
    pub charging_time_ms: Option<i64>,
    pub miles_added: Option<f64>,
    pub miles_added_per_hour: Option<f64>,
}

impl ChargingSession {
    pub fn is_in_use(&self) -> bool {
        self.charging_state
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case(SESSION_STATE_IN_USE))
            .unwrap_or(false)
    }

    pub fn charging_time_secs(&self) -> Option<i64> {
        self.charging_time_ms.map(|ms| ms / 1000)
    }
}
