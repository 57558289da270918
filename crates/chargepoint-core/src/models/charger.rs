use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ChargingSession;

/// Vendor-assigned device id
pub type ChargerId = i64;

/// Charging status string reported while the charger is delivering power
const CHARGING_STATUS_CHARGING: &str = "CHARGING";

/// Coarse connectivity/session state of a charger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargerState {
    Idle,
    Charging,
    Unavailable,
}

impl ChargerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargerState::Idle => "idle",
            ChargerState::Charging => "charging",
            ChargerState::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ChargerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time read of one home charger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargerSnapshot {
    pub id: ChargerId,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub charging_status: Option<String>,
    pub plugged_in: Option<bool>,
    pub connected: Option<bool>,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub amperage_limit: Option<i64>,
    pub possible_amperage_limits: Vec<i64>,
    pub software_version: Option<String>,
    pub serial_number: Option<String>,
    pub mac_address: Option<String>,
    /// The user's active session, only when it is running on this charger
    pub session: Option<ChargingSession>,
}

impl ChargerSnapshot {
    /// A snapshot with only the id set; the client fills in the rest.
    pub fn new(id: ChargerId) -> Self {
        Self {
            id,
            brand: None,
            model: None,
            charging_status: None,
            plugged_in: None,
            connected: None,
            last_connected_at: None,
            amperage_limit: None,
            possible_amperage_limits: Vec::new(),
            software_version: None,
            serial_number: None,
            mac_address: None,
            session: None,
        }
    }

    pub fn state(&self) -> ChargerState {
        if self.connected != Some(true) {
            return ChargerState::Unavailable;
        }
        let session_in_use = self.session.as_ref().map(|s| s.is_in_use()).unwrap_or(false);
        let status_charging = self
            .charging_status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case(CHARGING_STATUS_CHARGING))
            .unwrap_or(false);

        if session_in_use || status_charging {
            ChargerState::Charging
        } else {
            ChargerState::Idle
        }
    }

    /// Instantaneous power in kW; zero when no session is running here
    pub fn power_kw(&self) -> Option<f64> {
        match self.session {
            Some(ref s) => s.power_kw,
            None => Some(0.0),
        }
    }

    /// Energy delivered by the current session in kWh; zero when idle
    pub fn energy_kwh(&self) -> Option<f64> {
        match self.session {
            Some(ref s) => s.energy_kwh,
            None => Some(0.0),
        }
    }

    /// Cost of the current session; zero when idle
    pub fn session_cost(&self) -> Option<f64> {
        match self.session {
            Some(ref s) => s.total_amount,
            None => Some(0.0),
        }
    }

    /// Model prefix before the first dash, e.g. `CPH50` for `CPH50-NEMA6-50-L23`
    pub fn short_model(&self) -> Option<&str> {
        self.model.as_deref().and_then(|m| m.split('-').next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(device_id: ChargerId, state: &str) -> ChargingSession {
        ChargingSession {
            session_id: 99,
            device_id,
            charging_state: Some(state.to_string()),
            power_kw: Some(7.2),
            energy_kwh: Some(3.456),
            total_amount: Some(1.2),
            currency: Some("USD".to_string()),
            charging_time_ms: Some(125_000),
            miles_added: Some(10.0),
            miles_added_per_hour: Some(25.0),
        }
    }

    #[test]
    fn test_state_unavailable_when_disconnected() {
        let mut charger = ChargerSnapshot::new(1);
        assert_eq!(charger.state(), ChargerState::Unavailable);

        charger.connected = Some(false);
        charger.session = Some(session(1, "in_use"));
        assert_eq!(charger.state(), ChargerState::Unavailable);
    }

    #[test]
    fn test_state_charging_from_session_or_status() {
        let mut charger = ChargerSnapshot::new(1);
        charger.connected = Some(true);
        charger.charging_status = Some("AVAILABLE".to_string());
        assert_eq!(charger.state(), ChargerState::Idle);

        charger.session = Some(session(1, "in_use"));
        assert_eq!(charger.state(), ChargerState::Charging);

        charger.session = Some(session(1, "fully_charged"));
        assert_eq!(charger.state(), ChargerState::Idle);

        charger.session = None;
        charger.charging_status = Some("CHARGING".to_string());
        assert_eq!(charger.state(), ChargerState::Charging);
    }

    #[test]
    fn test_session_values_default_to_zero_when_idle() {
        let mut charger = ChargerSnapshot::new(1);
        assert_eq!(charger.power_kw(), Some(0.0));
        assert_eq!(charger.energy_kwh(), Some(0.0));
        assert_eq!(charger.session_cost(), Some(0.0));

        let mut s = session(1, "in_use");
        s.power_kw = None;
        charger.session = Some(s);
        assert_eq!(charger.power_kw(), None);
        assert_eq!(charger.energy_kwh(), Some(3.456));
    }

    #[test]
    fn test_short_model() {
        let mut charger = ChargerSnapshot::new(1);
        assert_eq!(charger.short_model(), None);
        charger.model = Some("CPH50-NEMA6-50-L23".to_string());
        assert_eq!(charger.short_model(), Some("CPH50"));
        charger.model = Some("HOMEFLEX".to_string());
        assert_eq!(charger.short_model(), Some("HOMEFLEX"));
    }
}
