use serde::Serialize;

use crate::config::DOMAIN;
use crate::models::ChargerSnapshot;

/// Vendor brand code used by ChargePoint-made chargers
const BRAND_CHARGEPOINT: &str = "CP";

/// Registry information for one charger device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, charger id)`
    pub identifier: (String, String),
    pub manufacturer: String,
    pub model: Option<String>,
    pub name: String,
    pub sw_version: Option<String>,
    /// Zone the user assigned the charger to during setup
    pub suggested_area: Option<String>,
}

impl DeviceInfo {
    pub fn for_charger(charger: &ChargerSnapshot, zone: Option<&str>) -> Self {
        let manufacturer = match charger.brand.as_deref() {
            Some(BRAND_CHARGEPOINT) | None => "ChargePoint".to_string(),
            Some(other) => other.to_string(),
        };

        let name = match charger.short_model() {
            Some(short) if short.contains("CPH") => format!("{} Home Flex ({})", manufacturer, short),
            Some(short) => format!("{} {}", manufacturer, short),
            None => format!("{} {}", manufacturer, charger.id),
        };

        Self {
            identifier: (DOMAIN.to_string(), charger.id.to_string()),
            manufacturer,
            model: charger.model.clone(),
            name,
            sw_version: charger.software_version.clone(),
            suggested_area: zone.map(str::to_string),
        }
    }
}
