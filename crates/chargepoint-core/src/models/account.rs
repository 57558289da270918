use serde::{Deserialize, Serialize};

/// Point-in-time read of the account balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub user_id: i64,
    pub username: String,
    pub balance: f64,
    /// ISO 4217 code, e.g. `USD`
    pub currency: String,
}

impl AccountSnapshot {
    /// Balance rounded to cents, as shown on the balance sensor
    pub fn balance_display(&self) -> String {
        format!("{:.2}", self.balance)
    }
}
