//! Data models for ChargePoint account and charger state.
//!
//! These are plain snapshot records decoupled from the vendor's wire
//! format:
//!
//! - `AccountSnapshot`: balance and currency for the signed-in user
//! - `ChargerSnapshot`, `ChargerState`: one home charger per snapshot
//! - `ChargingSession`: an in-progress charging session

pub mod account;
pub mod charger;
pub mod session;

pub use account::AccountSnapshot;
pub use charger::{ChargerId, ChargerSnapshot, ChargerState};
pub use session::ChargingSession;
