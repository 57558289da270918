//! REST API client module for ChargePoint services.
//!
//! This module provides the `ApiClient` for logging in to a ChargePoint
//! driver account and reading its balance, home chargers and active
//! charging session.
//!
//! Authenticated calls carry the session id issued at login as the
//! `coulomb_sess` cookie.

pub mod client;
pub mod error;

pub use client::{ApiClient, Endpoints, HomeChargerStatus, HomeChargerTechnicalInfo};
pub use error::{ApiError, ApiResult, AuthError};
