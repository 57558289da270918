//! Interactive setup of a ChargePoint account.
//!
//! The flow is driven by the host one step at a time:
//!
//! 1. [`ConfigFlow::submit_user`] with the username and password
//! 2. [`ConfigFlow::submit_zones`] with a zone for each discovered charger
//!    (skipped when the account has no home chargers)
//!
//! and ends in [`FlowStep::CreateEntry`] or [`FlowStep::Abort`]. Errors the
//! user can fix come back as [`ConfigError`] on the step that caused them,
//! so the host can show them inline and let the user retry.
//!
//! Reauthentication and options changes work on an existing entry and do
//! not need a flow.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, AuthError};
use crate::auth::{Credentials, SessionToken};
use crate::config::{is_valid_poll_interval, ConfigEntries, ConfigEntry, Options};
use crate::entities::DeviceInfo;
use crate::models::{ChargerId, ChargerSnapshot};

/// Errors surfaced inline while configuring an account.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Username and password are required")]
    EmptyCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is locked")]
    AccountLocked,

    #[error("Cannot connect to ChargePoint: {0}")]
    CannotConnect(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),

    #[error("Charger {0} was not discovered for this account")]
    UnknownCharger(ChargerId),

    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    #[error("Poll interval of {0} seconds is not supported")]
    InvalidPollInterval(u64),

    #[error("No setup flow in progress")]
    NoFlowInProgress,
}

impl ConfigError {
    /// Translation key the host shows next to the form
    pub fn key(&self) -> &'static str {
        match self {
            ConfigError::EmptyCredentials => "empty_credentials",
            ConfigError::InvalidCredentials => "invalid_credentials",
            ConfigError::AccountLocked => "account_locked",
            ConfigError::CannotConnect(_) => "cannot_connect",
            ConfigError::Unknown(_) => "unknown",
            ConfigError::UnknownCharger(_) => "unknown_charger",
            ConfigError::UnknownZone(_) => "unknown_zone",
            ConfigError::InvalidPollInterval(_) => "invalid_poll_interval",
            ConfigError::NoFlowInProgress => "no_flow_in_progress",
        }
    }
}

impl From<ApiError> for ConfigError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Auth(AuthError::EmptyCredentials) => ConfigError::EmptyCredentials,
            ApiError::Auth(AuthError::AccountLocked) => ConfigError::AccountLocked,
            ApiError::Auth(_) => ConfigError::InvalidCredentials,
            ApiError::NetworkError(_)
            | ApiError::RateLimited
            | ApiError::ServerError(_)
            | ApiError::NotFound(_) => ConfigError::CannotConnect(e.to_string()),
            ApiError::InvalidResponse(_) => ConfigError::Unknown(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    AlreadyConfigured,
}

impl AbortReason {
    pub fn key(&self) -> &'static str {
        match self {
            AbortReason::AlreadyConfigured => "already_configured",
        }
    }
}

/// A discovered charger offered for zone assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargerChoice {
    pub id: ChargerId,
    pub name: String,
}

/// What the flow produced: the entry to store and the credentials the host
/// keeps alongside it.
#[derive(Debug, Clone)]
pub struct FlowResult {
    pub entry: ConfigEntry,
    pub credentials: Credentials,
}

#[derive(Debug)]
pub enum FlowStep {
    /// Show the credentials form, with the error from the last attempt
    User { error: Option<ConfigError> },
    /// Ask the user to place each charger in one of the host's zones
    Zones { chargers: Vec<ChargerChoice> },
    CreateEntry(FlowResult),
    Abort(AbortReason),
}

struct PendingAccount {
    credentials: Credentials,
    token: SessionToken,
    chargers: Vec<ChargerSnapshot>,
}

pub struct ConfigFlow {
    client: ApiClient,
    pending: Option<PendingAccount>,
}

impl ConfigFlow {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            pending: None,
        }
    }

    /// The first step shown to the user
    pub fn start(&mut self) -> FlowStep {
        self.pending = None;
        FlowStep::User { error: None }
    }

    /// Validate credentials and discover the account's chargers.
    pub async fn submit_user(&mut self, existing: &ConfigEntries, credentials: Credentials) -> FlowStep {
        self.pending = None;

        if existing.contains(&credentials.username) {
            info!(username = %credentials.username, "Account already configured");
            return FlowStep::Abort(AbortReason::AlreadyConfigured);
        }

        let token = match self.client.authenticate(&credentials).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Login failed during setup");
                return FlowStep::User {
                    error: Some(e.into()),
                };
            }
        };

        let chargers = match self.client.list_chargers(&token).await {
            Ok(chargers) => chargers,
            Err(e) => {
                warn!(error = %e, "Could not list chargers during setup");
                return FlowStep::User {
                    error: Some(e.into()),
                };
            }
        };
        debug!(count = chargers.len(), "Discovered home chargers");

        let pending = PendingAccount {
            credentials,
            token,
            chargers,
        };

        if pending.chargers.is_empty() {
            return FlowStep::CreateEntry(Self::create_entry(pending, BTreeMap::new()));
        }

        let choices = pending
            .chargers
            .iter()
            .map(|c| ChargerChoice {
                id: c.id,
                name: DeviceInfo::for_charger(c, None).name,
            })
            .collect();
        self.pending = Some(pending);

        FlowStep::Zones { chargers: choices }
    }

    /// Finish the flow with the user's charger to zone mapping.
    ///
    /// `known_zones` are the zone names the host understands. Chargers left
    /// out of `zones` are created without a zone. On error the flow stays on
    /// the zone step.
    pub fn submit_zones(
        &mut self,
        zones: BTreeMap<ChargerId, String>,
        known_zones: &[String],
    ) -> Result<FlowStep, ConfigError> {
        let pending = self.pending.as_ref().ok_or(ConfigError::NoFlowInProgress)?;

        for (charger_id, zone) in &zones {
            if !pending.chargers.iter().any(|c| c.id == *charger_id) {
                return Err(ConfigError::UnknownCharger(*charger_id));
            }
            if !known_zones.iter().any(|z| z == zone) {
                return Err(ConfigError::UnknownZone(zone.clone()));
            }
        }

        let pending = self.pending.take().ok_or(ConfigError::NoFlowInProgress)?;
        Ok(FlowStep::CreateEntry(Self::create_entry(pending, zones)))
    }

    fn create_entry(pending: PendingAccount, zones: BTreeMap<ChargerId, String>) -> FlowResult {
        let username = pending.credentials.username.clone();
        info!(username = %username, chargers = pending.chargers.len(), "Creating ChargePoint entry");

        FlowResult {
            entry: ConfigEntry {
                unique_id: username.clone(),
                title: username.clone(),
                username,
                access_token: Some(pending.token),
                options: Options::default(),
                zones,
            },
            credentials: pending.credentials,
        }
    }
}

/// Log in again with a new password for an existing entry.
///
/// Returns the entry with its token replaced; the host stores it and hands
/// the credentials to the running coordinator.
pub async fn reauth(
    client: &ApiClient,
    entry: &ConfigEntry,
    password: &str,
) -> Result<(ConfigEntry, Credentials), ConfigError> {
    let credentials = Credentials::new(entry.username.clone(), password);
    let token = client.authenticate(&credentials).await.map_err(|e| {
        warn!(error = %e, username = %entry.username, "Reauthentication failed");
        ConfigError::from(e)
    })?;

    info!(username = %entry.username, "Reauthenticated ChargePoint account");
    let mut updated = entry.clone();
    updated.access_token = Some(token);
    Ok((updated, credentials))
}

/// Change the poll interval of an existing entry.
pub fn update_options(entry: &ConfigEntry, poll_interval: u64) -> Result<ConfigEntry, ConfigError> {
    if !is_valid_poll_interval(poll_interval) {
        return Err(ConfigError::InvalidPollInterval(poll_interval));
    }

    let mut updated = entry.clone();
    updated.options = Options { poll_interval };
    Ok(updated)
}
