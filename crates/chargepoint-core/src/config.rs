//! Integration constants, per-account options and config entries.
//!
//! A `ConfigEntry` is what the config flow produces and what the host keeps
//! in its own storage between runs. The core only defines the shape; the
//! host decides where it lives.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::SessionToken;
use crate::models::ChargerId;

/// Integration domain, used as the device identifier namespace
pub const DOMAIN: &str = "chargepoint";

/// Display name of the integration
pub const NAME: &str = "ChargePoint";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ATTRIBUTION: &str = "Data provided by https://www.chargepoint.com";

pub const ISSUE_URL: &str = "https://github.com/mbillow/ha-chargepoint/issues";

/// Poll intervals offered to the user, in seconds
pub const POLL_INTERVAL_OPTIONS: [(&str, u64); 5] = [
    ("30 seconds", 30),
    ("1 minute", 60),
    ("3 minutes", 180),
    ("5 minutes", 300),
    ("10 minutes", 600),
];

/// Default poll interval in seconds
pub const POLL_INTERVAL_DEFAULT: u64 = 180;

pub fn is_valid_poll_interval(secs: u64) -> bool {
    POLL_INTERVAL_OPTIONS.iter().any(|(_, v)| *v == secs)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_poll_interval() -> u64 {
    POLL_INTERVAL_DEFAULT
}

impl Default for Options {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL_DEFAULT,
        }
    }
}

impl Options {
    /// Interval the host should tick at, falling back to the default when
    /// the stored value is not one of the offered options.
    pub fn poll_interval(&self) -> Duration {
        if is_valid_poll_interval(self.poll_interval) {
            Duration::from_secs(self.poll_interval)
        } else {
            warn!(
                poll_interval = self.poll_interval,
                default = POLL_INTERVAL_DEFAULT,
                "Invalid poll interval, using default"
            );
            Duration::from_secs(POLL_INTERVAL_DEFAULT)
        }
    }
}

/// One configured account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// The account username; at most one entry per username
    pub unique_id: String,
    pub title: String,
    pub username: String,
    /// Last token issued for this account, reused on the next start
    pub access_token: Option<SessionToken>,
    #[serde(default)]
    pub options: Options,
    /// Charger id to host zone/area name
    #[serde(default)]
    pub zones: BTreeMap<ChargerId, String>,
}

impl ConfigEntry {
    pub fn zone_for(&self, charger_id: ChargerId) -> Option<&str> {
        self.zones.get(&charger_id).map(|z| z.as_str())
    }
}

/// All configured entries, as held by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntries {
    #[serde(default)]
    entries: Vec<ConfigEntry>,
}

impl ConfigEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, unique_id: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.unique_id == unique_id)
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.get(unique_id).is_some()
    }

    /// Add an entry unless one with the same unique id exists.
    /// Returns whether the entry was added.
    pub fn insert(&mut self, entry: ConfigEntry) -> bool {
        if self.contains(&entry.unique_id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Replace the entry with the same unique id. Returns whether one existed.
    pub fn update(&mut self, entry: ConfigEntry) -> bool {
        match self.entries.iter_mut().find(|e| e.unique_id == entry.unique_id) {
            Some(existing) => {
                *existing = entry;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, unique_id: &str) -> Option<ConfigEntry> {
        let index = self.entries.iter().position(|e| e.unique_id == unique_id)?;
        Some(self.entries.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
