//! On-disk storage for configured accounts.
//!
//! Entries live at `~/.config/chargepoint-ha/entries.json` together with the
//! zone names offered when assigning chargers. Passwords are never written
//! here; see [`CredentialStore`](crate::credentials::CredentialStore).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chargepoint_core::config::{ConfigEntries, ConfigEntry};
use chargepoint_core::SessionToken;
use serde::{Deserialize, Serialize};

/// Application name used for the config directory
pub const APP_NAME: &str = "chargepoint-ha";

const ENTRIES_FILE: &str = "entries.json";

fn default_zones() -> Vec<String> {
    ["Garage", "Driveway", "Carport", "Outside"]
        .iter()
        .map(|z| z.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStore {
    /// Zones chargers can be assigned to during setup
    #[serde(default = "default_zones")]
    pub zones: Vec<String>,
    #[serde(flatten)]
    pub entries: ConfigEntries,
    #[serde(skip)]
    path: PathBuf,
}

impl EntryStore {
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let mut store: Self = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self {
                zones: default_zones(),
                entries: ConfigEntries::new(),
                path: PathBuf::new(),
            }
        };
        store.path = path;
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured account. The CLI manages a single account.
    pub fn entry(&self) -> Result<&ConfigEntry> {
        self.entries
            .iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No account configured; run `chargepoint setup`"))
    }

    /// Record the latest token for an account. Returns whether anything
    /// changed and needs saving.
    pub fn set_token(&mut self, username: &str, token: Option<SessionToken>) -> bool {
        let Some(mut entry) = self.entries.get(username).cloned() else {
            return false;
        };
        if entry.access_token == token {
            return false;
        }

        entry.access_token = token;
        self.entries.update(entry)
    }

    fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(ENTRIES_FILE))
    }
}
