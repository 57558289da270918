use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "chargepoint-ha";

/// Account passwords kept in the OS keychain, keyed by username.
pub struct CredentialStore;

impl CredentialStore {
    pub fn store(username: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    pub fn get_password(username: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .with_context(|| format!("No stored password for {}; run `chargepoint reauth`", username))
    }

    pub fn delete(username: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}
