use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Context, Result};
use chargepoint_core::config::{ConfigEntry, POLL_INTERVAL_OPTIONS};
use chargepoint_core::config_flow::{self, ConfigFlow, FlowResult, FlowStep};
use chargepoint_core::entities::Sensor;
use chargepoint_core::{
    build_sensors, ApiClient, Coordinator, CoordinatorUpdate, Credentials, Endpoints, RefreshOutcome,
};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::credentials::CredentialStore;
use crate::store::EntryStore;

/// Login attempts allowed during `setup` before giving up
const MAX_LOGIN_ATTEMPTS: usize = 3;

/// Overrides every vendor base URL, for testing against a local server
const API_BASE_ENV: &str = "CHARGEPOINT_API_BASE";

const USERNAME_ENV: &str = "CHARGEPOINT_USERNAME";
const PASSWORD_ENV: &str = "CHARGEPOINT_PASSWORD";

fn api_client() -> Result<ApiClient> {
    let client = match std::env::var(API_BASE_ENV) {
        Ok(base) => ApiClient::with_endpoints(Endpoints::single(base)),
        Err(_) => ApiClient::new(),
    };
    client.context("Failed to build HTTP client")
}

/// Source of interactive answers during setup.
pub trait Prompt {
    fn line(&mut self, label: &str) -> Result<String>;
    fn password(&mut self) -> Result<String>;

    fn username(&mut self) -> Result<String> {
        self.line("Username: ")
    }
}

/// Reads answers from the terminal, with `.env` defaults.
pub struct Terminal;

impl Prompt for Terminal {
    fn line(&mut self, label: &str) -> Result<String> {
        print!("{}", label);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    fn password(&mut self) -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            return Ok(password);
        }
        let password = rpassword::prompt_password("Password: ")?;
        Ok(password)
    }

    fn username(&mut self) -> Result<String> {
        match std::env::var(USERNAME_ENV) {
            Ok(username) => {
                let input = self.line(&format!("Username [{}]: ", username))?;
                Ok(if input.is_empty() { username } else { input })
            }
            Err(_) => self.line("Username: "),
        }
    }
}

// ============================================================================
// setup / reauth / options / remove
// ============================================================================

/// Drive the config flow to completion.
///
/// Retries the login form up to [`MAX_LOGIN_ATTEMPTS`] times and re-asks the
/// zone step until it is accepted. Returns `None` when the account is already
/// configured.
pub async fn run_setup_flow(
    flow: &mut ConfigFlow,
    store: &EntryStore,
    prompt: &mut impl Prompt,
) -> Result<Option<FlowResult>> {
    let mut step = flow.start();

    for _ in 0..MAX_LOGIN_ATTEMPTS {
        if let FlowStep::User { error } = &step {
            if let Some(e) = error {
                println!("Error ({}): {}\n", e.key(), e);
            }
            let username = prompt.username()?;
            if let Ok(existing) = store.entry() {
                if existing.username != username {
                    anyhow::bail!(
                        "Already set up for {}; run `chargepoint remove` first",
                        existing.username
                    );
                }
            }
            let credentials = Credentials::new(username, prompt.password()?);
            println!("\nAuthenticating...");
            step = flow.submit_user(&store.entries, credentials).await;
        }
        if !matches!(step, FlowStep::User { .. }) {
            break;
        }
    }

    loop {
        match step {
            FlowStep::User { error } => {
                let reason = error.map(|e| e.to_string()).unwrap_or_default();
                anyhow::bail!("Setup failed after {} attempts: {}", MAX_LOGIN_ATTEMPTS, reason);
            }
            FlowStep::Abort(reason) => {
                println!("This account is already configured ({}).", reason.key());
                return Ok(None);
            }
            FlowStep::CreateEntry(result) => return Ok(Some(result)),
            FlowStep::Zones { chargers } => {
                println!("\nAvailable zones: {}", store.zones.join(", "));
                let mut zones = BTreeMap::new();
                for charger in &chargers {
                    let label = format!("Zone for {} ({}) [none]: ", charger.name, charger.id);
                    let zone = prompt.line(&label)?;
                    if !zone.is_empty() {
                        zones.insert(charger.id, zone);
                    }
                }
                step = match flow.submit_zones(zones, &store.zones) {
                    Ok(next) => next,
                    Err(e) => {
                        println!("Error ({}): {}", e.key(), e);
                        FlowStep::Zones { chargers }
                    }
                };
            }
        }
    }
}

pub async fn setup(store: &mut EntryStore) -> Result<()> {
    let mut flow = ConfigFlow::new(api_client()?);
    let Some(result) = run_setup_flow(&mut flow, store, &mut Terminal).await? else {
        return Ok(());
    };

    CredentialStore::store(&result.credentials.username, &result.credentials.password)?;
    let title = result.entry.title.clone();
    store.entries.insert(result.entry);
    store.save()?;

    println!("Configured {}. Saved to {}", title, store.path().display());
    Ok(())
}

pub async fn reauth(store: &mut EntryStore) -> Result<()> {
    let entry = store.entry()?.clone();
    println!("Reauthenticating {}", entry.username);
    let password = Terminal.password()?;

    let (updated, credentials) = config_flow::reauth(&api_client()?, &entry, &password)
        .await
        .map_err(|e| anyhow::anyhow!("Reauthentication failed ({}): {}", e.key(), e))?;

    CredentialStore::store(&credentials.username, &credentials.password)?;
    store.entries.update(updated);
    store.save()?;

    println!("Reauthenticated {}", entry.username);
    Ok(())
}

pub fn options(store: &mut EntryStore, seconds: &str) -> Result<()> {
    let seconds: u64 = seconds
        .parse()
        .with_context(|| format!("Poll interval must be a number of seconds, got {:?}", seconds))?;
    let entry = store.entry()?;

    let updated = config_flow::update_options(entry, seconds).map_err(|e| {
        let allowed: Vec<&str> = POLL_INTERVAL_OPTIONS.iter().map(|(label, _)| *label).collect();
        anyhow::anyhow!("{} (allowed: {})", e, allowed.join(", "))
    })?;

    let username = updated.username.clone();
    store.entries.update(updated);
    store.save()?;

    println!("Poll interval for {} set to {} seconds", username, seconds);
    Ok(())
}

pub fn remove(store: &mut EntryStore) -> Result<()> {
    let username = store.entry()?.username.clone();
    store.entries.remove(&username);
    store.save()?;

    if let Err(e) = CredentialStore::delete(&username) {
        warn!(error = %e, "Could not remove stored password");
    }

    println!("Removed {}", username);
    Ok(())
}

// ============================================================================
// status / run
// ============================================================================

/// Create a coordinator for an entry and run its first poll.
async fn start_coordinator(entry: &ConfigEntry) -> Result<Coordinator> {
    let password = CredentialStore::get_password(&entry.username)?;
    let credentials = Credentials::new(entry.username.clone(), password);
    let coordinator = Coordinator::new(api_client()?, credentials, entry.access_token.clone());

    coordinator.first_refresh().await.with_context(|| {
        format!("Initial refresh for {} failed; try `chargepoint reauth`", entry.username)
    })?;
    Ok(coordinator)
}

/// Save the coordinator's current token if it differs from the stored one.
async fn persist_token(store: &mut EntryStore, username: &str, coordinator: &Coordinator) -> Result<()> {
    if store.set_token(username, coordinator.session_token().await) {
        store.save()?;
    }
    Ok(())
}

fn print_sensors(title: &str, sensors: &[Sensor], update: &CoordinatorUpdate) {
    let polled_at = update
        .polled_at
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("== {} (polled {}) ==", title, polled_at);

    if let Some(ref error) = update.error {
        println!("   last poll failed: {}", error);
    }
    for sensor in sensors {
        println!("   {:<42} {}", sensor.name(), sensor.state(update));
    }
    println!();
}

pub async fn status(mut store: EntryStore) -> Result<()> {
    let entry = store.entry()?.clone();
    let coordinator = start_coordinator(&entry).await?;
    persist_token(&mut store, &entry.username, &coordinator).await?;

    let update = coordinator.latest();
    if let Some(ref data) = update.data {
        let sensors = build_sensors(data, &entry.zones);
        print_sensors(&entry.title, &sensors, &update);
    }
    Ok(())
}

pub async fn run(mut store: EntryStore) -> Result<()> {
    let entry = store.entry()?.clone();
    let coordinator = start_coordinator(&entry).await?;
    persist_token(&mut store, &entry.username, &coordinator).await?;

    let sensors = match coordinator.latest().data {
        Some(ref data) => build_sensors(data, &entry.zones),
        None => Vec::new(),
    };
    info!(
        username = %entry.username,
        sensors = sensors.len(),
        interval_secs = entry.options.poll_interval().as_secs(),
        "Polling started"
    );
    print_sensors(&entry.title, &sensors, &coordinator.latest());

    let mut ticker = tokio::time::interval(entry.options.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; first_refresh already covered it
    ticker.tick().await;

    let mut rx = coordinator.subscribe();
    loop {
        ticker.tick().await;
        let token_renewed = match coordinator.refresh().await {
            RefreshOutcome::Updated { token_renewed } => token_renewed,
            RefreshOutcome::Failed {
                error,
                token_renewed,
            } => {
                warn!(username = %entry.username, error = %error, "Poll failed");
                token_renewed
            }
            RefreshOutcome::Skipped => continue,
        };
        if token_renewed {
            persist_token(&mut store, &entry.username, &coordinator).await?;
        }

        let update = rx.borrow_and_update().clone();
        print_sensors(&entry.title, &sensors, &update);
    }
}
