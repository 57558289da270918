//! ChargePoint command line host.
//!
//! Sets up one ChargePoint account and polls it, printing every sensor the
//! integration exposes. Usage:
//!
//! ```text
//! chargepoint setup
//! chargepoint reauth
//! chargepoint options <seconds>
//! chargepoint status
//! chargepoint run
//! chargepoint remove
//! ```

mod commands;
mod credentials;
mod store;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use store::EntryStore;

/// When set, logs are also written to a daily rolling file in this directory
const LOG_DIR_ENV: &str = "CHARGEPOINT_LOG_DIR";

const LOG_FILE_PREFIX: &str = "chargepoint.log";

const USAGE: &str = "\
Usage: chargepoint <command>

Commands:
  setup              Add the ChargePoint account
  reauth             Update the stored password
  options <seconds>  Set the poll interval (30, 60, 180, 300, 600)
  status             Poll once and print every sensor
  run                Poll on the configured interval
  remove             Forget the account";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=chargepoint_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let mut store = EntryStore::load()?;
    info!(command = %command, path = %store.path().display(), "ChargePoint CLI starting");

    match command.as_str() {
        "setup" => commands::setup(&mut store).await,
        "reauth" => commands::reauth(&mut store).await,
        "options" => match args.get(1) {
            Some(seconds) => commands::options(&mut store, seconds),
            None => anyhow::bail!("Missing poll interval\n\n{}", USAGE),
        },
        "status" => commands::status(store).await,
        "run" => commands::run(store).await,
        "remove" => commands::remove(&mut store),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => anyhow::bail!("Unknown command {:?}\n\n{}", other, USAGE),
    }
}
