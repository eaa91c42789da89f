//! HRMS CLI - a command line front end for the HRMS REST API.
//!
//! Logs in once, keeps the session on disk, and lets admins and employees
//! work with departments, employees, leave, holidays and payslips. Expired
//! access tokens are refreshed transparently by `hrms-core`.

mod commands;
mod format;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hrms_core::{ApiClient, Config, SessionEvent, SessionStore};

use commands::Command;

/// Shown once when the refresh token is refused
const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please log in again (hrms login)";

#[derive(Parser, Debug)]
#[command(name = "hrms")]
#[command(about = "Manage employees, leave and payroll from the terminal")]
#[command(version)]
struct Cli {
    /// Backend URL (overrides config file and HRMS_BACKEND_URL)
    #[arg(long, value_name = "URL", global = true)]
    backend: Option<String>,

    /// Directory holding the saved session
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Write logs to daily files in this directory instead of stderr
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "hrms.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

/// Drain pending session events. Returns true if the session expired.
fn session_expired(events: &mut broadcast::Receiver<SessionEvent>) -> bool {
    let mut expired = false;
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Expired {
            expired = true;
        }
    }
    expired
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());

    let mut config = Config::load().context("Failed to load config")?;

    let data_dir = match cli.data_dir {
        Some(ref dir) => dir.clone(),
        None => config.data_dir()?,
    };
    let session = Arc::new(SessionStore::open(&data_dir).context("Failed to open session store")?);
    let api_url = config.api_url_with(cli.backend.as_deref());
    info!(api_url = %api_url, authenticated = session.is_authenticated(), "HRMS CLI starting");

    let client = ApiClient::new(&api_url, session)?;
    let mut events = client.subscribe();

    let result = commands::run(&client, &mut config, cli.command, cli.json).await;

    // The log guard must drop before the process ends
    if session_expired(&mut events) {
        eprintln!("{}", SESSION_EXPIRED_MESSAGE);
        return Ok(ExitCode::FAILURE);
    }

    result.map(|()| ExitCode::SUCCESS)
}
