//! stale-users - export Entra ID users who stopped signing in.

#![deny(clippy::all)]

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stale_users::config::Config;
use stale_users::pipeline;

fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only log if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    init_logging();

    info!("Starting stale-users v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        error!("{}", e);
        if let Some(app_error) = e.downcast_ref::<stale_users::error::AppError>() {
            eprintln!("{}", app_error.user_message());
            if app_error.is_setup_failure() {
                eprintln!("No requests were sent to Microsoft Graph.");
            }
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = Config::load();

    // Requests are issued one after another; a single thread is enough.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let summary = runtime.block_on(pipeline::run(&config))?;

    info!(
        "Done: {} of {} users written to {}",
        summary.rows_written,
        summary.users_scanned,
        config.report.output_path.display()
    );
    Ok(())
}

/// Initialize tracing/logging on stderr.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}
