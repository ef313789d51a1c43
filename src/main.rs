//! Phonebook maintenance runner.
//!
//! Repairs duplicate phone numbers in the configured SQLite database, installs
//! the per-user uniqueness constraint and prints the JSON report to stdout.

use anyhow::{Context, Result};
use phonebook_core::{Config, DuplicateResolver, Metrics, SqliteContactRepository};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Logs go to stderr so stdout carries only the report
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(path = %config.database_path.display(), "Opening contact database");
    let repo = SqliteContactRepository::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    let metrics = Metrics::new();
    let resolver = DuplicateResolver::with_metrics(Arc::new(repo), metrics.clone());

    let report = match resolver.resolve_and_constrain().await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Duplicate repair failed");
            // Committed repairs are still reported before exiting non-zero
            let partial = serde_json::json!({
                "error": e.to_string(),
                "outcomes": e.outcomes(),
            });
            println!("{}", serde_json::to_string_pretty(&partial)?);
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    let summary = metrics.summary();
    info!(
        groups = report.groups_found,
        removed = summary.duplicates_removed_total,
        failures = summary.repair_failures_total,
        "Maintenance complete"
    );
    Ok(())
}
