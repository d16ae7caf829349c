//! Command-line configuration and entry point for the daysince webhook.

pub mod cli_args;
pub mod cli_types;

pub use cli_args::*;
pub use cli_types::*;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use daysince_interactions::{run_interaction_server, InteractionServerConfig};
use daysince_store::{InMemoryIncidentStore, IncidentStore, SqliteIncidentStore};
use tracing::info;

/// Opens the incident store selected on the command line.
pub fn open_incident_store(cli: &Cli) -> Result<Arc<dyn IncidentStore>> {
    match cli.store {
        CliStoreBackend::Memory => {
            info!("using in-memory incident store");
            Ok(Arc::new(InMemoryIncidentStore::new()))
        }
        CliStoreBackend::Sqlite => {
            let store = SqliteIncidentStore::new(&cli.store_path)
                .with_context(|| {
                    format!(
                        "failed to open incident store '{}'",
                        cli.store_path.display()
                    )
                })?
                .with_busy_timeout(Duration::from_millis(cli.store_timeout_ms));
            info!(path = %cli.store_path.display(), "using sqlite incident store");
            Ok(Arc::new(store))
        }
    }
}

/// Translates parsed flags into the server configuration.
pub fn build_server_config(cli: &Cli) -> Result<InteractionServerConfig> {
    let Some(public_key) = cli
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        bail!("--public-key (or PUBLIC_KEY) must be provided");
    };
    Ok(InteractionServerConfig {
        bind: cli.bind.clone(),
        public_key_hex: public_key.to_string(),
        callback_api_base: cli.callback_api_base.clone(),
        request_timeout_ms: cli.request_timeout_ms,
        store_timeout_ms: cli.store_timeout_ms,
    })
}

/// Writes every history entry as one JSON object per line.
pub async fn write_incident_history(
    store: &dyn IncidentStore,
    out: &mut impl Write,
) -> Result<usize> {
    let history = store
        .list_history()
        .await
        .context("failed to read incident history")?;
    for entry in &history {
        let line = serde_json::to_string(entry).context("failed to encode history entry")?;
        writeln!(out, "{line}").context("failed to write history entry")?;
    }
    Ok(history.len())
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let store = open_incident_store(&cli)?;
    if cli.print_history {
        let mut buffer = Vec::new();
        write_incident_history(store.as_ref(), &mut buffer).await?;
        std::io::stdout()
            .write_all(&buffer)
            .context("failed to write incident history to stdout")?;
        return Ok(());
    }

    let config = build_server_config(&cli)?;
    run_interaction_server(config, store).await
}
