use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::CliStoreBackend;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "daysince-rs",
    about = "Interaction webhook that tracks the days since the last incident",
    version
)]
/// Public struct `Cli` used across daysince components.
pub struct Cli {
    #[arg(
        long = "public-key",
        env = "PUBLIC_KEY",
        hide_env_values = true,
        help = "Hex-encoded Ed25519 public key of the interaction dispatcher"
    )]
    pub public_key: Option<String>,

    #[arg(
        long,
        env = "DAYSINCE_BIND",
        default_value = "127.0.0.1:8787",
        help = "Socket address the webhook server listens on"
    )]
    pub bind: String,

    #[arg(
        long,
        env = "DAYSINCE_STORE",
        value_enum,
        default_value = "sqlite",
        help = "Incident store backend"
    )]
    pub store: CliStoreBackend,

    #[arg(
        long = "store-path",
        env = "DAYSINCE_STORE_PATH",
        default_value = ".daysince/incidents.sqlite",
        help = "SQLite database path used when --store=sqlite"
    )]
    pub store_path: PathBuf,

    #[arg(
        long = "callback-api-base",
        env = "DAYSINCE_CALLBACK_API_BASE",
        default_value = daysince_interactions::DEFAULT_CALLBACK_API_BASE,
        help = "Base URL of the platform that receives interaction callbacks"
    )]
    pub callback_api_base: String,

    #[arg(
        long = "request-timeout-ms",
        env = "DAYSINCE_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout for interaction callback requests"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "store-timeout-ms",
        env = "DAYSINCE_STORE_TIMEOUT_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Timeout applied to each incident store read or write"
    )]
    pub store_timeout_ms: u64,

    #[arg(
        long = "print-history",
        env = "DAYSINCE_PRINT_HISTORY",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Print the incident history as JSON lines and exit"
    )]
    pub print_history: bool,
}
