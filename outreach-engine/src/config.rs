//! Configuration module for environment variable parsing.
//!
//! Process-level settings only. Campaigns live in the YAML campaign file
//! named by `OUTREACH_CONFIG`, see [`crate::campaign`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the tracking server to listen on
    pub port: u16,

    /// Path of the campaign file
    pub campaigns_path: PathBuf,

    /// SMTP password shared by the campaign sender identities
    pub smtp_password: Option<String>,

    /// How long a store call waits for another writer
    pub store_timeout: Duration,

    /// Consecutive transport connection failures that abort a dispatch run
    pub max_consecutive_connection_failures: u32,

    /// Optional wall-clock budget for a dispatch run
    pub dispatch_budget: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            campaigns_path: env::var("OUTREACH_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./config.yaml")),

            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),

            store_timeout: Duration::from_millis(parse_or("STORE_TIMEOUT_MS", 2000)),

            max_consecutive_connection_failures: parse_or("MAX_CONSECUTIVE_CONNECTION_FAILURES", 3)
                .max(1),

            dispatch_budget: parse_optional::<u64>("DISPATCH_BUDGET_SECS").map(Duration::from_secs),
        }
    }
}

/// Parse `name`, falling back to `default` when unset or invalid.
fn parse_or<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    parse_optional(name).unwrap_or(default)
}

/// Parse `name` if set. Invalid values are logged and ignored.
fn parse_optional<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(env_var = name, value = %raw, "invalid_env_value_ignored");
            None
        }
    }
}
