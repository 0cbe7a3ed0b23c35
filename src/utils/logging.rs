//! Structured logging and secret redaction.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats, and keeps API keys out of log lines.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static! {
    static ref API_KEY: Regex = Regex::new(r"sk-[A-Za-z0-9_\-]{8,}").unwrap();
    static ref BEARER: Regex = Regex::new(r"(?i)bearer\s+[A-Za-z0-9._\-]+").unwrap();
}

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `compact`: Single-line human-readable output.
/// - `pretty` (default): Multi-line, colorized output for development.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Replace API keys and bearer tokens in `input` with placeholders.
///
/// Upstream error bodies sometimes echo the credential back; run them through
/// this before logging.
pub fn redact(input: &str) -> String {
    let result = API_KEY.replace_all(input, "[REDACTED_API_KEY]");
    BEARER
        .replace_all(&result, "Bearer [REDACTED_TOKEN]")
        .into_owned()
}
