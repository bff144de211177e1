//! # Structured Logging Module
//!
//! Environment-aware structured logging for the compiler and its CLI.
//! Production output is JSON; other environments use the human-readable
//! formatter.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    init_with_level(None);
}

/// Initialize logging, overriding the environment's default level.
///
/// `RUST_LOG` still wins when set. Only the first call has any effect.
pub fn init_with_level(level: Option<&str>) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let default_level = level
            .map(str::to_string)
            .unwrap_or_else(|| get_log_level(&environment).to_string());
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level))
        };

        let console = if environment == "production" {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json()
                .with_filter(filter())
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_filter(filter())
                .boxed()
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::debug!(
            environment = %environment,
            level = %default_level,
            "structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("VOLUNTEER_SEARCH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "test" => "debug",
        "development" => "debug",
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for a compiled statement
pub fn log_query_compiled(source: &str, sql: &str, parameters: usize, duration_us: Option<u64>) {
    tracing::info!(
        source = %source,
        sql = %sql,
        parameters = parameters,
        duration_us = duration_us,
        timestamp = %Utc::now().to_rfc3339(),
        "QUERY_COMPILED"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
