//! Logging initialization for the client core.
//!
//! All components use standard `tracing` macros; this module sets up the
//! subscriber once at startup. Output goes to stderr; `FABLE_LOG_JSON=1`
//! switches to structured JSON lines for log aggregation.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// Sets up tracing with:
/// - Log level from the RUST_LOG env var or the provided default
/// - Human-readable stderr output, or JSON lines when FABLE_LOG_JSON is set
///
/// Calling this more than once is a no-op (the second subscriber fails to
/// install and is discarded).
///
/// # Example
///
/// ```ignore
/// fable_config::logging::init_logging("info");
/// tracing::info!("client core started");
/// ```
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let json = std::env::var("FABLE_LOG_JSON")
        .map(|v| !v.trim().is_empty() && v != "0")
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized, skipping");
    }
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
