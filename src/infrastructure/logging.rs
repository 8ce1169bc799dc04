//! Logging configuration
//!
//! Initializes tracing for the application. Logs go to stderr so that
//! generated scripts can be piped from stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable that forces debug logging when set
pub const DEBUG_ENV: &str = "YAMLINE_DEBUG";

/// Picks the effective level: `YAMLINE_DEBUG` wins over the requested one
#[must_use]
pub fn effective_level(requested: &str, debug_flag: Option<&str>) -> String {
    match debug_flag {
        Some(value) if !value.is_empty() && value != "0" && value != "false" => "debug".into(),
        _ => requested.to_string(),
    }
}

/// Initializes logging with the specified level.
///
/// `RUST_LOG` overrides the level when it is set. Calling this twice is
/// harmless; the first subscriber stays installed.
pub fn init_logging(level: &str) {
    let debug_flag = std::env::var(DEBUG_ENV).ok();
    let level = effective_level(level, debug_flag.as_deref());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    if tracing::subscriber::set_global_default(subscriber(filter)).is_ok() {
        tracing::debug!(%level, "Logging initialized");
    }
}

/// Formatter writing to stderr, filtered by `filter`
fn subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .finish()
}
