//! Infrastructure layer
//!
//! Configuration and logging for the command line front end.

mod config;
mod logging;

pub use config::{Config, ConfigError};
pub use logging::{DEBUG_ENV, effective_level, init_logging};
