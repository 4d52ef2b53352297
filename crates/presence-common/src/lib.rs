//! # presence-common
//!
//! Shared utilities for the presence watcher: configuration loading,
//! the application error taxonomy, and telemetry setup.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{
    AccountConfig, AppConfig, ConfigError, DatabaseConfig, RosterConfig, TimeoutConfig,
};
pub use error::AppError;
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
