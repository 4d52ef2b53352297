//! Configuration loading

mod app_config;

pub use app_config::{
    AccountConfig, AppConfig, ConfigError, DatabaseConfig, RosterConfig, TimeoutConfig,
};
