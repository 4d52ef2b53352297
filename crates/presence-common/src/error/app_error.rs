//! Application error types
//!
//! Unified error taxonomy for the watcher. Only `Config`, startup
//! `DatabaseConnection`, and `EngineStartup` are fatal; everything else
//! is logged and scoped to the identity or batch it belongs to.

use presence_core::{DomainError, EngineError, ResolveError};

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Fatal at startup
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    #[error("Protocol engine startup failed: {0}")]
    EngineStartup(String),

    // Retryable with randomized backoff
    #[error("Route resolution failed: {0}")]
    RouteResolution(#[from] ResolveError),

    // Retryable via next route; fatal for the identity once exhausted
    #[error("Subscription transport failure for {identity}: {source}")]
    SubscriptionTransport {
        identity: String,
        #[source]
        source: EngineError,
    },

    // Logged and dropped
    #[error("Broadcast failed: {0}")]
    Broadcast(EngineError),

    // Domain errors (invalid identity, malformed document, db)
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Internal errors
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error must abort the process at startup
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::DatabaseConnection(_) | Self::EngineStartup(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AppError::Config(ConfigError::MissingVar("DATABASE_USER")).is_fatal());
        assert!(AppError::DatabaseConnection("refused".to_string()).is_fatal());
        assert!(AppError::EngineStartup("bind failed".to_string()).is_fatal());

        assert!(!AppError::RouteResolution(ResolveError::NoRoutes).is_fatal());
        assert!(!AppError::Broadcast(EngineError::Timeout).is_fatal());
        assert!(
            !AppError::Domain(DomainError::MalformedDocument("bad json".to_string())).is_fatal()
        );
    }
}
