//! Domain layer errors

use thiserror::Error;

use crate::value_objects::IdentityParseError;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid identity {raw:?}: {source}")]
    InvalidIdentity {
        raw: String,
        #[source]
        source: IdentityParseError,
    },

    #[error("Malformed presence document: {0}")]
    MalformedDocument(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl DomainError {
    /// Build an `InvalidIdentity` error preserving the offending input
    pub fn invalid_identity(raw: impl Into<String>, source: IdentityParseError) -> Self {
        Self::InvalidIdentity {
            raw: raw.into(),
            source,
        }
    }
}
