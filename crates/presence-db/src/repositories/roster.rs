//! PostgreSQL implementation of RosterRepository
//!
//! Table and column names come from configuration, so they cannot be
//! bound as query parameters; they are validated against a strict
//! identifier grammar and double-quoted before interpolation.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use presence_common::RosterConfig;
use presence_core::error::DomainError;
use presence_core::traits::{RepoResult, RosterRepository};

use super::error::map_db_error;

/// PostgreSQL implementation of RosterRepository
#[derive(Clone)]
pub struct PgRosterRepository {
    pool: PgPool,
    table: String,
    read_column: String,
    write_column: Option<String>,
}

impl PgRosterRepository {
    /// Create a new PgRosterRepository.
    ///
    /// Fails if the configured table or column names are not valid SQL
    /// identifiers.
    pub fn new(pool: PgPool, config: &RosterConfig) -> RepoResult<Self> {
        let table = quote_identifier(&config.table)?;
        let read_column = quote_identifier(&config.read_column)?;
        let write_column = config
            .write_column
            .as_deref()
            .map(quote_identifier)
            .transpose()?;

        Ok(Self {
            pool,
            table,
            read_column,
            write_column,
        })
    }

    /// Whether a write column is configured for status write-back
    pub fn has_write_column(&self) -> bool {
        self.write_column.is_some()
    }
}

#[async_trait]
impl RosterRepository for PgRosterRepository {
    #[instrument(skip(self))]
    async fn load_identities(&self) -> RepoResult<Vec<String>> {
        let query = format!(
            "SELECT DISTINCT {read} FROM {table} WHERE {read} IS NOT NULL ORDER BY {read}",
            read = self.read_column,
            table = self.table,
        );

        let identities: Vec<String> = sqlx::query_scalar(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        tracing::debug!(count = identities.len(), "Loaded roster identities");

        Ok(identities)
    }

    #[instrument(skip(self, status))]
    async fn write_status(&self, identity: &str, status: &str) -> RepoResult<()> {
        let Some(write) = &self.write_column else {
            tracing::trace!(identity, "No write column configured, skipping status write");
            return Ok(());
        };

        let query = format!(
            "UPDATE {table} SET {write} = $1 WHERE {read} = $2",
            table = self.table,
            read = self.read_column,
        );

        let result = sqlx::query(&query)
            .bind(status)
            .bind(identity)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        tracing::debug!(
            identity,
            status,
            rows = result.rows_affected(),
            "Wrote status to roster table"
        );

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Validate a configured name as a plain SQL identifier and double-quote it.
fn quote_identifier(name: &str) -> Result<String, DomainError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(format!("\"{name}\""))
    } else {
        Err(DomainError::DatabaseError(format!(
            "invalid identifier in roster configuration: {name:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_accepts_plain_names() {
        assert_eq!(quote_identifier("extensions").unwrap(), "\"extensions\"");
        assert_eq!(quote_identifier("sip_extension").unwrap(), "\"sip_extension\"");
        assert_eq!(quote_identifier("_private").unwrap(), "\"_private\"");
    }

    #[test]
    fn test_quote_identifier_rejects_injection() {
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("users; DROP TABLE users").is_err());
        assert!(quote_identifier("col\"name").is_err());
        assert!(quote_identifier("1starts_with_digit").is_err());
        assert!(quote_identifier("name with space").is_err());
    }
}
