//! PostgreSQL connection pool management

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use presence_common::DatabaseConfig;

/// Maximum time to wait for a connection
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum idle time before a connection is closed
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Create a new PostgreSQL connection pool from discrete connection
/// parameters (host, port, user, password, database).
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .connect_with(options)
        .await
}
