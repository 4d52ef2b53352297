//! # presence-db
//!
//! Database layer implementing the roster repository trait with
//! PostgreSQL via SQLx: connection pool management plus the repository
//! that reads the identity roster and writes last-known status back.

pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, PgPool};
pub use repositories::PgRosterRepository;
