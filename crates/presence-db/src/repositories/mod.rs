//! Repository implementations

mod error;
mod roster;

pub use error::map_db_error;
pub use roster::PgRosterRepository;
