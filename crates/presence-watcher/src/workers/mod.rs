//! Off-loop worker tasks
//!
//! Blocking terminal reads and database access run outside the event
//! loop; both hand their results back through the loop's channel so all
//! orchestrator state keeps a single writer.

mod db;
mod input;

pub use db::{spawn_db_worker, DbCommand, DB_COMMAND_BUFFER};
pub use input::spawn_input_worker;
