//! Presence payloads - notification document parsing

mod document;

pub use document::{PersonStatus, PresenceDocument};
