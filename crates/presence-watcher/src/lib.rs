//! # presence-watcher
//!
//! The subscription lifecycle orchestrator: turns a roster of identities
//! into live presence subscriptions, folds notifies into an aggregate
//! snapshot, and rebroadcasts the snapshot when it changes.

pub mod collaborators;
pub mod orchestrator;
pub mod workers;

pub use orchestrator::{LoopEvent, Orchestrator};
