//! # presence-core
//!
//! Domain layer containing value objects, presence payloads, subscription
//! events, and the collaborator traits the orchestrator depends on.
//! This crate has zero dependencies on infrastructure (database, protocol
//! transport, etc.).

pub mod error;
pub mod events;
pub mod payloads;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::DomainError;
pub use events::SubscriptionEvent;
pub use payloads::PresenceDocument;
pub use traits::{
    EngineError, EngineResult, ProtocolEngine, RepoResult, ResolveError, ResolveTarget,
    RosterRepository, RouteResolver, SubscriptionHandle, SubscriptionId,
};
pub use value_objects::{Identity, IdentityParseError, Route, RouteList, Transport};
