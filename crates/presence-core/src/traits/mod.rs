//! Collaborator traits (ports) - define the interfaces the orchestrator
//! requires from its external collaborators
//!
//! The domain layer defines what it needs; the infrastructure layers
//! (database, protocol transport) provide the implementations.

mod collaborators;

pub use collaborators::{
    EngineError, EngineResult, ProtocolEngine, RepoResult, ResolveError, ResolveTarget,
    RosterRepository, RouteResolver, SubscriptionHandle, SubscriptionId,
};
