//! External collaborator contracts: route resolver, protocol engine,
//! roster repository.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DomainError;
use crate::events::SubscriptionEvent;
use crate::value_objects::{Identity, Route, Transport};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Result type for protocol engine operations
pub type EngineResult<T> = Result<T, EngineError>;

// ============================================================================
// Route Resolver
// ============================================================================

/// The proxy target a resolution is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTarget {
    pub host: String,
    pub port: Option<u16>,
    pub transport: Option<Transport>,
}

impl ResolveTarget {
    /// Target a bare domain, leaving port and transport to the resolver
    #[must_use]
    pub fn domain(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            transport: None,
        }
    }

    /// Target an explicitly configured outbound proxy
    #[must_use]
    pub fn proxy(host: impl Into<String>, port: u16, transport: Transport) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
            transport: Some(transport),
        }
    }
}

impl fmt::Display for ResolveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.port, self.transport) {
            (Some(port), Some(transport)) => {
                write!(f, "{}:{port};transport={transport}", self.host)
            }
            (Some(port), None) => write!(f, "{}:{port}", self.host),
            _ => write!(f, "{}", self.host),
        }
    }
}

/// Route resolution failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("DNS lookup failed: {0}")]
    Lookup(String),

    #[error("no routes found for target")]
    NoRoutes,
}

/// Resolves a proxy target into ordered route candidates.
///
/// The resolver owns no retry policy; backoff and retries belong to the
/// subscription queue.
#[async_trait]
pub trait RouteResolver: Send + Sync {
    /// Resolve `target` into an ordered list of route candidates,
    /// preferring the given transports in order.
    async fn resolve(
        &self,
        target: &ResolveTarget,
        transports: &[Transport],
    ) -> Result<Vec<Route>, ResolveError>;
}

// ============================================================================
// Protocol Engine
// ============================================================================

/// Opaque identifier for one live subscription inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by a successful subscribe request: the engine-side
/// subscription id plus the stream of lifecycle events for it.
///
/// Events arrive in protocol order; the receiver closing without an
/// `Ended`/`Failed` event means the engine was stopped.
#[derive(Debug)]
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<SubscriptionEvent>,
}

/// Protocol engine failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("engine is stopped")]
    Stopped,
}

/// Drives subscriptions and one-shot messages over the wire.
///
/// Dialog establishment, transport security, and wire encoding all live
/// behind this trait.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Issue a subscribe request for `identity` against `route` with a
    /// bounded timeout. Subsequent lifecycle events are delivered on the
    /// returned handle.
    async fn subscribe(
        &self,
        identity: &Identity,
        route: &Route,
        timeout: Duration,
    ) -> EngineResult<SubscriptionHandle>;

    /// Request protocol-level termination of a subscription, bounded by
    /// `timeout`. The subscription's event stream reports the final
    /// `Ended`.
    async fn end(&self, id: SubscriptionId, timeout: Duration) -> EngineResult<()>;

    /// Send a one-shot outbound message via `route`.
    async fn send_message(
        &self,
        from: &Identity,
        to: &str,
        route: &Route,
        body: &str,
    ) -> EngineResult<()>;

    /// Stop the engine. Every live subscription's event stream closes.
    async fn stop(&self) -> EngineResult<()>;
}

// ============================================================================
// Roster Repository
// ============================================================================

/// Source of the identity roster and sink for last-known status strings.
#[async_trait]
pub trait RosterRepository: Send + Sync {
    /// Load the distinct, non-null identity strings from the configured
    /// read column, in a stable order.
    async fn load_identities(&self) -> RepoResult<Vec<String>>;

    /// Upsert `status` into the configured write column for the row whose
    /// read column equals `identity`.
    async fn write_status(&self, identity: &str, status: &str) -> RepoResult<()>;

    /// Release the underlying connections.
    async fn close(&self);
}
