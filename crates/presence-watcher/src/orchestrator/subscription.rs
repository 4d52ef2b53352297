//! Per-identity subscription state machine
//!
//! One `Subscription` exists per identity while it is being tracked. It
//! owns that identity's route list and failover cursor; the orchestrator
//! drives transitions from protocol engine events.

use chrono::{DateTime, Utc};

use presence_core::{Identity, Route, RouteList, SubscriptionId};

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// A subscribe request is in flight (or about to retry on the next route)
    Subscribing,
    /// The remote side accepted but holds the subscription pending
    Pending,
    /// Notifies are flowing
    Active,
    /// A local end request is in flight
    Ending,
    /// Terminal
    Ended,
}

impl SubscriptionState {
    /// Whether stopping this subscription requires a protocol-level
    /// termination request. Anything not yet accepted remotely can be
    /// dropped locally.
    #[must_use]
    pub fn needs_termination(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Whether notifies in this state are folded into the aggregate
    #[must_use]
    pub fn accepts_notifies(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribing => write!(f, "subscribing"),
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Ending => write!(f, "ending"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// One identity's live subscription
#[derive(Debug)]
pub struct Subscription {
    pub identity: Identity,
    /// The raw roster string this identity came from; the key for status
    /// write-back
    pub source: String,
    pub routes: RouteList,
    pub state: SubscriptionState,
    /// Failover attempts consumed so far
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    /// Engine-side id, set once the subscribe request is accepted
    pub engine_id: Option<SubscriptionId>,
}

impl Subscription {
    /// Create a subscription ready to subscribe on the first route
    #[must_use]
    pub fn new(identity: Identity, source: String, routes: RouteList) -> Self {
        Self {
            identity,
            source,
            routes,
            state: SubscriptionState::Subscribing,
            attempts: 0,
            created_at: Utc::now(),
            engine_id: None,
        }
    }

    /// The route the subscription is currently using
    pub fn current_route(&self) -> Option<&Route> {
        self.routes.current()
    }

    /// Record a transport failure and move to the next route candidate.
    /// Returns the next route, or `None` once the list is exhausted.
    pub fn fail_over(&mut self) -> Option<&Route> {
        self.attempts += 1;
        self.engine_id = None;
        self.routes.advance()
    }
}
