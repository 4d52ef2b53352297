//! Routes - resolved network paths toward the presence proxy
//!
//! A `Route` is immutable once produced by the resolver. A `RouteList`
//! holds one resolution attempt's ordered candidates plus the failover
//! cursor; it is owned by exactly one subscription and consumed
//! left-to-right.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport used to reach a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Udp,
    Tcp,
    Tls,
}

impl Default for Transport {
    fn default() -> Self {
        Self::Udp
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "udp"),
            Self::Tcp => write!(f, "tcp"),
            Self::Tls => write!(f, "tls"),
        }
    }
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            "tls" => Ok(Self::Tls),
            _ => Err(format!("Invalid transport: {s}")),
        }
    }
}

/// A single resolved network route (host, port, transport)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
}

impl Route {
    /// Create a new route
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, transport: Transport) -> Self {
        Self {
            host: host.into(),
            port,
            transport,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{};transport={}", self.host, self.port, self.transport)
    }
}

/// Ordered route candidates for one resolution attempt, with a failover cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteList {
    routes: Vec<Route>,
    cursor: usize,
}

impl RouteList {
    /// Create a route list from resolved candidates
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes, cursor: 0 }
    }

    /// The route the cursor currently points at, if any remain
    pub fn current(&self) -> Option<&Route> {
        self.routes.get(self.cursor)
    }

    /// Advance past the current route and return the next candidate
    pub fn advance(&mut self) -> Option<&Route> {
        if self.cursor < self.routes.len() {
            self.cursor += 1;
        }
        self.routes.get(self.cursor)
    }

    /// Whether every candidate has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.routes.len()
    }

    /// Number of routes already consumed (failover attempts so far)
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Total number of candidates
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the resolution produced no candidates at all
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
