//! Change broadcaster
//!
//! Sends the aggregate snapshot as a one-shot `statusupdate` message
//! whenever it differs from the last one sent. Best-effort, at-most-once:
//! without an active route the broadcast is skipped and logged, never
//! queued.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use presence_core::{Identity, ProtocolEngine, Route};

use super::aggregator::PresenceAggregator;

/// Outbound envelope carrying a serialized snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateEnvelope {
    pub data: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl StatusUpdateEnvelope {
    #[must_use]
    pub fn new(snapshot: impl Into<String>) -> Self {
        Self {
            data: snapshot.into(),
            to: "all".to_string(),
            kind: "statusupdate".to_string(),
        }
    }
}

/// Broadcasts aggregate changes via the protocol engine
pub struct ChangeBroadcaster {
    engine: Arc<dyn ProtocolEngine>,
    sender: Identity,
}

impl ChangeBroadcaster {
    pub fn new(engine: Arc<dyn ProtocolEngine>, sender: Identity) -> Self {
        Self { engine, sender }
    }

    /// Broadcast the current snapshot if it differs from the last one
    /// sent. Marks the snapshot as broadcast only on a successful send.
    pub async fn maybe_broadcast(
        &self,
        aggregator: &mut PresenceAggregator,
        route: Option<&Route>,
    ) {
        if !aggregator.has_pending_change() {
            return;
        }

        let Some(route) = route else {
            tracing::warn!("No active route, skipping broadcast");
            return;
        };

        let snapshot = aggregator.canonical();
        let envelope = StatusUpdateEnvelope::new(snapshot.clone());
        let body = match serde_json::to_string(&envelope) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast envelope");
                return;
            }
        };

        match self
            .engine
            .send_message(&self.sender, &envelope.to, route, &body)
            .await
        {
            Ok(()) => {
                tracing::info!(route = %route, tracked = aggregator.len(), "Broadcast status update");
                aggregator.mark_broadcast(snapshot);
            }
            Err(e) => {
                // Best-effort: log and move on, the next change retries
                tracing::warn!(error = %e, route = %route, "Broadcast failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let envelope = StatusUpdateEnvelope::new(r#"{"alice@example.com":"busy"}"#);
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"data":"{\"alice@example.com\":\"busy\"}","to":"all","type":"statusupdate"}"#
        );
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = StatusUpdateEnvelope::new("{}");
        let json = serde_json::to_string(&envelope).unwrap();
        let back: StatusUpdateEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, "{}");
        assert_eq!(back.to, "all");
        assert_eq!(back.kind, "statusupdate");
    }
}
