//! Subscription events - what the protocol engine reports per subscription
//!
//! One exhaustively-matched sum type replaces any name-based handler
//! dispatch: every consumer must handle every variant.

use serde::{Deserialize, Serialize};

/// All events a single subscription can emit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionEvent {
    /// The subscribe request was accepted by the remote side
    Started,
    /// The remote side holds the subscription in a pending/unauthorized state
    Pending,
    /// The subscription is active and notifies will flow
    Active,
    /// A presence notification arrived; `body` is the raw document
    Notify { body: String },
    /// The subscription terminated (remotely or after a local end request)
    Ended,
    /// The subscribe attempt failed at the transport level or timed out
    Failed { reason: String },
}

impl SubscriptionEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Notify { .. } => "NOTIFY",
            Self::Ended => "ENDED",
            Self::Failed { .. } => "FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        assert_eq!(SubscriptionEvent::Started.event_type(), "STARTED");
        assert_eq!(SubscriptionEvent::Active.event_type(), "ACTIVE");
        assert_eq!(
            SubscriptionEvent::Notify {
                body: "{}".to_string()
            }
            .event_type(),
            "NOTIFY"
        );
        assert_eq!(
            SubscriptionEvent::Failed {
                reason: "timeout".to_string()
            }
            .event_type(),
            "FAILED"
        );
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&SubscriptionEvent::Pending).unwrap();
        assert_eq!(json, r#"{"type":"PENDING"}"#);

        let event: SubscriptionEvent =
            serde_json::from_str(r#"{"type":"NOTIFY","body":"{\"notes\":[]}"}"#).unwrap();
        assert!(matches!(event, SubscriptionEvent::Notify { .. }));
    }
}
