//! Presence aggregator
//!
//! Owns the canonical identity→status mapping. The snapshot serializes
//! deterministically (BTreeMap keeps identity keys sorted), so two
//! snapshots with the same content always produce the same string no
//! matter the fold order. Change detection compares against the last
//! successfully broadcast form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use presence_core::{Identity, PresenceDocument};

/// Last-known status for one identity
#[derive(Debug, Clone)]
pub struct PresenceRecord {
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// The canonical aggregate of last-known presence per identity
#[derive(Debug, Default)]
pub struct PresenceAggregator {
    records: BTreeMap<Identity, PresenceRecord>,
    last_broadcast: Option<String>,
}

impl PresenceAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a parsed presence document into the aggregate.
    ///
    /// Returns whether the canonical snapshot now differs from the last
    /// broadcast one. A document without any status note leaves the
    /// aggregate untouched and reports no change. Last write wins per
    /// identity, regardless of content.
    pub fn fold(&mut self, identity: &Identity, document: &PresenceDocument) -> bool {
        let Some(note) = document.status_note() else {
            return false;
        };

        let status = note.to_lowercase();
        tracing::debug!(identity = %identity, status = %status, "Folding presence update");

        self.records.insert(
            identity.clone(),
            PresenceRecord {
                status,
                updated_at: Utc::now(),
            },
        );

        self.has_pending_change()
    }

    /// Remove an identity's record (subscription ended). Same
    /// change-detection semantics as `fold`.
    pub fn remove(&mut self, identity: &Identity) -> bool {
        if self.records.remove(identity).is_some() {
            tracing::debug!(identity = %identity, "Removed presence record");
        }
        self.has_pending_change()
    }

    /// The canonical serialized snapshot: identity→status, keys in sorted
    /// order.
    pub fn canonical(&self) -> String {
        let map: BTreeMap<&str, &str> = self
            .records
            .iter()
            .map(|(identity, record)| (identity.as_str(), record.status.as_str()))
            .collect();
        // BTreeMap of string keys cannot fail to serialize
        serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
    }

    /// Whether the current snapshot differs from the last broadcast one
    pub fn has_pending_change(&self) -> bool {
        self.last_broadcast.as_deref() != Some(self.canonical().as_str())
    }

    /// Record that `serialized` was successfully broadcast
    pub fn mark_broadcast(&mut self, serialized: String) {
        self.last_broadcast = Some(serialized);
    }

    /// Last-known status for one identity
    pub fn status_of(&self, identity: &Identity) -> Option<&str> {
        self.records.get(identity).map(|r| r.status.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
