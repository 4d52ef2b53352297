//! Subscription queue manager
//!
//! Accepts batches of raw identity strings, validates and deduplicates
//! them against live subscriptions and the pending set, and tracks
//! whether a route resolution is in flight for the current batch.

use std::collections::BTreeMap;

use presence_core::Identity;

/// Identities awaiting route resolution, each mapped to the raw roster
/// string it was parsed from (the key for status write-back)
#[derive(Debug, Default)]
pub struct SubscriptionQueue {
    pending: BTreeMap<Identity, String>,
    resolving: bool,
}

impl SubscriptionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of raw identity strings to the pending set.
    ///
    /// Invalid identities are logged and dropped. Identities already
    /// subscribed (per `is_active`) or already pending are dropped
    /// silently. Returns the number of identities actually added.
    pub fn enqueue<F>(&mut self, batch: &[String], default_domain: &str, is_active: F) -> usize
    where
        F: Fn(&Identity) -> bool,
    {
        let mut added = 0;

        for raw in batch {
            let identity = match Identity::parse(raw, default_domain) {
                Ok(identity) => identity,
                Err(e) => {
                    tracing::warn!(raw = %raw, error = %e, "Dropping invalid identity");
                    continue;
                }
            };

            if is_active(&identity) || self.pending.contains_key(&identity) {
                continue;
            }

            self.pending.insert(identity, raw.clone());
            added += 1;
        }

        added
    }

    /// Hand the full pending set over for subscription creation and clear
    /// it. Also clears the resolving flag: the batch's resolution is done.
    pub fn take_pending(&mut self) -> Vec<(Identity, String)> {
        self.resolving = false;
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a resolution request is currently in flight (or awaiting
    /// its backoff retry)
    pub fn is_resolving(&self) -> bool {
        self.resolving
    }

    pub fn set_resolving(&mut self, resolving: bool) {
        self.resolving = resolving;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_validates_and_deduplicates() {
        let mut queue = SubscriptionQueue::new();

        let batch = vec![
            "alice".to_string(),
            "bob@other.org".to_string(),
            "alice".to_string(),      // duplicate in batch
            "@broken".to_string(),    // invalid
            "sip:carol".to_string(),  // scheme stripped
        ];
        let added = queue.enqueue(&batch, "example.com", |_| false);

        assert_eq!(added, 3);
        assert_eq!(queue.pending_count(), 3);
    }

    #[test]
    fn test_enqueue_skips_active_identities() {
        let mut queue = SubscriptionQueue::new();
        let active = Identity::parse("alice", "example.com").unwrap();

        let batch = vec!["alice".to_string(), "bob".to_string()];
        let added = queue.enqueue(&batch, "example.com", |id| *id == active);

        assert_eq!(added, 1);
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_enqueue_skips_already_pending() {
        let mut queue = SubscriptionQueue::new();
        queue.enqueue(&["alice".to_string()], "example.com", |_| false);

        let added = queue.enqueue(&["alice".to_string()], "example.com", |_| false);
        assert_eq!(added, 0);
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_take_pending_clears_queue_and_resolving() {
        let mut queue = SubscriptionQueue::new();
        queue.enqueue(
            &["bob".to_string(), "alice".to_string()],
            "example.com",
            |_| false,
        );
        queue.set_resolving(true);

        let pending = queue.take_pending();
        assert_eq!(pending.len(), 2);
        // BTreeMap iteration gives a stable order
        assert_eq!(pending[0].0.user(), "alice");
        assert_eq!(pending[0].1, "alice");
        assert_eq!(pending[1].0.user(), "bob");

        assert!(!queue.has_pending());
        assert!(!queue.is_resolving());
    }
}
