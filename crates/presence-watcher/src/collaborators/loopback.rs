//! Loopback protocol engine
//!
//! An in-process engine for local runs and tests: every subscribe is
//! accepted and goes active immediately, `end` terminates the matching
//! subscription, and outbound messages are recorded and logged instead of
//! hitting the wire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use presence_core::{
    EngineError, EngineResult, Identity, ProtocolEngine, Route, SubscriptionEvent,
    SubscriptionHandle, SubscriptionId,
};

/// Per-subscription event buffer
const EVENT_BUFFER: usize = 16;

/// In-process engine that accepts everything
#[derive(Default)]
pub struct LoopbackEngine {
    next_id: AtomicU64,
    stopped: AtomicBool,
    subscriptions: Mutex<HashMap<SubscriptionId, mpsc::Sender<SubscriptionEvent>>>,
    sent: Mutex<Vec<String>>,
}

impl LoopbackEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far (for assertions in tests)
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().map(|subs| subs.len()).unwrap_or(0)
    }

    fn check_running(&self) -> EngineResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            Err(EngineError::Stopped)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProtocolEngine for LoopbackEngine {
    async fn subscribe(
        &self,
        identity: &Identity,
        route: &Route,
        _timeout: Duration,
    ) -> EngineResult<SubscriptionHandle> {
        self.check_running()?;

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        // Accept unconditionally: started, then straight to active
        let _ = tx.send(SubscriptionEvent::Started).await;
        let _ = tx.send(SubscriptionEvent::Active).await;

        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            subscriptions.insert(id, tx);
        }

        info!(identity = %identity, route = %route, id = %id, "Loopback subscription accepted");
        Ok(SubscriptionHandle { id, events: rx })
    }

    async fn end(&self, id: SubscriptionId, _timeout: Duration) -> EngineResult<()> {
        self.check_running()?;

        let sender = self
            .subscriptions
            .lock()
            .ok()
            .and_then(|mut subscriptions| subscriptions.remove(&id));

        match sender {
            Some(tx) => {
                let _ = tx.send(SubscriptionEvent::Ended).await;
                Ok(())
            }
            None => Err(EngineError::Rejected(format!("unknown subscription {id}"))),
        }
    }

    async fn send_message(
        &self,
        from: &Identity,
        to: &str,
        route: &Route,
        body: &str,
    ) -> EngineResult<()> {
        self.check_running()?;

        info!(from = %from, to = %to, route = %route, "Loopback message sent");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(body.to_string());
        }
        Ok(())
    }

    async fn stop(&self) -> EngineResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Err(EngineError::Stopped);
        }
        // Dropping the senders closes every live event stream
        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            subscriptions.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::parse("alice@example.com", "").unwrap()
    }

    fn route() -> Route {
        Route::new("proxy.example.com", 5060, presence_core::Transport::Udp)
    }

    #[tokio::test]
    async fn test_subscribe_goes_active_immediately() {
        let engine = LoopbackEngine::new();
        let mut handle = engine
            .subscribe(&identity(), &route(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(matches!(
            handle.events.recv().await,
            Some(SubscriptionEvent::Started)
        ));
        assert!(matches!(
            handle.events.recv().await,
            Some(SubscriptionEvent::Active)
        ));
        assert_eq!(engine.subscription_count(), 1);
    }

    #[tokio::test]
    async fn test_end_emits_ended_and_removes() {
        let engine = LoopbackEngine::new();
        let mut handle = engine
            .subscribe(&identity(), &route(), Duration::from_secs(5))
            .await
            .unwrap();
        handle.events.recv().await;
        handle.events.recv().await;

        engine.end(handle.id, Duration::from_secs(1)).await.unwrap();
        assert!(matches!(
            handle.events.recv().await,
            Some(SubscriptionEvent::Ended)
        ));
        assert_eq!(engine.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_stopped_engine_rejects_everything() {
        let engine = LoopbackEngine::new();
        engine.stop().await.unwrap();

        assert!(matches!(
            engine
                .subscribe(&identity(), &route(), Duration::from_secs(5))
                .await,
            Err(EngineError::Stopped)
        ));
        assert!(matches!(
            engine
                .send_message(&identity(), "all", &route(), "{}")
                .await,
            Err(EngineError::Stopped)
        ));
    }
}
