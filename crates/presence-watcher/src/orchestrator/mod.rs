//! The orchestrator: single-writer event loop over all watcher state
//!
//! Every mutation of the pending queue, the subscription map, and the
//! aggregate snapshot happens inside `Orchestrator::run`, in response to
//! one `LoopEvent` at a time. Collaborator I/O (route resolution,
//! subscribe requests, termination, the database) runs in spawned tasks
//! that report back through the loop's channel, so no locks guard the
//! orchestrator state.

mod aggregator;
mod broadcaster;
mod queue;
mod subscription;

pub use aggregator::{PresenceAggregator, PresenceRecord};
pub use broadcaster::{ChangeBroadcaster, StatusUpdateEnvelope};
pub use queue::SubscriptionQueue;
pub use subscription::{Subscription, SubscriptionState};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use presence_common::{AppError, TimeoutConfig};
use presence_core::{
    Identity, PresenceDocument, ProtocolEngine, ResolveError, ResolveTarget, Route, RouteList,
    RouteResolver, SubscriptionEvent, SubscriptionId, Transport,
};

use crate::workers::DbCommand;

/// Buffer size for the orchestrator's event channel
const EVENT_BUFFER: usize = 256;

/// Everything the event loop reacts to
#[derive(Debug)]
pub enum LoopEvent {
    /// A batch of raw identity strings to subscribe to
    Enqueue(Vec<String>),
    /// The database worker delivered the roster
    RosterLoaded(Vec<String>),
    /// The database worker could not load the roster
    RosterLoadFailed(String),
    /// Route resolution for the pending batch succeeded
    RoutesResolved(Vec<Route>),
    /// Route resolution for the pending batch failed
    ResolveFailed(String),
    /// The randomized backoff elapsed, try resolving again
    ResolveRetry,
    /// A subscribe request was accepted by the engine
    Subscribed {
        identity: Identity,
        id: SubscriptionId,
    },
    /// A lifecycle event for one identity's subscription
    Subscription {
        identity: Identity,
        event: SubscriptionEvent,
    },
    /// Reload the roster from the database
    Reload,
    /// A raw input character, forwarded for any other observer
    Input(char),
    /// Begin shutdown sequencing
    Shutdown,
    /// The protocol engine finished stopping
    EngineStopped,
}

/// The subscription lifecycle orchestrator
pub struct Orchestrator {
    engine: Arc<dyn ProtocolEngine>,
    resolver: Arc<dyn RouteResolver>,
    account: Identity,
    resolve_target: ResolveTarget,
    transports: Vec<Transport>,
    timeouts: TimeoutConfig,

    queue: SubscriptionQueue,
    subscriptions: HashMap<Identity, Subscription>,
    aggregator: PresenceAggregator,
    broadcaster: ChangeBroadcaster,
    /// The last route a subscription was seen alive on; outbound path for
    /// broadcasts
    last_route: Option<Route>,

    db_tx: mpsc::Sender<DbCommand>,
    write_back: bool,

    events_tx: mpsc::Sender<LoopEvent>,
    events_rx: mpsc::Receiver<LoopEvent>,

    roster_loaded: bool,
    stopping: bool,
    engine_stop_requested: bool,
    engine_stopped: bool,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Arc<dyn ProtocolEngine>,
        resolver: Arc<dyn RouteResolver>,
        account: Identity,
        resolve_target: ResolveTarget,
        transports: Vec<Transport>,
        timeouts: TimeoutConfig,
        db_tx: mpsc::Sender<DbCommand>,
        write_back: bool,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let broadcaster = ChangeBroadcaster::new(engine.clone(), account.clone());

        Self {
            engine,
            resolver,
            account,
            resolve_target,
            transports,
            timeouts,
            queue: SubscriptionQueue::new(),
            subscriptions: HashMap::new(),
            aggregator: PresenceAggregator::new(),
            broadcaster,
            last_route: None,
            db_tx,
            write_back,
            events_tx,
            events_rx,
            roster_loaded: false,
            stopping: false,
            engine_stop_requested: false,
            engine_stopped: false,
        }
    }

    /// A sender for feeding events into the loop (input worker, database
    /// worker, tests)
    pub fn sender(&self) -> mpsc::Sender<LoopEvent> {
        self.events_tx.clone()
    }

    /// Run the event loop until shutdown completes.
    ///
    /// Returns an error only for startup failures (the initial roster
    /// load); everything after that is logged and scoped.
    pub async fn run(&mut self) -> Result<(), AppError> {
        info!(account = %self.account, target = %self.resolve_target, "Presence watcher started");

        self.db_tx
            .send(DbCommand::LoadRoster)
            .await
            .map_err(|_| AppError::DatabaseConnection("database worker unavailable".to_string()))?;

        while let Some(event) = self.events_rx.recv().await {
            self.dispatch(event).await?;

            if self.engine_stopped {
                break;
            }
            if self.stopping && self.subscriptions.is_empty() && !self.engine_stop_requested {
                // Every controller reached Ended and no engine stop is in
                // flight; stop it ourselves below
                break;
            }
        }

        if !self.engine_stopped {
            if let Err(e) = self.engine.stop().await {
                debug!(error = %e, "Engine stop reported an error");
            }
        }
        let _ = self.db_tx.send(DbCommand::Close).await;

        info!("Presence watcher stopped");
        Ok(())
    }

    async fn dispatch(&mut self, event: LoopEvent) -> Result<(), AppError> {
        match event {
            LoopEvent::Enqueue(batch) => self.handle_enqueue(batch),
            LoopEvent::RosterLoaded(batch) => {
                info!(count = batch.len(), "Roster loaded from database");
                self.roster_loaded = true;
                self.handle_enqueue(batch);
            }
            LoopEvent::RosterLoadFailed(error) => {
                if self.roster_loaded {
                    warn!(error = %error, "Roster reload failed, keeping current roster");
                } else {
                    return Err(AppError::DatabaseConnection(error));
                }
            }
            LoopEvent::RoutesResolved(routes) => self.handle_routes_resolved(routes),
            LoopEvent::ResolveFailed(error) => self.handle_resolve_failed(&error),
            LoopEvent::ResolveRetry => self.handle_resolve_retry(),
            LoopEvent::Subscribed { identity, id } => {
                if let Some(sub) = self.subscriptions.get_mut(&identity) {
                    sub.engine_id = Some(id);
                }
            }
            LoopEvent::Subscription { identity, event } => {
                self.handle_subscription_event(identity, event).await;
            }
            LoopEvent::Reload => {
                if !self.stopping {
                    info!("Reloading roster from database");
                    if self.db_tx.send(DbCommand::LoadRoster).await.is_err() {
                        warn!("Database worker unavailable, reload skipped");
                    }
                }
            }
            LoopEvent::Input(c) => {
                // Forwarded for any other observer; the loop itself only
                // reacts to the reload and shutdown control characters
                debug!(input = ?c, "Input received");
            }
            LoopEvent::Shutdown => self.handle_shutdown().await,
            LoopEvent::EngineStopped => {
                info!("Protocol engine stopped");
                self.engine_stopped = true;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Queue management and route resolution
    // ========================================================================

    fn handle_enqueue(&mut self, batch: Vec<String>) {
        if self.stopping {
            return;
        }

        let subscriptions = &self.subscriptions;
        let added = self.queue.enqueue(&batch, self.account.domain(), |identity| {
            subscriptions.contains_key(identity)
        });

        if added > 0 {
            debug!(
                added,
                pending = self.queue.pending_count(),
                "Identities queued for subscription"
            );
        }

        if self.queue.has_pending() && !self.queue.is_resolving() {
            self.start_resolution();
        }
    }

    fn start_resolution(&mut self) {
        self.queue.set_resolving(true);

        let resolver = self.resolver.clone();
        let target = self.resolve_target.clone();
        let transports = self.transports.clone();
        let tx = self.events_tx.clone();

        info!(target = %target, "Resolving routes");
        tokio::spawn(async move {
            let event = match resolver.resolve(&target, &transports).await {
                Ok(routes) if routes.is_empty() => {
                    LoopEvent::ResolveFailed(ResolveError::NoRoutes.to_string())
                }
                Ok(routes) => LoopEvent::RoutesResolved(routes),
                Err(e) => LoopEvent::ResolveFailed(e.to_string()),
            };
            let _ = tx.send(event).await;
        });
    }

    fn handle_resolve_failed(&mut self, error: &str) {
        warn!(error = %error, "Route resolution failed");
        if self.stopping {
            self.queue.set_resolving(false);
            return;
        }

        let delay = Duration::from_secs_f64(rand::thread_rng().gen_range(1.0..2.0));
        debug!(delay_ms = delay.as_millis() as u64, "Retrying resolution after backoff");

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(LoopEvent::ResolveRetry).await;
        });
    }

    fn handle_resolve_retry(&mut self) {
        if self.stopping || !self.queue.has_pending() {
            self.queue.set_resolving(false);
            return;
        }
        self.start_resolution();
    }

    fn handle_routes_resolved(&mut self, routes: Vec<Route>) {
        if let Some(first) = routes.first() {
            info!(count = routes.len(), first = %first, "Routes resolved");
        }

        let pending = self.queue.take_pending();
        if self.stopping {
            return;
        }

        for (identity, source) in pending {
            // Every identity gets its own copy of the batch's routes, so
            // failover is independent per identity
            let list = RouteList::new(routes.clone());
            let Some(route) = list.current().cloned() else {
                warn!(identity = %identity, "Resolution produced no routes");
                continue;
            };

            info!(identity = %identity, route = %route, "Starting subscription");
            self.subscriptions
                .insert(identity.clone(), Subscription::new(identity.clone(), source, list));
            self.spawn_subscribe(identity, route);
        }
    }

    fn spawn_subscribe(&self, identity: Identity, route: Route) {
        let engine = self.engine.clone();
        let tx = self.events_tx.clone();
        let timeout = self.timeouts.subscribe();

        tokio::spawn(async move {
            match engine.subscribe(&identity, &route, timeout).await {
                Ok(mut handle) => {
                    let _ = tx
                        .send(LoopEvent::Subscribed {
                            identity: identity.clone(),
                            id: handle.id,
                        })
                        .await;

                    // Forward the subscription's events into the loop in
                    // arrival order
                    while let Some(event) = handle.events.recv().await {
                        let forwarded = LoopEvent::Subscription {
                            identity: identity.clone(),
                            event,
                        };
                        if tx.send(forwarded).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    let failed = LoopEvent::Subscription {
                        identity,
                        event: SubscriptionEvent::Failed {
                            reason: e.to_string(),
                        },
                    };
                    let _ = tx.send(failed).await;
                }
            }
        });
    }

    // ========================================================================
    // Subscription lifecycle
    // ========================================================================

    async fn handle_subscription_event(&mut self, identity: Identity, event: SubscriptionEvent) {
        if !self.subscriptions.contains_key(&identity) {
            debug!(
                identity = %identity,
                event = event.event_type(),
                "Event for unknown subscription, ignoring"
            );
            return;
        }

        match event {
            SubscriptionEvent::Started => self.note_progress(&identity, None, "succeeded"),
            SubscriptionEvent::Pending => {
                self.note_progress(&identity, Some(SubscriptionState::Pending), "pending");
            }
            SubscriptionEvent::Active => {
                self.note_progress(&identity, Some(SubscriptionState::Active), "active");
            }
            SubscriptionEvent::Notify { body } => self.handle_notify(&identity, &body).await,
            SubscriptionEvent::Failed { reason } => self.handle_failed(identity, &reason).await,
            SubscriptionEvent::Ended => {
                info!(identity = %identity, "Unsubscribed");
                self.finish_subscription(&identity).await;
            }
        }
    }

    /// Record a lifecycle progress event: update the state (where the
    /// transition is valid), the status line, and the last active route.
    fn note_progress(
        &mut self,
        identity: &Identity,
        new_state: Option<SubscriptionState>,
        label: &str,
    ) {
        let route = {
            let Some(sub) = self.subscriptions.get_mut(identity) else {
                return;
            };
            if let Some(state) = new_state {
                if !matches!(sub.state, SubscriptionState::Ending | SubscriptionState::Ended) {
                    sub.state = state;
                }
            }
            sub.current_route().cloned()
        };

        if let Some(route) = route {
            info!(identity = %identity, route = %route, "Subscription {label}");
            self.last_route = Some(route);
        }
    }

    async fn handle_notify(&mut self, identity: &Identity, body: &str) {
        let route = match self.subscriptions.get(identity) {
            Some(sub) if sub.state.accepts_notifies() => sub.current_route().cloned(),
            Some(sub) => {
                debug!(identity = %identity, state = %sub.state, "Notify outside pending/active, dropping");
                return;
            }
            None => return,
        };
        if route.is_some() {
            self.last_route = route;
        }

        let document = match PresenceDocument::parse(body) {
            Ok(document) => document,
            Err(e) => {
                warn!(identity = %identity, error = %e, "Got malformed presence document, dropping");
                return;
            }
        };

        if self.aggregator.fold(identity, &document) {
            self.write_status_back(identity);
            self.broadcaster
                .maybe_broadcast(&mut self.aggregator, self.last_route.as_ref())
                .await;
        }
    }

    async fn handle_failed(&mut self, identity: Identity, reason: &str) {
        let next = {
            let Some(sub) = self.subscriptions.get_mut(&identity) else {
                return;
            };
            match sub.state {
                SubscriptionState::Subscribing => {
                    warn!(identity = %identity, reason = %reason, "Subscribe failed");
                    let next = sub.fail_over().cloned();
                    if next.is_none() {
                        warn!(
                            identity = %identity,
                            attempts = sub.attempts,
                            "All routes exhausted, identity unreachable"
                        );
                    }
                    next
                }
                SubscriptionState::Ending => {
                    // Termination timed out; treated as ended regardless
                    debug!(identity = %identity, reason = %reason, "End request failed, treating as ended");
                    None
                }
                _ => {
                    warn!(identity = %identity, reason = %reason, "Subscription failed");
                    None
                }
            }
        };

        match next {
            Some(route) => {
                info!(identity = %identity, route = %route, "Trying next route");
                self.spawn_subscribe(identity, route);
            }
            None => self.finish_subscription(&identity).await,
        }
    }

    /// Terminal handling: drop the subscription, remove its record from
    /// the aggregate, and rebroadcast if the snapshot changed.
    async fn finish_subscription(&mut self, identity: &Identity) {
        if let Some(mut sub) = self.subscriptions.remove(identity) {
            sub.state = SubscriptionState::Ended;
            debug!(identity = %identity, attempts = sub.attempts, "Subscription ended");
        }

        if self.aggregator.remove(identity) {
            self.broadcaster
                .maybe_broadcast(&mut self.aggregator, self.last_route.as_ref())
                .await;
        }

        if self.stopping {
            debug!(remaining = self.subscriptions.len(), "Waiting for remaining subscriptions");
        }
    }

    fn write_status_back(&self, identity: &Identity) {
        if !self.write_back {
            return;
        }
        let Some(sub) = self.subscriptions.get(identity) else {
            return;
        };
        let Some(status) = self.aggregator.status_of(identity) else {
            return;
        };

        let command = DbCommand::WriteStatus {
            identity: sub.source.clone(),
            status: status.to_string(),
        };
        if self.db_tx.try_send(command).is_err() {
            warn!(identity = %identity, "Database worker backlogged, dropping status write");
        }
    }

    // ========================================================================
    // Shutdown sequencing
    // ========================================================================

    async fn handle_shutdown(&mut self) {
        if self.stopping {
            return;
        }
        info!("Shutdown requested");
        self.stopping = true;

        let mut already_stoppable = Vec::new();
        let mut terminations = 0usize;

        for (identity, sub) in &mut self.subscriptions {
            if sub.state.needs_termination() {
                if let Some(id) = sub.engine_id {
                    sub.state = SubscriptionState::Ending;
                    terminations += 1;

                    let engine = self.engine.clone();
                    let tx = self.events_tx.clone();
                    let timeout = self.timeouts.end();
                    let identity = identity.clone();
                    tokio::spawn(async move {
                        if let Err(e) = engine.end(id, timeout).await {
                            warn!(identity = %identity, error = %e, "End request failed, treating as ended");
                            let ended = LoopEvent::Subscription {
                                identity,
                                event: SubscriptionEvent::Ended,
                            };
                            let _ = tx.send(ended).await;
                        }
                    });
                } else {
                    already_stoppable.push(identity.clone());
                }
            } else if !sub.state.is_terminal() {
                already_stoppable.push(identity.clone());
            }
        }

        for identity in already_stoppable {
            self.finish_subscription(&identity).await;
        }

        if terminations == 0 {
            // Nothing needs protocol-level teardown, stop the engine directly
            self.spawn_engine_stop();
        } else {
            debug!(terminations, "Waiting for subscriptions to end");
        }
    }

    fn spawn_engine_stop(&mut self) {
        if self.engine_stop_requested {
            return;
        }
        self.engine_stop_requested = true;

        let engine = self.engine.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.stop().await {
                debug!(error = %e, "Engine stop reported an error");
            }
            let _ = tx.send(LoopEvent::EngineStopped).await;
        });
    }
}
