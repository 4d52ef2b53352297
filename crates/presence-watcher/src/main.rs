//! Presence watcher entry point
//!
//! Run with:
//! ```bash
//! cargo run -p presence-watcher
//! ```
//!
//! Configuration is loaded from environment variables. Enter reloads the
//! roster from the database; Ctrl-D shuts down.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use presence_common::{try_init_tracing, AppConfig, AppError};
use presence_core::{ProtocolEngine, ResolveTarget, RosterRepository, RouteResolver};
use presence_db::{create_pool, PgRosterRepository};
use presence_watcher::collaborators::{LoopbackEngine, StaticRouteResolver};
use presence_watcher::workers::{spawn_db_worker, spawn_input_worker, DB_COMMAND_BUFFER};
use presence_watcher::Orchestrator;

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the watcher
    if let Err(e) = run().await {
        error!(error = %e, "Presence watcher failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    info!("Starting presence watcher...");

    // Load configuration (fatal on failure)
    let config = AppConfig::from_env()?;
    let account = config.account.parsed_identity()?;

    info!(
        account = %account,
        table = %config.roster.table,
        "Configuration loaded"
    );

    // Connect to the database (fatal at startup)
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
    let repository: Arc<dyn RosterRepository> =
        Arc::new(PgRosterRepository::new(pool, &config.roster)?);

    // Collaborators
    let engine: Arc<dyn ProtocolEngine> = Arc::new(LoopbackEngine::new());
    let resolver: Arc<dyn RouteResolver> = Arc::new(StaticRouteResolver::new());

    // The resolution target is derived from the account configuration,
    // never per-identity: the configured outbound proxy if set, else the
    // account's own domain
    let resolve_target = match &config.account.proxy_host {
        Some(host) => ResolveTarget::proxy(
            host.clone(),
            config.account.proxy_port,
            config.account.proxy_transport,
        ),
        None => ResolveTarget::domain(account.domain()),
    };

    let (db_tx, db_rx) = mpsc::channel(DB_COMMAND_BUFFER);
    let write_back = config.roster.write_column.is_some();

    let mut orchestrator = Orchestrator::new(
        engine,
        resolver,
        account,
        resolve_target,
        config.account.transports.clone(),
        config.timeouts,
        db_tx,
        write_back,
    );

    spawn_db_worker(repository, db_rx, orchestrator.sender());
    spawn_input_worker(orchestrator.sender());

    orchestrator.run().await
}
