//! Database worker
//!
//! Owns the roster repository and serializes all database access behind a
//! command channel. Load results flow back into the event loop; write
//! failures are logged and dropped (best-effort, per-identity).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use presence_core::RosterRepository;

use crate::orchestrator::LoopEvent;

/// Buffer size for the database command channel
pub const DB_COMMAND_BUFFER: usize = 64;

/// Commands the orchestrator sends to the database worker
#[derive(Debug)]
pub enum DbCommand {
    /// Load the roster and reply with `RosterLoaded`/`RosterLoadFailed`
    LoadRoster,
    /// Upsert an identity's last-known status into the write column
    WriteStatus { identity: String, status: String },
    /// Close the repository and exit the worker
    Close,
}

/// Spawn the database worker task.
pub fn spawn_db_worker(
    repository: Arc<dyn RosterRepository>,
    mut commands: mpsc::Receiver<DbCommand>,
    events: mpsc::Sender<LoopEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            match command {
                DbCommand::LoadRoster => {
                    let event = match repository.load_identities().await {
                        Ok(identities) => LoopEvent::RosterLoaded(identities),
                        Err(e) => LoopEvent::RosterLoadFailed(e.to_string()),
                    };
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                DbCommand::WriteStatus { identity, status } => {
                    if let Err(e) = repository.write_status(&identity, &status).await {
                        warn!(identity = %identity, error = %e, "Status write failed");
                    }
                }
                DbCommand::Close => break,
            }
        }

        repository.close().await;
        debug!("Database worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Mutex;

    use presence_core::{DomainError, RepoResult};

    #[derive(Default)]
    struct FakeRoster {
        identities: Vec<String>,
        fail_load: bool,
        writes: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl RosterRepository for FakeRoster {
        async fn load_identities(&self) -> RepoResult<Vec<String>> {
            if self.fail_load {
                Err(DomainError::DatabaseError("connection refused".to_string()))
            } else {
                Ok(self.identities.clone())
            }
        }

        async fn write_status(&self, identity: &str, status: &str) -> RepoResult<()> {
            self.writes
                .lock()
                .unwrap()
                .push((identity.to_string(), status.to_string()));
            Ok(())
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_load_roster_replies_with_identities() {
        let repo = Arc::new(FakeRoster {
            identities: vec!["alice".to_string(), "bob".to_string()],
            ..FakeRoster::default()
        });
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);

        let worker = spawn_db_worker(repo, cmd_rx, event_tx);
        cmd_tx.send(DbCommand::LoadRoster).await.unwrap();

        match event_rx.recv().await.unwrap() {
            LoopEvent::RosterLoaded(ids) => assert_eq!(ids, vec!["alice", "bob"]),
            other => panic!("unexpected event: {other:?}"),
        }

        cmd_tx.send(DbCommand::Close).await.unwrap();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_load_failure_is_reported_not_fatal_to_worker() {
        let repo = Arc::new(FakeRoster {
            fail_load: true,
            ..FakeRoster::default()
        });
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);

        let worker = spawn_db_worker(repo, cmd_rx, event_tx);
        cmd_tx.send(DbCommand::LoadRoster).await.unwrap();

        assert!(matches!(
            event_rx.recv().await.unwrap(),
            LoopEvent::RosterLoadFailed(_)
        ));

        // Worker keeps serving after a failed load
        cmd_tx
            .send(DbCommand::WriteStatus {
                identity: "alice".to_string(),
                status: "busy".to_string(),
            })
            .await
            .unwrap();
        cmd_tx.send(DbCommand::Close).await.unwrap();
        worker.await.unwrap();
    }
}
