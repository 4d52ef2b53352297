//! Terminal input worker
//!
//! Blocking stdin reads on a dedicated blocking task. Ctrl-D starts
//! shutdown, Enter reloads the roster from the database, everything else
//! is forwarded as a raw input event.

use std::io::Read;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::orchestrator::LoopEvent;

/// Ctrl-D (end of transmission)
const CTRL_D: u8 = 0x04;

/// Spawn the blocking stdin reader. The task exits after sending
/// `Shutdown` (on Ctrl-D or EOF) or once the loop side hangs up.
pub fn spawn_input_worker(tx: mpsc::Sender<LoopEvent>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut stdin = std::io::stdin();
        let mut buf = [0u8; 1024];

        loop {
            let n = match stdin.read(&mut buf) {
                Ok(0) => {
                    debug!("stdin closed, shutting down");
                    let _ = tx.blocking_send(LoopEvent::Shutdown);
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    debug!(error = %e, "stdin read failed, shutting down");
                    let _ = tx.blocking_send(LoopEvent::Shutdown);
                    return;
                }
            };

            for &byte in &buf[..n] {
                let event = match byte {
                    CTRL_D => {
                        let _ = tx.blocking_send(LoopEvent::Shutdown);
                        return;
                    }
                    b'\n' | b'\r' => LoopEvent::Reload,
                    other => LoopEvent::Input(other as char),
                };
                if tx.blocking_send(event).is_err() {
                    return;
                }
            }
        }
    })
}
