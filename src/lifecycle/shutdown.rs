//! Shutdown coordination for the bridge.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Broadcast handle every long-running bridge task listens on: the poller,
/// zone discovery, the API server and the reload loop.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every subscriber to stop.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Trigger, then wait up to `grace` for `tasks`. Returns how many tasks
    /// were still running when the grace period ran out; those are aborted.
    pub async fn drain(&self, tasks: Vec<JoinHandle<()>>, grace: Duration) -> usize {
        self.trigger();

        let deadline = tokio::time::Instant::now() + grace;
        let mut stuck = 0;
        for mut task in tasks {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Task ended abnormally"),
                Err(_) => {
                    task.abort();
                    stuck += 1;
                }
            }
        }

        if stuck > 0 {
            tracing::warn!(stuck, grace = ?grace, "Tasks did not stop within the grace period");
        }
        stuck
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
