//! Debounced state persistence
//!
//! Rapid edits schedule snapshots; only the last snapshot of a quiet period is
//! written. All writes happen on one task, so a flush that arrives during a
//! write waits for it instead of racing it.

use super::{AppState, StateStore};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// Default quiet period before a scheduled save is written
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

enum Command {
    Schedule(AppState),
    Flush(oneshot::Sender<Result<()>>),
}

/// Handle to the background save task
pub struct AutoSaver {
    tx: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl AutoSaver {
    /// Start the save task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn StateStore>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(store, delay, rx));
        Self { tx, handle }
    }

    /// Replace the pending snapshot and restart the quiet period
    pub fn schedule(&self, state: AppState) {
        if self.tx.send(Command::Schedule(state)).is_err() {
            warn!("Autosave task has stopped; snapshot dropped");
        }
    }

    /// Write the pending snapshot now
    pub async fn flush(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply))
            .map_err(|_| anyhow!("Autosave task has stopped"))?;
        rx.await.context("Autosave task dropped the flush request")?
    }

    /// Write anything pending and stop the task
    pub async fn shutdown(self) -> Result<()> {
        drop(self.tx);
        self.handle.await.context("Autosave task panicked")
    }
}

async fn run(store: Arc<dyn StateStore>, delay: Duration, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut pending: Option<AppState> = None;
    let mut deadline = Instant::now();

    loop {
        let command = if pending.is_some() {
            tokio::select! {
                command = rx.recv() => command,
                _ = time::sleep_until(deadline) => {
                    if let Err(e) = write(store.as_ref(), &mut pending).await {
                        warn!("Autosave failed: {:#}", e);
                    }
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(Command::Schedule(state)) => {
                pending = Some(state);
                deadline = Instant::now() + delay;
            }
            Some(Command::Flush(reply)) => {
                let result = write(store.as_ref(), &mut pending).await;
                let _ = reply.send(result);
            }
            None => {
                if let Err(e) = write(store.as_ref(), &mut pending).await {
                    warn!("Final autosave failed: {:#}", e);
                }
                break;
            }
        }
    }
}

async fn write(store: &dyn StateStore, pending: &mut Option<AppState>) -> Result<()> {
    match pending.take() {
        Some(state) => {
            debug!("Writing coalesced state snapshot");
            store.save(&state).await
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::default_state;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        write_time: Duration,
    }

    #[async_trait]
    impl StateStore for RecordingStore {
        async fn load(&self) -> Result<AppState> {
            Ok(default_state())
        }

        async fn save(&self, state: &AppState) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            time::sleep(self.write_time).await;
            self.saved.lock().unwrap().push(state.theme.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn themed(theme: &str) -> AppState {
        let mut state = default_state();
        state.theme = theme.to_string();
        state
    }

    fn saved(store: &RecordingStore) -> Vec<String> {
        store.saved.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_rapid_edits_coalesce_to_last() {
        let store = Arc::new(RecordingStore::default());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_millis(100));

        for theme in ["a", "b", "c"] {
            saver.schedule(themed(theme));
            time::sleep(Duration::from_millis(5)).await;
        }
        time::sleep(Duration::from_millis(400)).await;

        assert_eq!(saved(&store), vec!["c"]);
        saver.shutdown().await.unwrap();
        assert_eq!(saved(&store), vec!["c"]);
    }

    #[tokio::test]
    async fn test_flush_writes_immediately() {
        let store = Arc::new(RecordingStore::default());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(60));

        saver.schedule(themed("dark"));
        saver.flush().await.unwrap();
        assert_eq!(saved(&store), vec!["dark"]);

        // nothing pending: flush is a no-op
        saver.flush().await.unwrap();
        assert_eq!(saved(&store).len(), 1);
        saver.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_writes_pending() {
        let store = Arc::new(RecordingStore::default());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(60));
        saver.schedule(themed("light"));
        saver.shutdown().await.unwrap();
        assert_eq!(saved(&store), vec!["light"]);
    }

    #[tokio::test]
    async fn test_writes_never_overlap() {
        let store = Arc::new(RecordingStore {
            write_time: Duration::from_millis(30),
            ..Default::default()
        });
        let saver = AutoSaver::spawn(store.clone(), Duration::from_millis(1));

        saver.schedule(themed("first"));
        time::sleep(Duration::from_millis(10)).await;
        // the first write is in progress; this flush must wait for it
        saver.schedule(themed("second"));
        saver.flush().await.unwrap();

        assert_eq!(saved(&store), vec!["first", "second"]);
        assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
        saver.shutdown().await.unwrap();
    }
}
