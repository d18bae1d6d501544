use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::{
    error::{WorkerError, WorkerResult},
    models::MovieRecord,
    reconcile::Reconciler,
    store::ObjectStore,
};

/// Runs one bounded fetch-and-process cycle over the document store.
pub struct BatchHandler<S> {
    store: S,
    reconciler: Reconciler,
    limit: usize,
}

impl<S: ObjectStore> BatchHandler<S> {
    pub fn new(store: S, db: DatabaseConnection, limit: usize) -> Self {
        Self { store, reconciler: Reconciler::new(db), limit }
    }

    /// Lists up to `limit` documents, validates each, reconciles the
    /// valid ones, and deletes a source document only after its
    /// reconciliation has committed. Returns how many documents made it
    /// through the whole pipeline.
    ///
    /// Malformed documents can never become valid, so they are deleted
    /// on sight. A reconciliation failure keeps its document in the
    /// store for the next cycle and does not halt the rest of the
    /// batch. Store failures abort the batch.
    pub async fn run_batch(&self) -> WorkerResult<usize> {
        let keys = self.store.list(self.limit).await?;

        let mut updates: Vec<(String, MovieRecord)> = Vec::new();
        for key in keys {
            let body = self.store.fetch(&key).await?;
            match MovieRecord::from_slice(&body) {
                Ok(update) => updates.push((key, update)),
                Err(err) => {
                    error!(key = %key, error = %err, "deleting invalid document");
                    self.store.delete(&key).await?;
                },
            }
        }

        if updates.is_empty() {
            return Ok(0);
        }

        let mut processed = 0;
        for (key, update) in updates {
            match self.reconciler.reconcile(&update).await {
                Ok(record) => {
                    info!(key = %key, movie_id = record.id, "deleting processed document");
                    self.store.delete(&key).await?;
                    processed += 1;
                },
                Err(err) => {
                    warn!(key = %key, error = %err, "reconciliation failed, keeping document for retry");
                },
            }
        }

        Ok(processed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Requests a graceful stop of the manager that issued it. Safe to call
/// from a signal handler task; the request takes effect at the next
/// loop-iteration or sleep-tick boundary.
#[derive(Clone)]
pub struct StopHandle {
    state: Arc<Mutex<ManagerState>>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        let mut state = self.state.lock().expect("manager state lock poisoned");
        if *state == ManagerState::Running {
            *state = ManagerState::Stopping;
        }
    }
}

/// Drives repeated batches through the handler, sleeping between idle
/// cycles. One manager runs at most one batch at a time; a second
/// concurrent `run` is rejected rather than queued.
pub struct WorkerManager<S> {
    handler: BatchHandler<S>,
    idle_sleep: Duration,
    state: Arc<Mutex<ManagerState>>,
}

impl<S: ObjectStore> WorkerManager<S> {
    pub fn new(handler: BatchHandler<S>, idle_sleep: Duration) -> Self {
        Self { handler, idle_sleep, state: Arc::new(Mutex::new(ManagerState::Idle)) }
    }

    pub fn state(&self) -> ManagerState {
        *self.state.lock().expect("manager state lock poisoned")
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { state: Arc::clone(&self.state) }
    }

    /// Runs the polling loop until a stop is requested. An in-flight
    /// batch always completes before a stop takes effect.
    pub async fn run(&self) -> WorkerResult<()> {
        {
            let mut state = self.state.lock().expect("manager state lock poisoned");
            match *state {
                ManagerState::Running | ManagerState::Stopping => {
                    return Err(WorkerError::AlreadyRunning);
                },
                ManagerState::Idle | ManagerState::Stopped => *state = ManagerState::Running,
            }
        }

        while self.state() == ManagerState::Running {
            let processed = match self.handler.run_batch().await {
                Ok(count) => count,
                Err(err) => {
                    // Undeleted documents stay in the store, so the
                    // next cycle retries them.
                    warn!(error = %err, "batch aborted");
                    0
                },
            };

            info!(processed, "parsed movie updates");

            if processed == 0 {
                self.idle_sleep().await;
            }
        }

        {
            let mut state = self.state.lock().expect("manager state lock poisoned");
            *state = ManagerState::Stopped;
        }
        info!("manager stopped");

        Ok(())
    }

    /// Sleeps out the idle interval in one-second ticks, re-checking
    /// the stop flag at each tick so shutdown latency stays bounded.
    async fn idle_sleep(&self) {
        let seconds = self.idle_sleep.as_secs();
        info!(seconds, "no updates, sleeping");
        for _ in 0..seconds {
            if self.state() != ManagerState::Running {
                return;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}
