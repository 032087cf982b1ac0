// Periodic data coordinator
// Runs an async update function on an interval and caches its last result

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

/// Uniform failure signal of an update function
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct UpdateFailed(pub String);

/// Update function driven by a coordinator
pub type UpdateFn<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, UpdateFailed>> + Send + Sync>;

/// Snapshot of what a coordinator knows
#[derive(Debug, Clone)]
pub struct CoordinatorState<T> {
    /// Last successfully fetched data; kept (stale) after failures
    pub data: Option<T>,
    pub last_update_success: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl<T> Default for CoordinatorState<T> {
    fn default() -> Self {
        Self {
            data: None,
            last_update_success: false,
            last_updated: None,
            last_error: None,
        }
    }
}

struct Inner<T> {
    name: String,
    update: UpdateFn<T>,
    state: RwLock<CoordinatorState<T>>,
    /// Bumped after every refresh so subscribers can react
    generation: watch::Sender<u64>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Periodic poller with cached state
pub struct Coordinator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Coordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Coordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, update: UpdateFn<T>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                update,
                state: RwLock::new(CoordinatorState::default()),
                generation,
                task: std::sync::Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Run the update function once and record the outcome
    pub async fn refresh(&self) {
        let result = (self.inner.update)().await;
        let now = Utc::now();

        {
            let mut state = self.inner.state.write().await;
            state.last_updated = Some(now);
            match result {
                Ok(data) => {
                    tracing::debug!(coordinator = %self.inner.name, "Update succeeded");
                    state.data = Some(data);
                    state.last_update_success = true;
                    state.last_error = None;
                }
                Err(e) => {
                    tracing::warn!(coordinator = %self.inner.name, error = %e, "Update failed");
                    state.last_update_success = false;
                    state.last_error = Some(e.0);
                }
            }
        }

        self.inner.generation.send_modify(|g| *g += 1);
    }

    /// Start polling every `interval`; the first refresh runs immediately
    pub fn start(&self, interval: Duration) {
        let mut task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if task.is_some() {
            tracing::debug!(coordinator = %self.inner.name, "Already running");
            return;
        }

        tracing::info!(
            coordinator = %self.inner.name,
            interval_secs = interval.as_secs(),
            "Starting coordinator"
        );

        let coordinator = self.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                coordinator.refresh().await;
            }
        }));
    }

    /// Stop polling; cached state is kept
    pub fn stop(&self) {
        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(handle) = handle {
            handle.abort();
            tracing::info!(coordinator = %self.inner.name, "Stopped coordinator");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .map(|t| t.is_some())
            .unwrap_or(false)
    }

    pub async fn snapshot(&self) -> CoordinatorState<T> {
        self.inner.state.read().await.clone()
    }

    /// Receiver notified after every refresh
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }
}
