//! Loading / error / data tracking for one request recipe.
//!
//! A [`Resource`] owns a [`ClientScope`] and a closure that issues the request.
//! Each [`Resource::run`] publishes its progress through a `watch` channel so
//! observers can render `loading`, the last error and the last data. When runs
//! overlap, only the most recently started one updates the state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::{Client, ClientError, ClientScope, PendingRequest};

#[derive(Debug, Clone)]
pub struct FetchState<T> {
    pub loading: bool,
    pub error: Option<Arc<ClientError>>,
    /// Last successful data; kept when a later run fails.
    pub data: Option<T>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            data: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Run only when [`Resource::run`] is called.
    Manual,
    /// Run once in the background as soon as the resource is mounted.
    OnMount,
}

type Fetch<T> = dyn Fn(&Client) -> PendingRequest<T> + Send + Sync;

/// Published state plus the generation of the latest run.
struct Runs<T> {
    state: watch::Sender<FetchState<T>>,
    latest: AtomicU64,
}

pub struct Resource<T> {
    scope: ClientScope,
    fetch: Box<Fetch<T>>,
    runs: Arc<Runs<T>>,
}

impl<T> Resource<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Mounts the resource. `Trigger::OnMount` spawns the first run, so it
    /// must be called from within a Tokio runtime.
    pub fn mount<F>(scope: ClientScope, trigger: Trigger, fetch: F) -> Self
    where
        F: Fn(&Client) -> PendingRequest<T> + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(FetchState::default());
        let resource = Self {
            scope,
            fetch: Box::new(fetch),
            runs: Arc::new(Runs {
                state,
                latest: AtomicU64::new(0),
            }),
        };

        if trigger == Trigger::OnMount {
            let (generation, pending) = resource.begin();
            let runs = resource.runs.clone();
            tokio::spawn(async move {
                let _ = runs.finish(generation, pending.await);
            });
        }

        resource
    }

    /// Issues the request and returns its outcome. The outcome is recorded
    /// only if no newer run has started in the meantime.
    pub async fn run(&self) -> Result<T, Arc<ClientError>> {
        let (generation, pending) = self.begin();
        self.runs.finish(generation, pending.await)
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.runs.state.subscribe()
    }

    pub fn snapshot(&self) -> FetchState<T> {
        self.runs.state.borrow().clone()
    }

    pub fn scope(&self) -> &ClientScope {
        &self.scope
    }

    fn begin(&self) -> (u64, PendingRequest<T>) {
        let generation = self.runs.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.runs.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        (generation, (self.fetch)(self.scope.client()))
    }
}

impl<T: Clone> Runs<T> {
    fn finish(
        &self,
        generation: u64,
        outcome: Result<T, ClientError>,
    ) -> Result<T, Arc<ClientError>> {
        let outcome = outcome.map_err(Arc::new);
        self.state.send_if_modified(|s| {
            // Superseded runs leave the state alone.
            if self.latest.load(Ordering::SeqCst) != generation {
                return false;
            }
            s.loading = false;
            match &outcome {
                Ok(data) => s.data = Some(data.clone()),
                Err(err) => s.error = Some(err.clone()),
            }
            true
        });
        outcome
    }
}
