//! Debounced refresh loop.
//!
//! A single task owns the [`AppState`]. Control changes arrive as triggers,
//! are debounced, and start a fetch tagged with a monotonically increasing
//! refresh id. A response is only applied if no newer refresh has been
//! started since, so a slow response can never overwrite newer data.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::client::{QueryParams, UsgsClient};
use crate::errors::QuakeviewError;
use crate::models::Feature;
use crate::state::{AppState, SortBy};

/// Quiet period after the last control change before a fetch starts.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Anything that can produce events for a set of query controls.
pub trait QuakeSource: Send + Sync + 'static {
    fn fetch_events(
        &self,
        params: QueryParams,
    ) -> impl Future<Output = Result<Vec<Feature>, QuakeviewError>> + Send;
}

impl QuakeSource for UsgsClient {
    fn fetch_events(
        &self,
        params: QueryParams,
    ) -> impl Future<Output = Result<Vec<Feature>, QuakeviewError>> + Send {
        self.fetch(params)
    }
}

#[derive(Debug)]
enum Trigger {
    Debounced(QueryParams),
    Immediate(QueryParams),
    ToggleSort,
}

/// Handle for driving a running [`Refresher`].
///
/// Dropping every handle stops the refresh loop.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    triggers: mpsc::UnboundedSender<Trigger>,
    snapshots: watch::Receiver<AppState>,
}

impl RefreshHandle {
    /// Request a debounced refresh with new controls.
    ///
    /// Returns `false` if the refresh loop has stopped.
    pub fn request(&self, params: QueryParams) -> bool {
        self.triggers.send(Trigger::Debounced(params)).is_ok()
    }

    /// Refresh immediately, dropping any pending debounced request.
    pub fn refresh_now(&self, params: QueryParams) -> bool {
        self.triggers.send(Trigger::Immediate(params)).is_ok()
    }

    /// Flip the list ordering.
    pub fn toggle_sort(&self) -> bool {
        self.triggers.send(Trigger::ToggleSort).is_ok()
    }

    /// Receiver of state snapshots, published after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.snapshots.clone()
    }
}

struct Completed {
    id: u64,
    params: QueryParams,
    result: Result<Vec<Feature>, QuakeviewError>,
}

enum Step {
    Trigger(Trigger),
    DebounceElapsed,
    Completed(Result<Completed, JoinError>),
    Shutdown,
}

/// Owner of the application state and the in-flight fetches.
pub struct Refresher<S> {
    source: Arc<S>,
    state: AppState,
    latest_id: u64,
    pending: Option<(QueryParams, Instant)>,
    inflight: JoinSet<Completed>,
    snapshots: watch::Sender<AppState>,
}

impl<S: QuakeSource> Refresher<S> {
    /// Start the refresh loop. The first fetch runs immediately.
    pub fn spawn(source: S, initial: QueryParams, sort_by: SortBy) -> (RefreshHandle, JoinHandle<()>) {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let state = AppState::new(initial, sort_by);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.clone());

        let refresher = Self {
            source: Arc::new(source),
            state,
            latest_id: 0,
            pending: None,
            inflight: JoinSet::new(),
            snapshots: snapshot_tx,
        };

        let task = tokio::spawn(refresher.run(trigger_rx, initial));
        let handle = RefreshHandle {
            triggers: trigger_tx,
            snapshots: snapshot_rx,
        };
        (handle, task)
    }

    async fn run(mut self, mut triggers: mpsc::UnboundedReceiver<Trigger>, initial: QueryParams) {
        self.start_fetch(initial);

        loop {
            let deadline = self.pending.map(|(_, at)| at);
            let step = tokio::select! {
                trigger = triggers.recv() => trigger.map_or(Step::Shutdown, Step::Trigger),
                () = wait_for(deadline) => Step::DebounceElapsed,
                Some(joined) = self.inflight.join_next() => Step::Completed(joined),
            };

            match step {
                Step::Trigger(Trigger::Debounced(params)) => {
                    self.pending = Some((params, Instant::now() + DEBOUNCE));
                }
                Step::Trigger(Trigger::Immediate(params)) => {
                    self.pending = None;
                    self.start_fetch(params);
                }
                Step::Trigger(Trigger::ToggleSort) => {
                    self.state.toggle_sort();
                    debug!("sorting by {}", self.state.sort_by.as_str());
                    self.publish();
                }
                Step::DebounceElapsed => {
                    if let Some((params, _)) = self.pending.take() {
                        self.start_fetch(params);
                    }
                }
                Step::Completed(Ok(done)) => self.complete(done),
                Step::Completed(Err(e)) => warn!("fetch task failed: {e}"),
                Step::Shutdown => break,
            }
        }

        debug!("refresh loop stopped");
    }

    fn start_fetch(&mut self, params: QueryParams) {
        self.latest_id += 1;
        let id = self.latest_id;
        info!(
            "refresh #{id}: last {} days, magnitude >= {}",
            params.days, params.min_magnitude
        );

        let source = Arc::clone(&self.source);
        self.inflight.spawn(async move {
            let result = source.fetch_events(params).await;
            Completed { id, params, result }
        });
    }

    fn complete(&mut self, done: Completed) {
        if done.id < self.latest_id {
            debug!(
                "discarding stale response for refresh #{} (latest #{})",
                done.id, self.latest_id
            );
            return;
        }

        if let Err(e) = &done.result {
            warn!("refresh #{} failed: {e}", done.id);
        }
        self.state.apply(done.id, done.params, done.result, Utc::now());
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
