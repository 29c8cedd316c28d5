//! Control surface for streamed metadata searches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::error::{ClientError, ClientResult};
use super::request::SearchOptions;
use super::session::{self, CancelScope, SessionWriter};
use super::state::SearchState;
use super::transport::SearchTransport;

/// The in-flight search: its cancellation scope and read-loop task.
struct ActiveSession {
    scope: CancelScope,
    task: JoinHandle<()>,
}

impl ActiveSession {
    fn cancel(self) {
        self.scope.cancel();
        self.task.abort();
    }
}

/// Runs one metadata search at a time and publishes its state.
///
/// Every state change replaces the published [`SearchState`] snapshot;
/// [`subscribe`](Self::subscribe) is notified on each. Dropping the client
/// cancels any search still running.
pub struct SearchStreamClient<T: SearchTransport> {
    transport: Arc<T>,
    options: SearchOptions,
    runtime: Handle,
    state: Arc<watch::Sender<Arc<SearchState>>>,
    epoch: Arc<AtomicU64>,
    active: Mutex<Option<ActiveSession>>,
}

impl<T: SearchTransport> SearchStreamClient<T> {
    /// Create a client on the current tokio runtime.
    pub fn new(transport: T, options: SearchOptions) -> ClientResult<Self> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        Ok(Self::with_runtime(transport, options, runtime))
    }

    /// Create a client that spawns its read loops on `runtime`.
    pub fn with_runtime(transport: T, options: SearchOptions, runtime: Handle) -> Self {
        let (state, _) = watch::channel(Arc::new(SearchState::default()));
        Self {
            transport: Arc::new(transport),
            options,
            runtime,
            state: Arc::new(state),
            epoch: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<SearchState> {
        Arc::clone(&self.state.borrow())
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SearchState>> {
        self.state.subscribe()
    }

    /// Wait until no search is running and return that state.
    pub async fn finished(&self) -> Arc<SearchState> {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| !state.is_searching).await {
            Ok(state) => Arc::clone(&state),
            Err(_) => self.state(),
        }
    }

    /// Start a new search, cancelling any search in flight.
    ///
    /// `query` overrides the configured query. A blank effective query does
    /// nothing and returns `false`. Otherwise the state is reset and marked
    /// as searching before this returns, and the stream is opened in the
    /// background.
    pub fn start_search(&self, query: Option<&str>) -> bool {
        let Some(request) = self.options.request(query) else {
            tracing::debug!("ignoring blank search query");
            return false;
        };

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.take() {
            previous.cancel();
        }

        let session_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(Arc::new(SearchState::started(
            &request.query,
            &request.locale,
        )));

        tracing::info!(
            query = %request.query,
            locale = %request.locale,
            request_id = %request.request_id,
            "starting metadata search"
        );

        let (scope, token) = CancelScope::new();
        let writer = SessionWriter::new(
            Arc::clone(&self.state),
            Arc::clone(&self.epoch),
            session_epoch,
        );
        let transport = Arc::clone(&self.transport);
        let request_id = request.request_id.clone();

        let task = self.runtime.spawn(async move {
            let end = session::run(transport, request, writer, token).await;
            tracing::info!(request_id = %request_id, outcome = ?end, "metadata search finished");
        });

        *active = Some(ActiveSession { scope, task });
        true
    }

    /// Cancel the running search, if any. Always leaves `is_searching`
    /// false; other fields, including partial results, are kept.
    pub fn cancel_search(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(session) = active.take() {
            tracing::debug!("cancelling metadata search");
            session.cancel();
        }
        self.state.send_if_modified(|state| {
            if !state.is_searching {
                return false;
            }
            Arc::make_mut(state).is_searching = false;
            true
        });
    }

    /// Return to the empty baseline. Does not cancel a running search.
    pub fn reset(&self) {
        self.state.send_replace(Arc::new(SearchState::default()));
    }
}

impl<T: SearchTransport> Drop for SearchStreamClient<T> {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let active = self.active.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = active.take() {
            session.cancel();
        }
    }
}
