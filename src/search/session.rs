//! One search session: its cancellation scope, its guarded view of the
//! shared state, and the read loop that drives the stream to a terminal
//! state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use tokio::sync::watch;

use super::frame::{LineFramer, decode_line};
use super::request::SearchRequest;
use super::state::{SearchState, StreamFailure};
use super::transport::SearchTransport;

// ---------------------------------------------------------------------------
// Cancellation scope
// ---------------------------------------------------------------------------

/// Owning side of a session's cancellation signal.
#[derive(Debug)]
pub(crate) struct CancelScope {
    tx: watch::Sender<bool>,
}

impl CancelScope {
    pub(crate) fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelToken { rx })
    }

    /// Signal cancellation. Safe to call repeatedly.
    pub(crate) fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observing side, held by the read loop.
#[derive(Debug, Clone)]
pub(crate) struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Resolves once the scope is cancelled or dropped.
    pub(crate) async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

// ---------------------------------------------------------------------------
// State writer
// ---------------------------------------------------------------------------

/// Publishes state for exactly one session.
///
/// Starting or cancelling a search bumps the shared epoch. Updates are
/// checked against it under the channel lock, so a superseded session can
/// never overwrite its successor's state.
pub(crate) struct SessionWriter {
    state: Arc<watch::Sender<Arc<SearchState>>>,
    epoch: Arc<AtomicU64>,
    session_epoch: u64,
}

impl SessionWriter {
    pub(crate) fn new(
        state: Arc<watch::Sender<Arc<SearchState>>>,
        epoch: Arc<AtomicU64>,
        session_epoch: u64,
    ) -> Self {
        Self {
            state,
            epoch,
            session_epoch,
        }
    }

    /// Replace the state with `f(current)`. Returns false when the session
    /// has been superseded and nothing was written.
    pub(crate) fn update(&self, f: impl FnOnce(&SearchState) -> SearchState) -> bool {
        self.state.send_if_modified(|current| {
            if self.epoch.load(Ordering::SeqCst) != self.session_epoch {
                return false;
            }
            *current = Arc::new(f(current));
            true
        })
    }
}

// ---------------------------------------------------------------------------
// Read loop
// ---------------------------------------------------------------------------

/// How a session ended, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    Completed,
    Truncated,
    ParseFailed,
    ConnectionFailed,
    Aborted,
    Superseded,
}

/// Drive one search stream until a terminal state is reached.
pub(crate) async fn run<T: SearchTransport>(
    transport: Arc<T>,
    request: SearchRequest,
    writer: SessionWriter,
    mut cancel: CancelToken,
) -> SessionEnd {
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return abort(&writer),
        opened = transport.open(&request) => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(request_id = %request.request_id, error = %e, "failed to open search stream");
            return fail(&writer, StreamFailure::from(&e));
        }
    };

    let mut framer = LineFramer::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return abort(&writer),
            next = stream.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                tracing::warn!(request_id = %request.request_id, error = %e, "search stream broke");
                return fail(&writer, StreamFailure::from(&e));
            }
            None => {
                tracing::warn!(
                    request_id = %request.request_id,
                    "search stream ended without search.completed"
                );
                return if writer.update(SearchState::finish_truncated) {
                    SessionEnd::Truncated
                } else {
                    SessionEnd::Superseded
                };
            }
        };

        tracing::debug!(bytes = chunk.len(), "search stream chunk");

        for line in framer.push(&chunk) {
            let frame = match decode_line(&line) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(request_id = %request.request_id, error = %e, "malformed search frame");
                    let message = e.to_string();
                    writer.update(|state| state.fail_parse(&message));
                    return SessionEnd::ParseFailed;
                }
            };

            tracing::debug!(
                event = frame.event.name(),
                request_id = frame.request_id.as_deref().unwrap_or(""),
                timestamp_ms = frame.timestamp_ms.unwrap_or(0),
                "search event"
            );

            if !writer.update(|state| state.apply(&frame.event)) {
                return SessionEnd::Superseded;
            }

            // Stop reading right away; dropping the stream releases the body.
            if frame.event.is_search_completed() {
                return SessionEnd::Completed;
            }
        }
    }
}

fn abort(writer: &SessionWriter) -> SessionEnd {
    writer.update(|state| state.fail_stream(&StreamFailure::Aborted));
    SessionEnd::Aborted
}

fn fail(writer: &SessionWriter, failure: StreamFailure) -> SessionEnd {
    let end = match failure {
        StreamFailure::Aborted => SessionEnd::Aborted,
        StreamFailure::Connection(_) => SessionEnd::ConnectionFailed,
    };
    writer.update(|state| state.fail_stream(&failure));
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::error::TransportError;
    use crate::search::request::SearchOptions;
    use crate::search::transport::ByteStream;
    use futures_util::stream;
    use std::future::Future;

    struct Chunks(Vec<&'static str>);

    impl SearchTransport for Chunks {
        fn open(
            &self,
            _request: &SearchRequest,
        ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send {
            let chunks: Vec<_> = self.0.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
            async move { Ok(Box::pin(stream::iter(chunks)) as ByteStream) }
        }
    }

    fn harness() -> (Arc<watch::Sender<Arc<SearchState>>>, Arc<AtomicU64>) {
        let (tx, _rx) = watch::channel(Arc::new(SearchState::started("dune", "en")));
        (Arc::new(tx), Arc::new(AtomicU64::new(1)))
    }

    fn request() -> SearchRequest {
        SearchOptions::with_query("dune").request(None).unwrap()
    }

    #[tokio::test]
    async fn stops_at_search_completed() {
        let (state, epoch) = harness();
        let writer = SessionWriter::new(Arc::clone(&state), Arc::clone(&epoch), 1);
        let (_scope, token) = CancelScope::new();
        let transport = Arc::new(Chunks(vec![
            "data: {\"event\":\"search.started\",\"provider_ids\":[\"p1\"],\"total_providers\":1}\n\n",
            "data: {\"event\":\"search.completed\",\"total_results\":0,\"providers_completed\":1}\n\n",
            "data: {broken\n\n",
        ]));

        let end = run(transport, request(), writer, token).await;
        assert_eq!(end, SessionEnd::Completed);
        let current = state.borrow().clone();
        assert!(!current.is_searching);
        assert_eq!(current.error, None);
    }

    #[tokio::test]
    async fn superseded_session_writes_nothing() {
        let (state, epoch) = harness();
        let writer = SessionWriter::new(Arc::clone(&state), Arc::clone(&epoch), 1);
        epoch.store(2, Ordering::SeqCst);
        let (_scope, token) = CancelScope::new();
        let transport = Arc::new(Chunks(vec![
            "data: {\"event\":\"search.started\",\"provider_ids\":[\"p1\"],\"total_providers\":1}\n",
        ]));

        let end = run(transport, request(), writer, token).await;
        assert_eq!(end, SessionEnd::Superseded);
        assert_eq!(state.borrow().total_providers, 0);
        assert!(state.borrow().is_searching);
    }

    #[tokio::test]
    async fn cancelled_before_open_is_an_abort() {
        let (state, epoch) = harness();
        let writer = SessionWriter::new(Arc::clone(&state), Arc::clone(&epoch), 1);
        let (scope, token) = CancelScope::new();
        scope.cancel();
        scope.cancel();

        let end = run(Arc::new(Chunks(vec![])), request(), writer, token).await;
        assert_eq!(end, SessionEnd::Aborted);
        let current = state.borrow().clone();
        assert!(!current.is_searching);
        assert_eq!(current.error, None);
    }

    #[tokio::test]
    async fn dropped_scope_counts_as_cancelled() {
        let (scope, mut token) = CancelScope::new();
        drop(scope);
        tokio::time::timeout(std::time::Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }
}
