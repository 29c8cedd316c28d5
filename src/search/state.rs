//! Aggregate search state and its reducer.
//!
//! Every transition is a pure function from the previous state to a new one.
//! The client publishes each new value whole, so readers holding an older
//! snapshot never observe a half-applied event.

use std::collections::BTreeMap;

use serde::Serialize;

use super::error::TransportError;
use super::event::SearchEvent;
use super::model::{CONNECTION_ERROR, MetadataRecord, ProviderStatus, STREAM_ERROR};

/// Error recorded for providers left unsettled by a `search.completed` that
/// did not account for every announced provider.
pub const UNREPORTED_PROVIDER_ERROR: &str =
    "Provider did not complete - connection may have been lost";

/// Error recorded for unsettled providers when the stream ends without a
/// `search.completed` event.
pub const TRUNCATED_STREAM_ERROR: &str = "Stream ended unexpectedly";

/// Why a stream stopped before its natural end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFailure {
    /// Deliberate cancellation. Not a fault.
    Aborted,
    /// Connection could not be opened or broke while reading.
    Connection(String),
}

impl From<&TransportError> for StreamFailure {
    fn from(err: &TransportError) -> Self {
        if err.is_abort() {
            Self::Aborted
        } else {
            Self::Connection(err.failure_message())
        }
    }
}

/// Aggregate state of one metadata search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub is_searching: bool,
    pub query: String,
    pub locale: String,
    pub total_providers: usize,
    pub providers_completed: usize,
    pub providers_failed: usize,
    pub total_results: usize,
    pub provider_statuses: BTreeMap<String, ProviderStatus>,
    /// Set only for parse and connection failures.
    pub error: Option<String>,
    pub results: Vec<MetadataRecord>,
}

impl SearchState {
    /// Fresh state for a search that has just been requested.
    pub fn started(query: &str, locale: &str) -> Self {
        Self {
            is_searching: true,
            query: query.to_string(),
            locale: locale.to_string(),
            ..Self::default()
        }
    }

    /// True when every field matches the empty baseline.
    pub fn is_idle_baseline(&self) -> bool {
        *self == Self::default()
    }

    /// Providers that have not reached a terminal status.
    pub fn pending_providers(&self) -> impl Iterator<Item = &ProviderStatus> {
        self.provider_statuses.values().filter(|p| !p.is_terminal())
    }

    /// Completed plus failed, as currently counted.
    pub fn providers_settled(&self) -> usize {
        self.providers_completed + self.providers_failed
    }

    /// Apply one stream event.
    pub fn apply(&self, event: &SearchEvent) -> Self {
        let mut next = self.clone();

        match event {
            SearchEvent::SearchStarted {
                provider_ids,
                total_providers,
                ..
            } => {
                next.total_providers = *total_providers;
                next.provider_statuses = provider_ids
                    .iter()
                    .map(|id| (id.clone(), ProviderStatus::pending(id)))
                    .collect();
            }

            SearchEvent::ProviderStarted {
                provider_id,
                provider_name,
            } => {
                let name = provider_name.as_deref().unwrap_or(provider_id.as_str());
                next.provider_statuses.insert(
                    provider_id.clone(),
                    ProviderStatus::searching(provider_id, name),
                );
            }

            SearchEvent::ProviderProgress {
                provider_id,
                discovered,
            } => {
                if let Some(status) = next.provider_statuses.get_mut(provider_id) {
                    status.discovered = *discovered;
                }
            }

            // Counters move even for providers that were never announced, and a
            // second terminal event overwrites the first.
            SearchEvent::ProviderCompleted {
                provider_id,
                result_count,
                duration_ms,
            } => {
                if let Some(status) = next.provider_statuses.get_mut(provider_id) {
                    status.mark_completed(*result_count, *duration_ms);
                }
                next.providers_completed += 1;
            }

            SearchEvent::ProviderFailed {
                provider_id,
                error,
                error_type,
            } => {
                if let Some(status) = next.provider_statuses.get_mut(provider_id) {
                    status.mark_failed(error, error_type.as_deref());
                }
                next.providers_failed += 1;
            }

            SearchEvent::SearchProgress {
                providers_completed,
                providers_failed,
                total_results,
                results,
            } => {
                next.providers_completed = *providers_completed;
                next.providers_failed = *providers_failed;
                next.total_results = *total_results;
                if let Some(results) = results {
                    next.results = results.clone();
                }
            }

            SearchEvent::SearchCompleted {
                total_results,
                providers_completed,
                providers_failed,
                results,
            } => {
                next.is_searching = false;
                next.total_results = *total_results;
                next.providers_completed = *providers_completed;
                next.providers_failed = *providers_failed;
                next.results = results.clone();

                if next.providers_settled() < next.total_providers {
                    let forced =
                        next.fail_unsettled(UNREPORTED_PROVIDER_ERROR, CONNECTION_ERROR);
                    next.providers_failed += forced;
                }
            }

            SearchEvent::Unrecognized => {}
        }

        next
    }

    /// A `data:` frame could not be parsed; the whole search fails.
    pub fn fail_parse(&self, message: &str) -> Self {
        Self {
            is_searching: false,
            error: Some(message.to_string()),
            ..self.clone()
        }
    }

    /// The connection failed or was aborted.
    ///
    /// An abort leaves providers as they were and sets no error. A
    /// connection fault sets the error and fails every unsettled provider
    /// with the same message.
    pub fn fail_stream(&self, failure: &StreamFailure) -> Self {
        let mut next = self.clone();
        next.is_searching = false;

        if let StreamFailure::Connection(message) = failure {
            next.error = Some(message.clone());
            let forced = next.fail_unsettled(message, CONNECTION_ERROR);
            next.providers_failed += forced;
        }

        next
    }

    /// The stream ended without a `search.completed` event.
    pub fn finish_truncated(&self) -> Self {
        let mut next = self.clone();
        next.is_searching = false;
        let forced = next.fail_unsettled(TRUNCATED_STREAM_ERROR, STREAM_ERROR);
        next.providers_failed += forced;
        next
    }

    /// Force every non-terminal provider to `failed`; returns how many.
    fn fail_unsettled(&mut self, error: &str, error_type: &str) -> usize {
        let mut forced = 0;
        for status in self.provider_statuses.values_mut() {
            if !status.is_terminal() {
                status.mark_failed(error, Some(error_type));
                forced += 1;
            }
        }
        forced
    }
}
