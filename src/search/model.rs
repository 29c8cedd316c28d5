//! Value types shared by the search stream: metadata hits and per-provider
//! status records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Error type recorded when a provider is force-failed because the
/// connection dropped or the backend never reported it.
pub const CONNECTION_ERROR: &str = "ConnectionError";

/// Error type recorded when the stream ended without a final summary.
pub const STREAM_ERROR: &str = "StreamError";

/// A single search hit from an external metadata provider.
///
/// Produced by the server; the client never edits one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Provider that produced the hit.
    pub source_id: String,
    /// Identifier of the work inside that provider.
    pub external_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub series_index: Option<f64>,
    /// ISBN, ASIN, goodreads id and so on, keyed by scheme.
    #[serde(default)]
    pub identifiers: BTreeMap<String, String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Where a provider is in its lifecycle for the current search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPhase {
    Pending,
    Searching,
    Completed,
    Failed,
}

impl ProviderPhase {
    /// `completed` and `failed` are terminal; nothing enforces that no
    /// further event arrives afterwards.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Searching => "searching",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProviderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one provider within a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub id: String,
    /// Human-readable name; the id until `provider.started` names it.
    pub name: String,
    pub status: ProviderPhase,
    pub result_count: usize,
    /// Candidates seen so far, as reported by `provider.progress`.
    pub discovered: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ProviderStatus {
    /// Entry created for every id announced by `search.started`.
    pub fn pending(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            status: ProviderPhase::Pending,
            result_count: 0,
            discovered: 0,
            error: None,
            error_type: None,
            duration_ms: None,
        }
    }

    /// Entry written by `provider.started`; replaces whatever was there.
    pub fn searching(id: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ProviderPhase::Searching,
            ..Self::pending(id)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn mark_completed(&mut self, result_count: usize, duration_ms: Option<u64>) {
        self.status = ProviderPhase::Completed;
        self.result_count = result_count;
        self.duration_ms = duration_ms;
    }

    pub(crate) fn mark_failed(&mut self, error: &str, error_type: Option<&str>) {
        self.status = ProviderPhase::Failed;
        self.error = Some(error.to_string());
        self.error_type = error_type.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_names_provider_after_id() {
        let status = ProviderStatus::pending("openlibrary");
        assert_eq!(status.name, "openlibrary");
        assert_eq!(status.status, ProviderPhase::Pending);
        assert!(!status.is_terminal());
    }

    #[test]
    fn terminal_phases() {
        assert!(ProviderPhase::Completed.is_terminal());
        assert!(ProviderPhase::Failed.is_terminal());
        assert!(!ProviderPhase::Searching.is_terminal());
        assert!(!ProviderPhase::Pending.is_terminal());
    }

    #[test]
    fn record_decodes_with_only_required_fields() {
        let record: MetadataRecord = serde_json::from_str(
            r#"{"source_id":"google","external_id":"x1","title":"Dune"}"#,
        )
        .unwrap();
        assert_eq!(record.title, "Dune");
        assert!(record.authors.is_empty());
        assert!(record.identifiers.is_empty());
        assert_eq!(record.rating, None);
    }

    #[test]
    fn phase_serializes_lowercase() {
        let json = serde_json::to_string(&ProviderPhase::Searching).unwrap();
        assert_eq!(json, "\"searching\"");
    }
}
