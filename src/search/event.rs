//! Typed events carried in the JSON payload of each `data:` frame.
//!
//! The `event` field selects the variant. Anything that is valid JSON but
//! not a recognizable event decodes to [`SearchEvent::Unrecognized`], which
//! the reducer ignores. Only JSON syntax errors are reported as failures.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::FrameError;
use super::model::MetadataRecord;

/// One search event, keyed by its `event` tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event")]
pub enum SearchEvent {
    #[serde(rename = "search.started")]
    SearchStarted {
        #[serde(default)]
        query: String,
        #[serde(default)]
        locale: String,
        #[serde(default)]
        provider_ids: Vec<String>,
        #[serde(default)]
        total_providers: usize,
    },

    #[serde(rename = "provider.started")]
    ProviderStarted {
        provider_id: String,
        #[serde(default)]
        provider_name: Option<String>,
    },

    #[serde(rename = "provider.progress")]
    ProviderProgress {
        provider_id: String,
        #[serde(default, deserialize_with = "lenient_count")]
        discovered: usize,
    },

    #[serde(rename = "provider.completed")]
    ProviderCompleted {
        provider_id: String,
        #[serde(default, deserialize_with = "lenient_count")]
        result_count: usize,
        #[serde(default, deserialize_with = "lenient_millis")]
        duration_ms: Option<u64>,
    },

    #[serde(rename = "provider.failed")]
    ProviderFailed {
        provider_id: String,
        /// Empty when the server sends `null` or omits it.
        #[serde(default, deserialize_with = "lenient_text")]
        error: String,
        #[serde(default)]
        error_type: Option<String>,
    },

    #[serde(rename = "search.progress")]
    SearchProgress {
        #[serde(default, deserialize_with = "lenient_count")]
        providers_completed: usize,
        #[serde(default, deserialize_with = "lenient_count")]
        providers_failed: usize,
        #[serde(default, deserialize_with = "lenient_count")]
        total_results: usize,
        /// `None` when the field is absent; present-but-malformed is `Some(vec![])`.
        #[serde(default, deserialize_with = "lenient_optional_records")]
        results: Option<Vec<MetadataRecord>>,
    },

    #[serde(rename = "search.completed")]
    SearchCompleted {
        #[serde(default, deserialize_with = "lenient_count")]
        total_results: usize,
        #[serde(default, deserialize_with = "lenient_count")]
        providers_completed: usize,
        #[serde(default, deserialize_with = "lenient_count")]
        providers_failed: usize,
        #[serde(default, deserialize_with = "lenient_records")]
        results: Vec<MetadataRecord>,
    },

    #[serde(other)]
    Unrecognized,
}

impl SearchEvent {
    /// Wire tag of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchStarted { .. } => "search.started",
            Self::ProviderStarted { .. } => "provider.started",
            Self::ProviderProgress { .. } => "provider.progress",
            Self::ProviderCompleted { .. } => "provider.completed",
            Self::ProviderFailed { .. } => "provider.failed",
            Self::SearchProgress { .. } => "search.progress",
            Self::SearchCompleted { .. } => "search.completed",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn is_search_completed(&self) -> bool {
        matches!(self, Self::SearchCompleted { .. })
    }
}

/// A decoded frame: the event plus its envelope fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub request_id: Option<String>,
    pub timestamp_ms: Option<u64>,
    pub event: SearchEvent,
}

impl EventFrame {
    /// Decode one frame payload.
    pub fn decode(payload: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(payload).map_err(|e| FrameError::Json {
            message: e.to_string(),
        })?;

        let request_id = value
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let timestamp_ms = value.get("timestamp_ms").and_then(as_whole_number);

        let event = match serde_json::from_value::<SearchEvent>(value) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed search event");
                SearchEvent::Unrecognized
            }
        };

        Ok(Self {
            request_id,
            timestamp_ms,
            event,
        })
    }
}

/// Any non-negative JSON number, truncated toward zero. Floats such as
/// `812.4` are accepted; negatives, `NaN` and non-numbers yield `None`.
fn as_whole_number(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match as_whole_number(&value) {
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        None => {
            if !value.is_null() {
                tracing::warn!(kind = value_kind(&value), "count field is not a number");
            }
            0
        }
    })
}

fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_whole_number(&value))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<MetadataRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_records(value))
}

fn lenient_optional_records<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<MetadataRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_records(deserializer).map(Some)
}

/// Non-arrays become empty; elements that are not records are dropped.
fn coerce_records(value: Value) -> Vec<MetadataRecord> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping undecodable metadata record");
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(kind = value_kind(&other), "results field is not an array");
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
