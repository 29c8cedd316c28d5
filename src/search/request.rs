//! Search parameters and the wire request built from them.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Path of the streaming search endpoint, relative to the server base URL.
pub const SEARCH_STREAM_PATH: &str = "/api/metadata/search/stream";

pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_MAX_RESULTS_PER_PROVIDER: u32 = 20;

/// Parameters a client is configured with. The query can be overridden per
/// search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub query: String,
    pub locale: String,
    pub max_results_per_provider: u32,
    /// Restrict the search to these provider ids.
    pub provider_ids: Vec<String>,
    /// Restrict the search to providers with these names.
    pub enable_providers: Vec<String>,
    /// Correlation id; a fresh one is generated per search when unset.
    pub request_id: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            locale: DEFAULT_LOCALE.to_string(),
            max_results_per_provider: DEFAULT_MAX_RESULTS_PER_PROVIDER,
            provider_ids: Vec::new(),
            enable_providers: Vec::new(),
            request_id: None,
        }
    }
}

impl SearchOptions {
    pub fn with_query(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    /// Build the request for one search. Returns `None` when the effective
    /// query (the override if given, else the configured one) is blank.
    pub fn request(&self, query_override: Option<&str>) -> Option<SearchRequest> {
        let query = query_override.unwrap_or(&self.query).trim();
        if query.is_empty() {
            return None;
        }

        Some(SearchRequest {
            query: query.to_string(),
            locale: self.locale.clone(),
            max_results_per_provider: self.max_results_per_provider,
            provider_ids: self.provider_ids.clone(),
            enable_providers: self.enable_providers.clone(),
            request_id: self
                .request_id
                .clone()
                .unwrap_or_else(generate_request_id),
        })
    }
}

/// A fully resolved search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub locale: String,
    pub max_results_per_provider: u32,
    pub provider_ids: Vec<String>,
    pub enable_providers: Vec<String>,
    pub request_id: String,
}

impl SearchRequest {
    /// Query-string parameters in wire order. Empty provider filters are
    /// left out.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("query", self.query.clone()),
            ("locale", self.locale.clone()),
            (
                "max_results_per_provider",
                self.max_results_per_provider.to_string(),
            ),
        ];
        if !self.provider_ids.is_empty() {
            pairs.push(("provider_ids", self.provider_ids.join(",")));
        }
        if !self.enable_providers.is_empty() {
            pairs.push(("enable_providers", self.enable_providers.join(",")));
        }
        pairs.push(("request_id", self.request_id.clone()));
        pairs
    }
}

/// `"<unix millis>-<random base36>"`.
pub fn generate_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix: u64 = rand::thread_rng().gen_range(0..36u64.pow(9));
    format!("{millis}-{}", to_base36(suffix))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
