//! Client configuration, persisted as TOML in
//! `$XDG_CONFIG_HOME/folio/search.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::SearchOptions;
use crate::search::request::{DEFAULT_LOCALE, DEFAULT_MAX_RESULTS_PER_PROVIDER};

/// Errors from loading or saving the client configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(folio::config::no_home),
        help("Set the HOME environment variable, or pass --config explicitly.")
    )]
    NoHome,

    #[error("failed to read search config: {path}")]
    #[diagnostic(
        code(folio::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse search config: {path}: {message}")]
    #[diagnostic(
        code(folio::config::parse),
        help("Check the TOML syntax in the search config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write search config: {path}")]
    #[diagnostic(
        code(folio::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings for talking to the library server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the library server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Locale forwarded to providers.
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_max_results_per_provider")]
    pub max_results_per_provider: u32,
    /// Only query these provider ids (empty = all).
    #[serde(default)]
    pub provider_ids: Vec<String>,
    /// Only query providers with these names (empty = all).
    #[serde(default)]
    pub enable_providers: Vec<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".into()
}
fn default_locale() -> String {
    DEFAULT_LOCALE.into()
}
fn default_max_results_per_provider() -> u32 {
    DEFAULT_MAX_RESULTS_PER_PROVIDER
}
fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            locale: default_locale(),
            max_results_per_provider: default_max_results_per_provider(),
            provider_ids: Vec::new(),
            enable_providers: Vec::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// `$XDG_CONFIG_HOME/folio/search.toml`, falling back to `$HOME/.config`.
    pub fn default_path() -> ConfigResult<PathBuf> {
        let config_home = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .map_err(|_| ConfigError::NoHome)?,
        };
        Ok(config_home.join("folio").join("search.toml"))
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path`, or return defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no search config, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Search options for `query` under this configuration.
    pub fn options(&self, query: &str) -> SearchOptions {
        SearchOptions {
            query: query.to_string(),
            locale: self.locale.clone(),
            max_results_per_provider: self.max_results_per_provider,
            provider_ids: self.provider_ids.clone(),
            enable_providers: self.enable_providers.clone(),
            request_id: None,
        }
    }
}
