//! Top-level diagnostic error type for folio-search.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives; this enum wraps them so the CLI can report any of them with
//! codes and help text intact.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::search::{ClientError, TransportError};

#[derive(Debug, Error, Diagnostic)]
pub enum FolioError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error("search failed: {message}")]
    #[diagnostic(
        code(folio::search::failed),
        help("The search stream reported an error before finishing. Partial results, if any, were printed above.")
    )]
    SearchFailed { message: String },
}

pub type FolioResult<T> = std::result::Result<T, FolioError>;
