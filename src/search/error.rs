//! Rich diagnostic error types for the metadata search stream.

use miette::Diagnostic;
use thiserror::Error;

/// Fallback text used when a non-OK response body cannot be read.
pub const OPEN_STREAM_FALLBACK: &str = "Failed to open search stream";

/// Errors raised by a [`SearchTransport`](super::transport::SearchTransport)
/// while opening or reading the event stream.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum TransportError {
    #[error("search stream was aborted")]
    #[diagnostic(
        code(folio::search::aborted),
        help("The search was cancelled before the stream finished. This is not a fault.")
    )]
    Aborted,

    #[error("could not reach the metadata server: {message}")]
    #[diagnostic(
        code(folio::search::connect),
        help("Check that the library server is running and `base_url` points at it.")
    )]
    Connect { message: String },

    #[error("metadata server answered {status}: {message}")]
    #[diagnostic(
        code(folio::search::status),
        help("The server refused to open the search stream. The message is the server's response body.")
    )]
    Status { status: u16, message: String },

    #[error("search stream broke while reading: {message}")]
    #[diagnostic(
        code(folio::search::body),
        help("The connection dropped mid-stream. Retry the search.")
    )]
    Body { message: String },
}

impl TransportError {
    /// The text surfaced as the search's top-level error.
    pub fn failure_message(&self) -> String {
        match self {
            Self::Aborted => "search aborted".to_string(),
            Self::Connect { message } | Self::Status { message, .. } | Self::Body { message } => {
                message.clone()
            }
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Errors decoding a `data:` frame.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum FrameError {
    #[error("{message}")]
    #[diagnostic(
        code(folio::search::frame_json),
        help("The server sent a `data:` frame that is not valid JSON. The search was stopped.")
    )]
    Json { message: String },
}

/// Errors constructing a search client.
#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    #[error("no tokio runtime is available")]
    #[diagnostic(
        code(folio::search::no_runtime),
        help("Create the search client from inside a tokio runtime (e.g. under #[tokio::main]).")
    )]
    NoRuntime,

    #[error("failed to build HTTP client: {message}")]
    #[diagnostic(
        code(folio::search::http_client),
        help("The TLS backend or proxy settings could not be initialised.")
    )]
    HttpClient { message: String },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
