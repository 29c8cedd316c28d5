//! Streamed metadata search.
//!
//! The server answers `GET /api/metadata/search/stream` with `data: <json>`
//! lines describing each provider's progress. This module turns that stream
//! into a [`SearchState`]:
//!
//! - **frame**: byte chunks to complete lines to `data:` payloads
//! - **event**: payloads to typed [`SearchEvent`]s
//! - **state**: the pure reducer, including reconciliation of providers the
//!   backend never reported
//! - **session**: the read loop and its cancellation scope
//! - **client**: [`SearchStreamClient`], the start/cancel/reset surface
//! - **actions**: [`SearchActions`], submit/cancel/close sequencing

pub mod actions;
pub mod client;
pub mod error;
pub mod event;
pub mod frame;
pub mod model;
pub mod request;
mod session;
pub mod state;
pub mod transport;

pub use actions::SearchActions;
pub use client::SearchStreamClient;
pub use error::{ClientError, FrameError, TransportError};
pub use event::{EventFrame, SearchEvent};
pub use model::{MetadataRecord, ProviderPhase, ProviderStatus};
pub use request::{SearchOptions, SearchRequest};
pub use state::{SearchState, StreamFailure};
pub use transport::{ByteStream, HttpTransport, SearchTransport};
