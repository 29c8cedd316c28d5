// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # folio-search
//!
//! Client for the folio library server's streaming metadata search.
//!
//! ## Architecture
//!
//! - **Search stream** (`search`): opens `GET /api/metadata/search/stream`,
//!   frames the `data:` lines, decodes typed events and reduces them into a
//!   [`SearchState`](search::SearchState) snapshot per change
//! - **Configuration** (`config`): TOML settings under `$XDG_CONFIG_HOME/folio/`
//! - **Errors** (`error`): miette diagnostics for every subsystem
//!
//! ## Library usage
//!
//! ```no_run
//! use std::time::Duration;
//! use folio_search::search::{HttpTransport, SearchOptions, SearchStreamClient};
//!
//! # async fn demo() -> folio_search::error::FolioResult<()> {
//! let transport = HttpTransport::new("http://127.0.0.1:8000", Duration::from_secs(10))?;
//! let client = SearchStreamClient::new(transport, SearchOptions::default())?;
//! client.start_search(Some("dune"));
//! let state = client.finished().await;
//! println!("{} results", state.total_results);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod search;
