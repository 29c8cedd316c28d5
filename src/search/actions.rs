//! Input-facing wrapper around [`SearchStreamClient`].
//!
//! Sequences the client's controls the way a search dialog uses them:
//! submit, cancel, and close.

use std::sync::Arc;

use super::client::SearchStreamClient;
use super::transport::SearchTransport;

pub struct SearchActions<T: SearchTransport, F: FnMut()> {
    client: Arc<SearchStreamClient<T>>,
    on_close: F,
}

impl<T: SearchTransport, F: FnMut()> SearchActions<T, F> {
    pub fn new(client: Arc<SearchStreamClient<T>>, on_close: F) -> Self {
        Self { client, on_close }
    }

    pub fn client(&self) -> &Arc<SearchStreamClient<T>> {
        &self.client
    }

    /// Submit `query`. Blank input is ignored; otherwise the state is reset
    /// and a search for the trimmed query starts.
    pub fn handle_search(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        self.client.reset();
        self.client.start_search(Some(query))
    }

    pub fn handle_cancel(&self) {
        self.client.cancel_search();
    }

    /// Cancel, then hand control back to whoever opened the search.
    pub fn handle_close(&mut self) {
        self.client.cancel_search();
        (self.on_close)();
    }
}
