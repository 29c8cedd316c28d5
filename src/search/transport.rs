//! The HTTP seam of the search client.
//!
//! [`SearchTransport`] opens the event stream for a request and hands back
//! raw body chunks. [`HttpTransport`] is the reqwest implementation; tests
//! substitute scripted transports.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};

use super::error::{ClientError, ClientResult, OPEN_STREAM_FALLBACK, TransportError};
use super::request::{SEARCH_STREAM_PATH, SearchRequest};

/// Body chunks of an open event stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Opens search event streams.
pub trait SearchTransport: Send + Sync + 'static {
    /// Issue the request and return the body stream once the server has
    /// answered with a success status.
    fn open(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send;
}

/// reqwest-backed transport talking to the library server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, connect_timeout: Duration) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ClientError::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Full URL of the streaming endpoint, without query parameters.
    pub fn endpoint(&self) -> String {
        format!("{}{SEARCH_STREAM_PATH}", self.base_url)
    }
}

impl SearchTransport for HttpTransport {
    fn open(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send {
        let builder = self
            .http
            .get(self.endpoint())
            .query(&request.query_pairs())
            .header(reqwest::header::ACCEPT, "text/event-stream");

        async move {
            let response = builder.send().await.map_err(|e| TransportError::Connect {
                message: e.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                let message = match response.text().await {
                    Ok(body) if !body.trim().is_empty() => body,
                    _ => OPEN_STREAM_FALLBACK.to_string(),
                };
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.bytes_stream().map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::Body {
                        message: e.to_string(),
                    })
            });
            Ok(Box::pin(body) as ByteStream)
        }
    }
}
