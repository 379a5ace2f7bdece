//! HTTP client wrapper shared by the prober and the segment fetchers.
//!
//! Every request carries the browser User-Agent and `Accept-Encoding: identity`
//! so the server reports the real on-the-wire length and byte ranges line up
//! with the stored file.

use std::time::Duration;

use reqwest::header::{ACCEPT_ENCODING, HeaderMap, HeaderValue, RANGE};
use reqwest::{Client, Method};
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::TransferError;
use crate::user_agent;

/// HTTP client for probing and ranged transfers.
///
/// Created once per [`Downloader`](super::Downloader) and cloned into every
/// fetcher task, so all segments share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns the underlying reqwest error if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// `read_timeout` bounds the gap between body chunks rather than the whole
    /// transfer, so large segments are not cut off.
    ///
    /// # Errors
    ///
    /// Returns the underlying reqwest error if the client cannot be built.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(user_agent::default_download_user_agent())
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    /// Sends a HEAD request, following redirects.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] on transport failure or a non-success status.
    pub async fn head(&self, url: &str) -> Result<reqwest::Response, TransferError> {
        self.send(Method::HEAD, url, None).await
    }

    /// Sends a GET request; the caller decides whether to stream or drop the body.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] on transport failure or a non-success status.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, TransferError> {
        self.send(Method::GET, url, None).await
    }

    /// Sends a GET request for the inclusive byte range `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] on transport failure or a non-success status.
    pub async fn get_range(
        &self,
        url: &str,
        start: u64,
        end: u64,
    ) -> Result<reqwest::Response, TransferError> {
        let range = format!("bytes={start}-{end}");
        self.send(Method::GET, url, Some(&range)).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        range_header: Option<&str>,
    ) -> Result<reqwest::Response, TransferError> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(range) = range_header {
            request = request.header(RANGE, range);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransferError::from_reqwest(url, e))?;

        let status = response.status();
        // Redirects are followed by reqwest; anything left over 3xx means the
        // chain was cut short and there is no body to use.
        if !status.is_success() {
            debug!(%method, url, status = status.as_u16(), "request rejected");
            return Err(TransferError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }
}
