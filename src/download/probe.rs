//! Resource probing: final URL, size, range support, and filename.
//!
//! A HEAD request is tried first so no body is transferred. Servers that
//! reject or choke on HEAD get a streaming GET whose body is dropped as soon
//! as the headers are in.

use reqwest::header::{ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, HeaderMap};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::HttpClient;
use super::error::{DownloadError, TransferError};
use super::filename::resolve_filename;

/// Metadata describing a remote resource, as learned by [`probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    /// URL after all redirects; every later request targets this URL.
    pub resolved_url: Url,
    /// Destination filename (sanitized, never empty).
    pub filename: String,
    /// Content length in bytes, 0 when unknown.
    pub total_size: u64,
    /// Whether byte-range requests are expected to work.
    pub range_capable: bool,
}

impl ResourceInfo {
    /// Returns true when the transfer should be split into ranged segments.
    #[must_use]
    pub fn is_segmentable(&self) -> bool {
        self.range_capable && self.total_size > 0
    }
}

/// Probes `url` for its resolved location, size, range support and filename.
///
/// # Errors
///
/// - [`DownloadError::ProbeFailed`] if the URL is invalid or both HEAD and GET fail
/// - [`DownloadError::UnresolvedFilename`] if no filename can be derived
#[instrument(skip(client), fields(url = %url))]
pub async fn probe(client: &HttpClient, url: &str) -> Result<ResourceInfo, DownloadError> {
    let parsed =
        Url::parse(url).map_err(|_| DownloadError::probe_failed(url, TransferError::invalid_url(url)))?;

    let response = match client.head(parsed.as_str()).await {
        Ok(response) => response,
        Err(head_error) => {
            warn!(error = %head_error, "HEAD probe failed, retrying with GET");
            client
                .get(parsed.as_str())
                .await
                .map_err(|e| DownloadError::probe_failed(url, e))?
        }
    };

    let resolved_url = response.url().clone();
    // Only headers are inspected; dropping the response closes the body stream.
    let info = resource_info_from_headers(resolved_url, response.headers())?;
    drop(response);

    info!(
        resolved_url = %info.resolved_url,
        filename = %info.filename,
        total_size = info.total_size,
        range_capable = info.range_capable,
        "probe complete"
    );
    Ok(info)
}

/// Derives [`ResourceInfo`] from the final URL and response headers.
pub(crate) fn resource_info_from_headers(
    resolved_url: Url,
    headers: &HeaderMap,
) -> Result<ResourceInfo, DownloadError> {
    let total_size = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let declares_ranges = headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes"));
    // A fixed length is taken as a range hint; a server that then refuses
    // ranges surfaces as an ordinary segment failure.
    let range_capable = declares_ranges || total_size > 0;

    let content_disposition = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok());
    let filename = resolve_filename(content_disposition, &resolved_url)
        .ok_or_else(|| DownloadError::unresolved_filename(resolved_url.as_str()))?;

    debug!(total_size, declares_ranges, %filename, "parsed probe headers");

    Ok(ResourceInfo {
        resolved_url,
        filename,
        total_size,
        range_capable,
    })
}
