//! User-Agent sent on every probe and segment request.
//!
//! Some file hosts serve error pages or refuse range requests to clients that
//! do not look like a browser, so all traffic uses a desktop browser UA.

/// Browser User-Agent for all download traffic.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Returns the User-Agent used by the download client.
#[must_use]
pub(crate) fn default_download_user_agent() -> &'static str {
    BROWSER_USER_AGENT
}
