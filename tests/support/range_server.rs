//! Mock file server that honours `Range` requests.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves a fixed body, answering ranged GETs with 206 and a slice.
///
/// Requests without a `Range` header get the whole body with 200.
#[derive(Clone)]
pub struct RangeResponder {
    body: Arc<Vec<u8>>,
    delay: Option<Duration>,
    fail_range_start: Option<u64>,
    slow_range: Option<(u64, Duration)>,
}

impl RangeResponder {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body: Arc::new(body),
            delay: None,
            fail_range_start: None,
            slow_range: None,
        }
    }

    /// Delays every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answers 500 to the ranged request starting at byte `start`.
    pub fn failing_range_at(mut self, start: u64) -> Self {
        self.fail_range_start = Some(start);
        self
    }

    /// Delays only the ranged request starting at byte `start`.
    pub fn slow_range_at(mut self, start: u64, delay: Duration) -> Self {
        self.slow_range = Some((start, delay));
        self
    }

    fn template(&self, status: u16) -> ResponseTemplate {
        let template = ResponseTemplate::new(status);
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let len = self.body.len() as u64;
        let range = request
            .headers
            .get("range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_range);

        let Some((start, end)) = range else {
            return self
                .template(200)
                .insert_header("Accept-Ranges", "bytes")
                .set_body_bytes(self.body.as_slice());
        };

        if self.fail_range_start == Some(start) {
            return self.template(500);
        }
        if start >= len {
            return self
                .template(416)
                .insert_header("Content-Range", format!("bytes */{len}"));
        }

        let end = end.min(len - 1);
        let slice = &self.body[usize::try_from(start).unwrap()..=usize::try_from(end).unwrap()];
        let template = match self.slow_range {
            Some((slow_start, delay)) if slow_start == start => {
                ResponseTemplate::new(206).set_delay(delay)
            }
            _ => self.template(206),
        };
        template
            .insert_header("Content-Range", format!("bytes {start}-{end}/{len}"))
            .set_body_bytes(slice)
    }
}

fn parse_range(header: &str) -> Option<(u64, u64)> {
    let (start, end) = header.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Deterministic, non-repeating-looking test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 251) % 256) as u8).collect()
}

/// Mounts a HEAD reporting `len` bytes, optionally advertising range support.
pub async fn mount_head(server: &MockServer, route: &str, len: usize, accept_ranges: bool) {
    let mut template = ResponseTemplate::new(200).insert_header("Content-Length", len.to_string());
    if accept_ranges {
        template = template.insert_header("Accept-Ranges", "bytes");
    }
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Mounts a HEAD that names the file via Content-Disposition.
///
/// With `len` unset no size is reported, which forces a single-stream transfer.
pub async fn mount_named_head(server: &MockServer, route: &str, filename: &str, len: Option<usize>) {
    let mut template = ResponseTemplate::new(200).insert_header(
        "Content-Disposition",
        format!(r#"attachment; filename="{filename}""#),
    );
    if let Some(len) = len {
        template = template
            .insert_header("Content-Length", len.to_string())
            .insert_header("Accept-Ranges", "bytes");
    }
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Mounts a ranged GET responder for `route`.
pub async fn mount_get(server: &MockServer, route: &str, responder: RangeResponder) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// `Range` header values of all GETs the server received, sorted.
pub async fn received_ranges(server: &MockServer) -> Vec<String> {
    let mut ranges: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.as_str() == "GET")
        .filter_map(|request| {
            request
                .headers
                .get("range")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .collect();
    ranges.sort_by_key(|range| {
        range
            .trim_start_matches("bytes=")
            .split('-')
            .next()
            .and_then(|start| start.parse::<u64>().ok())
            .unwrap_or(0)
    });
    ranges
}
