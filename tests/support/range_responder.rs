//! Wiremock responders that serve byte ranges of an in-memory file.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Deterministic payload of `len` bytes.
#[must_use]
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 251) % 256) as u8).collect()
}

/// Parses `bytes=a-b` into an inclusive pair.
#[must_use]
pub fn parse_range(value: &str) -> Option<(usize, usize)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

/// Serves `data` honoring `Range` headers with 206 responses.
#[derive(Clone)]
pub struct RangeResponder {
    data: Arc<Vec<u8>>,
    honor_ranges: bool,
    delay: Option<Duration>,
    /// Range start offset mapped to remaining forced failures.
    failures: Arc<Mutex<HashMap<usize, usize>>>,
}

impl RangeResponder {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            honor_ranges: true,
            delay: None,
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Answers every GET with 200 and the whole body.
    #[allow(dead_code)]
    pub fn ignoring_ranges(mut self) -> Self {
        self.honor_ranges = false;
        self
    }

    /// Delays every response.
    #[allow(dead_code)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails the range starting at `start` with 500 the next `times` times.
    #[allow(dead_code)]
    pub fn failing_range(self, start: usize, times: usize) -> Self {
        self.failures
            .lock()
            .expect("failures lock")
            .insert(start, times);
        self
    }

    fn should_fail(&self, start: usize) -> bool {
        let mut failures = self.failures.lock().expect("failures lock");
        match failures.get_mut(&start) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn with_optional_delay(&self, template: ResponseTemplate) -> ResponseTemplate {
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .headers
            .get("range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_range);

        let template = match range {
            Some((start, end)) if self.honor_ranges => {
                if self.should_fail(start) {
                    ResponseTemplate::new(500)
                } else {
                    let end = end.min(self.data.len().saturating_sub(1));
                    ResponseTemplate::new(206)
                        .insert_header(
                            "content-range",
                            format!("bytes {start}-{end}/{}", self.data.len()).as_str(),
                        )
                        .set_body_bytes(self.data[start..=end].to_vec())
                }
            }
            _ => ResponseTemplate::new(200).set_body_bytes(self.data.as_ref().clone()),
        };
        self.with_optional_delay(template)
    }
}

/// Mounts a HEAD mock reporting the size of `data` and optional range support.
pub async fn mount_head(server: &MockServer, route: &str, data: &[u8], accept_ranges: bool) {
    let template = ResponseTemplate::new(200)
        .insert_header("accept-ranges", if accept_ranges { "bytes" } else { "none" })
        .set_body_bytes(data.to_vec());
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Mounts a GET mock served by `responder`.
pub async fn mount_get(server: &MockServer, route: &str, responder: RangeResponder) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// GET requests that carried the given `Range` header value.
#[allow(dead_code)]
pub async fn count_range_requests(server: &MockServer, range: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| {
            request
                .headers
                .get("range")
                .and_then(|value| value.to_str().ok())
                == Some(range)
        })
        .count()
}

/// All GET requests received so far.
#[allow(dead_code)]
pub async fn count_get_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == "GET")
        .count()
}
