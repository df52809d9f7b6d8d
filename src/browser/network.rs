//! Network interception types and rule matching.
//!
//! Paused requests are matched against rules in registration order; the
//! first rule whose glob matches the full URL decides.
//!
//! # Mocking a response
//!
//! ```ignore
//! use cdp_driver::InterceptResponse;
//!
//! driver
//!     .intercept(&["*/api/users*"], |req| {
//!         req.url_contains("/api/users")
//!             .then(|| InterceptResponse::json(r#"[{"id":1}]"#))
//!     })
//!     .await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::FetchRequestId;
use crate::protocol::{FetchCommand, HeaderEntry, ParsedEvent, RequestPattern};

// ============================================================================
// Types
// ============================================================================

/// Decides what happens to a paused request.
///
/// `None` continues it unmodified; `Some` fulfills it with a mock.
pub type InterceptHandler =
    Arc<dyn Fn(&InterceptRequest) -> Option<InterceptResponse> + Send + Sync>;

// ============================================================================
// InterceptRequest
// ============================================================================

/// A request paused by the browser.
#[derive(Debug, Clone)]
pub struct InterceptRequest {
    /// Paused request id.
    pub request_id: FetchRequestId,
    /// Full request URL.
    pub url: String,
    /// HTTP method (GET, POST, etc.).
    pub method: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body, when any.
    pub post_data: Option<String>,
    /// Resource type (Document, Script, XHR, etc.).
    pub resource_type: String,
}

impl InterceptRequest {
    /// Builds a request from a `Fetch.requestPaused` event.
    #[must_use]
    pub fn from_event(event: &ParsedEvent) -> Option<Self> {
        let ParsedEvent::RequestPaused {
            request_id,
            url,
            method,
            headers,
            post_data,
            resource_type,
        } = event
        else {
            return None;
        };

        Some(Self {
            request_id: request_id.clone(),
            url: url.clone(),
            method: method.clone(),
            headers: header_map(headers),
            post_data: post_data.clone(),
            resource_type: resource_type.clone(),
        })
    }

    /// Returns `true` if the URL contains `fragment`.
    #[inline]
    #[must_use]
    pub fn url_contains(&self, fragment: &str) -> bool {
        self.url.contains(fragment)
    }

    /// Returns `true` if the full URL matches a `*` glob.
    #[must_use]
    pub fn url_matches(&self, glob: &str) -> bool {
        glob_regex(glob).is_ok_and(|re| re.is_match(&self.url))
    }

    /// Returns a header value, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn header_map(headers: &Value) -> HashMap<String, String> {
    headers
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let value = v.as_str().map_or_else(|| v.to_string(), str::to_string);
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// InterceptResponse
// ============================================================================

/// A mock response used to fulfill a paused request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptResponse {
    /// HTTP status.
    pub status: u16,
    /// Response headers, in order.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl InterceptResponse {
    /// Creates a response with a status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// 200 with `application/json`.
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self::new(200, body.into()).header("Content-Type", "application/json")
    }

    /// 200 with `text/html`.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(200, body.into()).header("Content-Type", "text/html; charset=utf-8")
    }

    /// 200 with `text/plain`.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(200, body.into()).header("Content-Type", "text/plain; charset=utf-8")
    }

    /// Empty body with the given status.
    #[inline]
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    /// Empty 200.
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self::status(200)
    }

    /// 404.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404, "Not Found").header("Content-Type", "text/plain; charset=utf-8")
    }

    /// 500.
    #[must_use]
    pub fn server_error() -> Self {
        Self::new(500, "Internal Server Error").header("Content-Type", "text/plain; charset=utf-8")
    }

    /// 302 to `location`.
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::status(302).header("Location", location)
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Body as UTF-8 text, lossy.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Builds the `Fetch.fulfillRequest` command for a paused request.
    #[must_use]
    pub fn to_fulfill(&self, request_id: FetchRequestId) -> FetchCommand {
        FetchCommand::FulfillRequest {
            request_id,
            response_code: self.status,
            response_headers: self
                .headers
                .iter()
                .map(|(name, value)| HeaderEntry {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            body: (!self.body.is_empty()).then(|| Base64Standard.encode(&self.body)),
        }
    }
}

// ============================================================================
// Glob Matching
// ============================================================================

/// Compiles a URL glob into an anchored regex.
///
/// `*` matches any run of characters and `?` exactly one.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the result is not a valid regex.
pub fn glob_regex(glob: &str) -> Result<Regex> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            _ => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');

    Regex::new(&pattern).map_err(|e| Error::invalid_argument(format!("bad glob {glob}: {e}")))
}

// ============================================================================
// Interceptor
// ============================================================================

/// One interception rule.
struct InterceptRule {
    patterns: Vec<String>,
    matchers: Vec<Regex>,
    handler: InterceptHandler,
}

impl InterceptRule {
    fn matches(&self, url: &str) -> bool {
        self.matchers.iter().any(|re| re.is_match(url))
    }
}

/// Ordered interception rules shared with the `Fetch.requestPaused` handler.
#[derive(Default)]
pub struct Interceptor {
    rules: Mutex<Vec<InterceptRule>>,
}

impl Interceptor {
    /// Creates an empty interceptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule and returns the union of every rule's patterns, which
    /// is what `Fetch.enable` must be called with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for no patterns or a bad glob.
    pub fn add(&self, patterns: &[&str], handler: InterceptHandler) -> Result<Vec<RequestPattern>> {
        if patterns.is_empty() {
            return Err(Error::invalid_argument("intercept needs at least one pattern"));
        }

        let matchers = patterns
            .iter()
            .map(|p| glob_regex(p))
            .collect::<Result<Vec<_>>>()?;

        let mut rules = self.rules.lock();
        rules.push(InterceptRule {
            patterns: patterns.iter().map(|p| (*p).to_string()).collect(),
            matchers,
            handler,
        });

        let mut union: Vec<RequestPattern> = Vec::new();
        for pattern in rules.iter().flat_map(|r| r.patterns.iter()) {
            if !union.iter().any(|u| &u.url_pattern == pattern) {
                union.push(RequestPattern {
                    url_pattern: pattern.clone(),
                });
            }
        }
        Ok(union)
    }

    /// Removes every rule.
    pub fn clear(&self) {
        self.rules.lock().clear();
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.lock().len()
    }

    /// Returns `true` with no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.lock().is_empty()
    }

    /// Runs the first matching rule.
    ///
    /// A panicking handler is logged and the request continues.
    #[must_use]
    pub fn decide(&self, request: &InterceptRequest) -> Option<InterceptResponse> {
        let handler = {
            let rules = self.rules.lock();
            rules
                .iter()
                .find(|r| r.matches(&request.url))
                .map(|r| Arc::clone(&r.handler))
        }?;

        match catch_unwind(AssertUnwindSafe(|| handler(request))) {
            Ok(decision) => decision,
            Err(_) => {
                warn!(url = %request.url, "Intercept handler panicked, continuing request");
                None
            }
        }
    }

    /// Returns the command answering a paused request.
    #[must_use]
    pub fn respond(&self, request: &InterceptRequest) -> FetchCommand {
        match self.decide(request) {
            Some(response) => {
                debug!(url = %request.url, status = response.status, "Fulfilling intercepted request");
                response.to_fulfill(request.request_id.clone())
            }
            None => FetchCommand::ContinueRequest {
                request_id: request.request_id.clone(),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    fn request(url: &str) -> InterceptRequest {
        InterceptRequest {
            request_id: FetchRequestId::new("interception-1"),
            url: url.to_string(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            post_data: None,
            resource_type: "XHR".to_string(),
        }
    }

    #[test]
    fn test_glob_matches_full_url() {
        let re = glob_regex("*/api/*").expect("glob");
        assert!(re.is_match("https://example.com/api/users"));
        assert!(!re.is_match("https://example.com/static/app.js"));

        let exact = glob_regex("https://a.test/x?y").expect("glob");
        assert!(exact.is_match("https://a.test/x?y"));
        assert!(exact.is_match("https://a.test/xzy"));
        assert!(!exact.is_match("https://a.test/x?y/more"));
    }

    #[test]
    fn test_glob_escapes_regex_characters() {
        let re = glob_regex("*.json").expect("glob");
        assert!(re.is_match("https://cdn.test/config.json"));
        assert!(!re.is_match("https://cdn.test/configxjson"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let interceptor = Interceptor::new();
        interceptor
            .add(&["*/api/*"], Arc::new(|_| Some(InterceptResponse::json("[]"))))
            .expect("rule");
        interceptor
            .add(&["*"], Arc::new(|_| Some(InterceptResponse::not_found())))
            .expect("rule");

        let api = interceptor.decide(&request("https://x.test/api/users"));
        assert_eq!(api.map(|r| r.status), Some(200));

        let other = interceptor.decide(&request("https://x.test/index.html"));
        assert_eq!(other.map(|r| r.status), Some(404));
    }

    #[test]
    fn test_union_of_patterns() {
        let interceptor = Interceptor::new();
        interceptor.add(&["*/a/*"], Arc::new(|_| None)).expect("rule");
        let union = interceptor
            .add(&["*/b/*", "*/a/*"], Arc::new(|_| None))
            .expect("rule");

        let patterns: Vec<&str> = union.iter().map(|p| p.url_pattern.as_str()).collect();
        assert_eq!(patterns, ["*/a/*", "*/b/*"]);
    }

    #[test]
    fn test_panicking_handler_continues() {
        let interceptor = Interceptor::new();
        interceptor
            .add(&["*"], Arc::new(|_| panic!("handler bug")))
            .expect("rule");

        let command = interceptor.respond(&request("https://x.test/"));
        assert!(matches!(command, FetchCommand::ContinueRequest { .. }));
    }

    #[test]
    fn test_cleared_interceptor_continues() {
        let interceptor = Interceptor::new();
        interceptor
            .add(&["*"], Arc::new(|_| Some(InterceptResponse::ok())))
            .expect("rule");
        interceptor.clear();

        assert!(interceptor.is_empty());
        assert!(matches!(
            interceptor.respond(&request("https://x.test/")),
            FetchCommand::ContinueRequest { .. }
        ));
    }

    #[test]
    fn test_no_patterns_rejected() {
        let err = Interceptor::new().add(&[], Arc::new(|_| None)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_not_found_fulfill_command() {
        let command = InterceptResponse::not_found().to_fulfill(FetchRequestId::new("r1"));
        let value = serde_json::to_value(crate::protocol::Command::Fetch(command)).expect("json");

        assert_eq!(value["method"], "Fetch.fulfillRequest");
        assert_eq!(value["params"]["responseCode"], 404);
        assert_eq!(value["params"]["body"], Base64Standard.encode("Not Found"));
    }

    #[test]
    fn test_redirect_has_location() {
        let response = InterceptResponse::redirect("/login");
        assert_eq!(response.status, 302);
        assert_eq!(response.headers, vec![("Location".to_string(), "/login".to_string())]);

        let value = serde_json::to_value(response.to_fulfill(FetchRequestId::new("r"))).expect("json");
        assert!(value["params"].get("body").is_none());
    }

    #[test]
    fn test_request_from_event() {
        let event = ParsedEvent::RequestPaused {
            request_id: FetchRequestId::new("7"),
            url: "https://x.test/api/users?page=2".to_string(),
            method: "POST".to_string(),
            headers: json!({"Content-Type": "application/json", "X-Count": 3}),
            post_data: Some("{}".to_string()),
            resource_type: "Fetch".to_string(),
        };

        let req = InterceptRequest::from_event(&event).expect("request");
        assert!(req.url_contains("/api/users"));
        assert!(req.url_matches("*page=2"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("x-count"), Some("3"));
    }

    proptest! {
        #[test]
        fn prop_star_matches_everything(url in "\\PC{0,60}") {
            let re = glob_regex("*").expect("glob");
            prop_assert!(re.is_match(&url));
        }

        #[test]
        fn prop_literal_glob_matches_itself(url in "[a-z0-9:/._-]{1,40}") {
            let re = glob_regex(&url).expect("glob");
            prop_assert!(re.is_match(&url));
        }
    }
}
