use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::Bytes;
use reqwest::{cookie::Jar, Method};
use serde::Serialize;

use crate::{RequestError, Result};

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default fixed delay between attempts, in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1_000;
/// Default charset label appended to the request content type.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Controls when an attempt is considered complete.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompletionMode {
    /// Read the whole body inside the attempt before judging it.
    #[default]
    BufferContent,
    /// Return as soon as the status line and headers arrive.
    HeadersOnly,
}

/// Automatic response decompression switches.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decompression {
    pub gzip: bool,
    pub deflate: bool,
    pub brotli: bool,
}

impl Decompression {
    /// Decompresses gzip, deflate and brotli bodies.
    pub fn all() -> Self {
        Self {
            gzip: true,
            deflate: true,
            brotli: true,
        }
    }

    /// Returns bodies exactly as the server encoded them.
    pub fn none() -> Self {
        Self {
            gzip: false,
            deflate: false,
            brotli: false,
        }
    }
}

/// Declarative description of one logical request and its retry policy.
///
/// The executor only reads this value; the same options can be executed
/// any number of times.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    /// HTTP method, `POST` unless overridden.
    pub method: Method,
    /// Absolute target URL.
    pub url: String,
    /// Extra request headers.
    pub headers: HashMap<String, String>,
    /// Opaque request payload, resent unchanged on every attempt.
    pub body: Option<Bytes>,
    /// Media type announced for `body`.
    pub request_content_type: Option<String>,
    /// Charset label attached to `request_content_type`.
    pub encoding: Option<String>,
    /// Expected response media type; drives decoding and `Accept`.
    pub response_content_type: Option<String>,
    /// Per-attempt timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    /// Overrides the transport's automatic decompression.
    pub decompression: Option<Decompression>,
    /// Cookie store shared with the caller.
    pub cookie_store: Option<Arc<Jar>>,
    /// Number of retries after the first attempt.
    pub retry_count: u32,
    /// Fixed delay paced before every attempt.
    pub retry_interval: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::POST,
            url: String::new(),
            headers: HashMap::new(),
            body: None,
            request_content_type: None,
            encoding: Some(DEFAULT_ENCODING.to_owned()),
            response_content_type: None,
            timeout: None,
            decompression: None,
            cookie_store: None,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
        }
    }
}

impl RequestOptions {
    /// Creates options for a `POST` to `url` with default retry policy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Creates options for a `GET` to `url` with default retry policy.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).with_method(Method::GET)
    }

    /// Same as [`RequestOptions::new`]; spelled out for symmetry with `get`.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    /// Overrides the HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds or replaces a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets an opaque body without touching the request content type.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a `text/plain` body.
    pub fn with_text_body(self, text: impl Into<String>) -> Self {
        self.with_body(text.into())
            .with_request_content_type("text/plain")
    }

    /// Serializes `value` as the JSON request body.
    pub fn with_json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let payload = serde_json::to_vec(value).map_err(|err| {
            RequestError::InvalidOptions(format!("request body is not serializable: {err}"))
        })?;
        Ok(self
            .with_body(payload)
            .with_request_content_type("application/json"))
    }

    /// Declares the media type of the request body.
    pub fn with_request_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.request_content_type = Some(content_type.into());
        self
    }

    /// Sets the charset label; `None` sends the content type bare.
    pub fn with_encoding(mut self, encoding: Option<String>) -> Self {
        self.encoding = encoding;
        self
    }

    /// Declares the expected response media type; also sent as `Accept`.
    pub fn with_response_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.response_content_type = Some(content_type.into());
        self
    }

    /// Sets the per-attempt timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Overrides which response encodings are decompressed automatically.
    pub fn with_decompression(mut self, decompression: Decompression) -> Self {
        self.decompression = Some(decompression);
        self
    }

    /// Shares `jar` with the transport for every attempt.
    pub fn with_cookie_store(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_store = Some(jar);
        self
    }

    /// Sets how many retries follow the first attempt.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Sets the fixed wait before every attempt, in milliseconds.
    pub fn with_retry_interval_ms(mut self, retry_interval_ms: u64) -> Self {
        self.retry_interval = Duration::from_millis(retry_interval_ms);
        self
    }

    /// Total number of sends the retry budget allows.
    pub fn max_attempts(&self) -> u64 {
        u64::from(self.retry_count) + 1
    }

    /// Outgoing `Content-Type` value, if a body is present and a type is declared.
    pub(crate) fn content_type_header(&self) -> Option<String> {
        self.body.as_ref()?;
        let content_type = self
            .request_content_type
            .as_deref()
            .filter(|value| !value.trim().is_empty())?;
        match self.encoding.as_deref().filter(|value| !value.is_empty()) {
            Some(charset) => Some(format!("{content_type}; charset={charset}")),
            None => Some(content_type.to_owned()),
        }
    }

    /// Response content type, if declared and non-empty.
    pub(crate) fn accept_header(&self) -> Option<&str> {
        self.response_content_type
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::Method;
    use serde_json::json;

    use crate::{CompletionMode, RequestOptions};

    #[test]
    fn defaults_follow_documented_policy() {
        let options = RequestOptions::new("http://localhost/api");
        assert_eq!(options.method, Method::POST);
        assert_eq!(options.retry_count, 3);
        assert_eq!(options.retry_interval, Duration::from_millis(1_000));
        assert_eq!(options.max_attempts(), 4);
        assert_eq!(options.encoding.as_deref(), Some("utf-8"));
        assert!(options.timeout.is_none());
        assert_eq!(CompletionMode::default(), CompletionMode::BufferContent);
    }

    #[test]
    fn content_type_carries_charset() {
        let options = RequestOptions::new("http://localhost").with_text_body("hi");
        assert_eq!(
            options.content_type_header().as_deref(),
            Some("text/plain; charset=utf-8")
        );

        let bare = options.with_encoding(None);
        assert_eq!(bare.content_type_header().as_deref(), Some("text/plain"));
    }

    #[test]
    fn content_type_requires_body() {
        let options =
            RequestOptions::new("http://localhost").with_request_content_type("application/json");
        assert!(options.content_type_header().is_none());
    }

    #[test]
    fn json_body_sets_payload_and_type() {
        let options = RequestOptions::new("http://localhost")
            .with_json_body(&json!({"a": 1}))
            .expect("must serialize");
        assert_eq!(options.body.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(
            options.request_content_type.as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn blank_response_content_type_is_ignored() {
        let options = RequestOptions::get("http://localhost").with_response_content_type("  ");
        assert!(options.accept_header().is_none());
        assert_eq!(options.method, Method::GET);
    }
}
