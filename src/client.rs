use std::fmt;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, Request, StatusCode, Url,
};
use serde::de::DeserializeOwned;

use crate::{
    decode::{self, Decoded, FromResponse},
    pacing::{Clock, Ticker, TokioClock},
    CompletionMode, Environment, RawResponse, RequestError, RequestOptions, Result,
    TransportErrorKind,
};

/// Runs declarative requests through a bounded, fixed-interval retry loop.
///
/// Every call builds its own transport client from the options, so one
/// executor can be shared freely between tasks.
#[derive(Clone, Default)]
pub struct RequestExecutor<C = TokioClock> {
    environment: Environment,
    clock: C,
}

impl<C> fmt::Debug for RequestExecutor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Creates a production executor paced by the tokio timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor whose environment comes from `RETRYING_REQUEST_ENV`.
    pub fn from_env() -> Self {
        Self::new().with_environment(Environment::from_env())
    }
}

impl<C: Clock> RequestExecutor<C> {
    /// Sets the hosting environment policy.
    ///
    /// [`Environment::Development`] disables certificate validation.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Replaces the clock that paces attempts.
    pub fn with_clock<K: Clock>(self, clock: K) -> RequestExecutor<K> {
        RequestExecutor {
            environment: self.environment,
            clock,
        }
    }

    /// Environment policy applied to every transport client this executor builds.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Executes the request, buffering the body inside each attempt.
    pub async fn execute(&self, options: &RequestOptions) -> Result<RawResponse> {
        self.execute_with(options, CompletionMode::BufferContent)
            .await
    }

    /// Executes the request with an explicit completion mode.
    ///
    /// Any transport error or non-success status consumes one attempt.
    /// After `retry_count + 1` attempts without success the call fails with
    /// [`RequestError::RequestFailed`]. The returned response is owned by
    /// the caller.
    pub async fn execute_with(
        &self,
        options: &RequestOptions,
        completion: CompletionMode,
    ) -> Result<RawResponse> {
        let client = self.build_client(options)?;
        let request = build_request(&client, options)?;
        let mut ticker = self.clock.ticker(options.retry_interval);

        let max_attempts = options.max_attempts();
        let mut attempts = 0u64;
        let mut kind: Option<TransportErrorKind> = None;
        let mut last_error: Option<reqwest::Error> = None;
        let mut last_status: Option<StatusCode> = None;

        while attempts < max_attempts {
            ticker.tick().await;
            attempts += 1;

            let outgoing = request.try_clone().ok_or_else(|| {
                RequestError::InvalidOptions("request body cannot be replayed".to_owned())
            })?;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %options.method,
                url = %options.url,
                attempt = attempts,
                max_attempts,
                "sending request"
            );

            match send_attempt(&client, outgoing, completion).await {
                AttemptOutcome::Success(response) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        status = %response.status(),
                        attempt = attempts,
                        "request succeeded"
                    );
                    return Ok(response);
                }
                AttemptOutcome::NonSuccessStatus(response) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        status = %response.status(),
                        attempt = attempts,
                        "non-success status"
                    );
                    last_status = Some(response.status());
                }
                AttemptOutcome::TransportFailure(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %err, attempt = attempts, "transport failure");
                    if let Some(classified) = TransportErrorKind::classify(&err) {
                        kind = Some(classified);
                    }
                    last_error = Some(err);
                }
            }
        }

        let kind = kind.unwrap_or_default();
        #[cfg(feature = "tracing")]
        tracing::warn!(
            url = %options.url,
            attempts,
            %kind,
            status = ?last_status,
            "retry budget exhausted"
        );

        Err(RequestError::RequestFailed {
            kind,
            message: format!("retry budget exhausted after {attempts} attempts"),
            source: last_error,
            status: last_status,
        })
    }

    /// Executes the request and materializes the body into `T`.
    ///
    /// Decoding happens once, after a success status; decode failures are
    /// returned as [`RequestError::DecodeFailed`] and never retried.
    pub async fn execute_typed<T: FromResponse>(&self, options: &RequestOptions) -> Result<T> {
        let response = self.execute_with(options, T::COMPLETION).await?;
        decode::decode(response, options.response_content_type.as_deref()).await
    }

    /// Shorthand for `execute_typed::<Decoded<T>>`.
    pub async fn execute_decoded<T: DeserializeOwned + Send>(
        &self,
        options: &RequestOptions,
    ) -> Result<T> {
        self.execute_typed::<Decoded<T>>(options)
            .await
            .map(Decoded::into_inner)
    }

    fn build_client(&self, options: &RequestOptions) -> Result<Client> {
        let mut builder = Client::builder();

        if let Some(decompression) = options.decompression {
            builder = builder
                .gzip(decompression.gzip)
                .deflate(decompression.deflate)
                .brotli(decompression.brotli);
        }
        if let Some(jar) = &options.cookie_store {
            builder = builder.cookie_provider(jar.clone());
        }
        if self.environment.is_development() {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(RequestError::ClientBuild)
    }
}

/// Result of a single send, used only to steer the loop.
enum AttemptOutcome {
    Success(RawResponse),
    TransportFailure(reqwest::Error),
    NonSuccessStatus(RawResponse),
}

async fn send_attempt(
    client: &Client,
    request: Request,
    completion: CompletionMode,
) -> AttemptOutcome {
    let response = match client.execute(request).await {
        Ok(response) => response,
        Err(err) => return AttemptOutcome::TransportFailure(err),
    };

    let response = match completion {
        CompletionMode::HeadersOnly => RawResponse::streaming(response),
        CompletionMode::BufferContent => {
            let url = response.url().clone();
            let status = response.status();
            let version = response.version();
            let headers = response.headers().clone();
            match response.bytes().await {
                Ok(body) => RawResponse::buffered(url, status, version, headers, body),
                Err(err) => return AttemptOutcome::TransportFailure(err),
            }
        }
    };

    if response.is_success() {
        AttemptOutcome::Success(response)
    } else {
        AttemptOutcome::NonSuccessStatus(response)
    }
}

fn build_request(client: &Client, options: &RequestOptions) -> Result<Request> {
    if options.retry_interval.is_zero() {
        return Err(RequestError::InvalidOptions(
            "retry interval must be greater than zero".to_owned(),
        ));
    }

    let url = Url::parse(&options.url).map_err(|err| {
        RequestError::InvalidOptions(format!("invalid url '{}': {err}", options.url))
    })?;

    let mut builder = client
        .request(options.method.clone(), url)
        .headers(build_headers(options)?);
    if let Some(body) = &options.body {
        builder = builder.body(body.clone());
    }

    builder.build().map_err(|err| {
        RequestError::InvalidOptions(format!("request could not be assembled: {err}"))
    })
}

fn build_headers(options: &RequestOptions) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(options.headers.len() + 2);

    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            RequestError::InvalidOptions(format!("invalid header name '{name}': {err}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| {
            RequestError::InvalidOptions(format!("invalid value for header '{name}': {err}"))
        })?;
        headers.append(header_name, header_value);
    }

    if let Some(content_type) = options.content_type_header() {
        let value = HeaderValue::from_str(&content_type).map_err(|err| {
            RequestError::InvalidOptions(format!("invalid content type '{content_type}': {err}"))
        })?;
        headers.insert(CONTENT_TYPE, value);
    }

    if let Some(accept) = options.accept_header() {
        let value = HeaderValue::from_str(accept).map_err(|err| {
            RequestError::InvalidOptions(format!("invalid response content type '{accept}': {err}"))
        })?;
        headers.append(ACCEPT, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use reqwest::header::{ACCEPT, CONTENT_TYPE};

    use super::{build_headers, build_request, RequestExecutor};
    use crate::{Environment, RequestError, RequestOptions};

    #[test]
    fn headers_include_content_type_and_accept() {
        let options = RequestOptions::new("http://localhost")
            .with_header("Accept", "text/plain")
            .with_header("X-Trace", "abc")
            .with_text_body("ping")
            .with_response_content_type("application/json");

        let headers = build_headers(&options).expect("headers must build");
        assert_eq!(headers["x-trace"], "abc");
        assert_eq!(headers[CONTENT_TYPE], "text/plain; charset=utf-8");
        let accept: Vec<_> = headers.get_all(ACCEPT).iter().collect();
        assert_eq!(accept, ["text/plain", "application/json"]);
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let options = RequestOptions::new("http://localhost").with_header("bad header", "x");
        let err = build_headers(&options).expect_err("must reject");
        assert!(matches!(err, RequestError::InvalidOptions(_)));
    }

    #[test]
    fn zero_retry_interval_is_rejected() {
        let client = reqwest::Client::new();
        let options = RequestOptions::new("http://localhost").with_retry_interval_ms(0);
        let err = build_request(&client, &options).expect_err("must reject");
        assert!(matches!(err, RequestError::InvalidOptions(_)));
    }

    #[test]
    fn relative_url_is_rejected() {
        let client = reqwest::Client::new();
        let options = RequestOptions::new("/relative/path");
        let err = build_request(&client, &options).expect_err("must reject");
        assert!(matches!(err, RequestError::InvalidOptions(_)));
    }

    #[test]
    fn request_carries_method_and_body() {
        let client = reqwest::Client::new();
        let options = RequestOptions::post("http://localhost/items").with_text_body("payload");
        let request = build_request(&client, &options).expect("request must build");
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/items");
        assert_eq!(
            request.body().and_then(|body| body.as_bytes()),
            Some(&b"payload"[..])
        );
        assert!(request.try_clone().is_some());
    }

    #[test]
    fn executor_defaults_to_production() {
        let executor = RequestExecutor::new();
        assert_eq!(executor.environment(), Environment::Production);
        let debug = format!("{executor:?}");
        assert!(debug.contains("Production"));

        let dev = executor.with_environment(Environment::Development);
        assert!(dev.environment().is_development());
    }
}
