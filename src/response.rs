use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_util::{stream::BoxStream, Stream, StreamExt};
use reqwest::{header::HeaderMap, StatusCode, Url, Version};

/// Unmaterialized response returned by the attempt loop.
///
/// The caller owns it; dropping it releases the underlying connection.
pub struct RawResponse {
    url: Url,
    inner: reqwest::Response,
}

impl RawResponse {
    pub(crate) fn streaming(inner: reqwest::Response) -> Self {
        Self {
            url: inner.url().clone(),
            inner,
        }
    }

    /// Wraps a body that was already read to the end during the attempt.
    pub(crate) fn buffered(
        url: Url,
        status: StatusCode,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.version_mut() = version;
        *response.headers_mut() = headers;
        Self {
            url,
            inner: reqwest::Response::from(response),
        }
    }

    /// Status code of the response.
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// HTTP version the response was received with.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Reads the body as text, honoring the `charset` of `Content-Type`.
    pub async fn text(self) -> reqwest::Result<String> {
        self.inner.text().await
    }

    /// Reads the full body into memory.
    pub async fn bytes(self) -> reqwest::Result<Bytes> {
        self.inner.bytes().await
    }

    /// Hands the body over as a stream of chunks.
    pub fn into_stream(self) -> BodyStream {
        BodyStream {
            inner: self.inner.bytes_stream().boxed(),
        }
    }

    /// Gives up the wrapper and returns the transport response.
    pub fn into_inner(self) -> reqwest::Response {
        self.inner
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("url", &self.url.as_str())
            .field("status", &self.status())
            .field("headers", self.headers())
            .finish()
    }
}

/// Open response body stream; the holder owns its lifecycle.
pub struct BodyStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl BodyStream {
    /// Drains the remaining chunks into one buffer.
    pub async fn collect_bytes(mut self) -> reqwest::Result<Vec<u8>> {
        let mut collected = Vec::new();
        while let Some(chunk) = self.inner.next().await {
            collected.extend_from_slice(&chunk?);
        }
        Ok(collected)
    }
}

impl Stream for BodyStream {
    type Item = reqwest::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream").finish_non_exhaustive()
    }
}
