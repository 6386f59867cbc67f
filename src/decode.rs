//! Response materialization.
//!
//! A target type picks how the body is read: raw text, raw bytes and raw
//! streams are returned as-is, while [`Decoded<T>`] reads the text and
//! dispatches on the declared response content type.

use std::future::Future;

use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::{
    error::DecodeCause, plain, BodyStream, CompletionMode, RawResponse, RequestError, Result,
};

/// Decoding strategy selected by the declared response content type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseFormat {
    Json,
    Xml,
    Other,
}

impl ResponseFormat {
    /// Matches the media type, ignoring parameters and ASCII case.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Other;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        if essence.eq_ignore_ascii_case("application/json") {
            Self::Json
        } else if essence.eq_ignore_ascii_case("text/xml")
            || essence.eq_ignore_ascii_case("application/xml")
        {
            Self::Xml
        } else {
            Self::Other
        }
    }
}

/// Types a [`RawResponse`] can be materialized into.
pub trait FromResponse: Sized {
    /// Completion mode the executor should use when producing the response.
    const COMPLETION: CompletionMode = CompletionMode::BufferContent;

    fn from_response(
        response: RawResponse,
        content_type: Option<&str>,
    ) -> impl Future<Output = Result<Self>> + Send;
}

/// Structured decode target: JSON, XML or a plain-text primitive,
/// depending on the declared response content type.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Decoded<T>(pub T);

impl<T> Decoded<T> {
    /// Unwraps the decoded value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl FromResponse for String {
    async fn from_response(response: RawResponse, _content_type: Option<&str>) -> Result<Self> {
        let status = response.status();
        response.text().await.map_err(|err| body_error(status, err))
    }
}

impl FromResponse for Bytes {
    async fn from_response(response: RawResponse, _content_type: Option<&str>) -> Result<Self> {
        let status = response.status();
        response.bytes().await.map_err(|err| body_error(status, err))
    }
}

impl FromResponse for Vec<u8> {
    async fn from_response(response: RawResponse, content_type: Option<&str>) -> Result<Self> {
        Bytes::from_response(response, content_type)
            .await
            .map(|bytes| bytes.to_vec())
    }
}

impl FromResponse for BodyStream {
    const COMPLETION: CompletionMode = CompletionMode::HeadersOnly;

    async fn from_response(response: RawResponse, _content_type: Option<&str>) -> Result<Self> {
        Ok(response.into_stream())
    }
}

impl<T: DeserializeOwned + Send> FromResponse for Decoded<T> {
    async fn from_response(response: RawResponse, content_type: Option<&str>) -> Result<Self> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| body_error(status, err))?;
        decode_text(&text, ResponseFormat::from_content_type(content_type))
            .map(Decoded)
            .map_err(|source| RequestError::DecodeFailed { status, source })
    }
}

/// Materializes `response` into `T` once; failures are never retried.
pub async fn decode<T: FromResponse>(
    response: RawResponse,
    content_type: Option<&str>,
) -> Result<T> {
    T::from_response(response, content_type).await
}

pub(crate) fn decode_text<T: DeserializeOwned>(
    text: &str,
    format: ResponseFormat,
) -> std::result::Result<T, DecodeCause> {
    match format {
        ResponseFormat::Json => serde_json::from_str(text).map_err(DecodeCause::Json),
        ResponseFormat::Xml => quick_xml::de::from_str(text).map_err(DecodeCause::Xml),
        ResponseFormat::Other => plain::from_text(text).map_err(DecodeCause::Conversion),
    }
}

fn body_error(status: StatusCode, err: reqwest::Error) -> RequestError {
    RequestError::DecodeFailed {
        status,
        source: DecodeCause::Body(err),
    }
}
