use std::fmt;

use reqwest::StatusCode;

use crate::plain::ConversionError;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The retry budget ran out without a success status.
    #[error("request failed ({kind}): {message}")]
    RequestFailed {
        /// Last classified transport error kind.
        kind: TransportErrorKind,
        message: String,
        /// Last transport error observed, if any attempt raised one.
        #[source]
        source: Option<reqwest::Error>,
        /// Status code of the last response received, if any.
        status: Option<StatusCode>,
    },
    /// A successful response could not be materialized into the target type.
    #[error("failed to decode response with status {status}: {source}")]
    DecodeFailed {
        status: StatusCode,
        #[source]
        source: DecodeCause,
    },
    /// Options could not be turned into an outgoing request.
    #[error("invalid request options: {0}")]
    InvalidOptions(String),
    /// The transport client could not be constructed.
    #[error("failed to build transport client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl RequestError {
    /// Status code carried by the error, if one was observed.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RequestFailed { status, .. } => *status,
            Self::DecodeFailed { status, .. } => Some(*status),
            Self::InvalidOptions(_) | Self::ClientBuild(_) => None,
        }
    }
}

/// Underlying reason for [`RequestError::DecodeFailed`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeCause {
    #[error("reading body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("invalid XML: {0}")]
    Xml(#[source] quick_xml::DeError),
    #[error("conversion: {0}")]
    Conversion(#[source] ConversionError),
}

/// Best-effort classification of a transport failure.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum TransportErrorKind {
    #[default]
    Unknown,
    Timeout,
    Connect,
    Redirect,
    Request,
    Body,
    Decode,
    Builder,
}

impl TransportErrorKind {
    /// Classifies a `reqwest` error, or `None` when no predicate matches.
    pub fn classify(err: &reqwest::Error) -> Option<Self> {
        // Timeouts are also reported as request/connect errors; check first.
        if err.is_timeout() {
            Some(Self::Timeout)
        } else if err.is_connect() {
            Some(Self::Connect)
        } else if err.is_redirect() {
            Some(Self::Redirect)
        } else if err.is_body() {
            Some(Self::Body)
        } else if err.is_decode() {
            Some(Self::Decode)
        } else if err.is_builder() {
            Some(Self::Builder)
        } else if err.is_request() {
            Some(Self::Request)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Redirect => "redirect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Builder => "builder",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
