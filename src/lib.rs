//! `retrying-request` executes declarative HTTP requests with a bounded,
//! fixed-interval retry loop and materializes the response body into a
//! caller-chosen type.
//!
//! - [`RequestExecutor::execute`] returns the raw response of the first
//!   attempt with a success status.
//! - [`RequestExecutor::execute_typed`] decodes it into raw text, bytes,
//!   a body stream, or a [`Decoded`] value picked by the declared response
//!   content type (JSON, XML or a plain-text primitive).
//!
//! ```no_run
//! use retrying_request::{RequestExecutor, RequestOptions};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Health {
//!     status: String,
//! }
//!
//! # async fn run() -> retrying_request::Result<()> {
//! let options = RequestOptions::get("https://example.com/health")
//!     .with_response_content_type("application/json")
//!     .with_retry_count(2)
//!     .with_retry_interval_ms(500);
//!
//! let health: Health = RequestExecutor::new().execute_decoded(&options).await?;
//! println!("{}", health.status);
//! # Ok(())
//! # }
//! ```

mod client;
mod decode;
mod environment;
mod error;
mod options;
mod plain;
mod response;

pub mod pacing;

pub use client::RequestExecutor;
pub use decode::{decode, Decoded, FromResponse, ResponseFormat};
pub use environment::{Environment, ENVIRONMENT_VAR};
pub use error::{DecodeCause, RequestError, TransportErrorKind};
pub use options::{
    CompletionMode, Decompression, RequestOptions, DEFAULT_ENCODING, DEFAULT_RETRY_COUNT,
    DEFAULT_RETRY_INTERVAL_MS,
};
pub use plain::ConversionError;
pub use response::{BodyStream, RawResponse};

/// Re-exported so callers can share a cookie store without naming `reqwest`.
pub use reqwest::cookie::Jar as CookieJar;

pub type Result<T> = std::result::Result<T, RequestError>;
