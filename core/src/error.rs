//! Error types for the Open311 client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because an unknown service code or
//! jurisdiction comes back as 404 and callers usually want to tell that apart
//! from a broken server. Every other non-2xx response lands in `HttpError`
//! with the raw status and body. Nothing here is retried or recovered.

use thiserror::Error;

/// Errors returned by `Open311Client`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response: connection refused, DNS
    /// failure, timeout, or an unusable proxy.
    #[error("transport failed: {0}")]
    TransportError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// `decode` was asked for JSON and the body was not valid JSON.
    #[error("JSON parse failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::TransportError(Box::new(err))
    }
}
