//! HTTP transport types and the blocking transport behind `Open311Client`.
//!
//! # Design
//! Requests and responses are plain data. The client builds an `HttpRequest`,
//! hands it to a `Transport`, and interprets the returned `HttpResponse`, so
//! everything up to the wire stays deterministic and testable with a fake
//! transport. `UreqTransport` is the real one.
//!
//! Status codes are returned as data, never as transport errors. The client
//! decides what a 404 or a 500 means.

use std::fmt;

use crate::error::ApiError;

/// HTTP method for a request. Open311 reads are GET only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

/// An HTTP request described as plain data.
///
/// Built by `Open311Client::build_get`. `url` already carries the endpoint,
/// path segments and format suffix; `query` is encoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Proxy URL to route through, if the client was configured with one.
    pub proxy: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes one `HttpRequest` and blocks until the response arrives.
///
/// Implementations report connection-level failures as
/// `ApiError::TransportError` and return every status code as data.
pub trait Transport: fmt::Debug {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Largest response body `UreqTransport` will read.
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Blocking transport backed by `ureq`.
///
/// Builds a fresh agent per request with status-as-error disabled. When the
/// request names a proxy it replaces whatever proxy ureq would pick up from
/// the environment; otherwise ureq's defaults apply, including its timeouts.
///
/// Bodies are read as UTF-8 text up to `MAX_BODY_BYTES`. A body that is not
/// valid UTF-8 (for example ISO-8859-1 XML) or that exceeds the limit fails
/// with `ApiError::TransportError`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut config = ureq::Agent::config_builder().http_status_as_error(false);
        if let Some(uri) = request.proxy.as_deref() {
            config = config.proxy(Some(ureq::Proxy::new(uri)?));
        }
        let agent = config.build().new_agent();

        let pairs = request.query.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let mut response = match request.method {
            HttpMethod::Get => agent.get(&request.url).query_pairs(pairs).call()?,
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
