//! Blocking client for Open311 (GeoReport v2) civic-issue endpoints.
//!
//! # Overview
//! `Open311Client` turns an endpoint, format, jurisdiction and api key into
//! request URLs, performs GET requests, and returns raw bodies. `decode`
//! parses JSON bodies into `serde_json::Value` and passes every other format
//! through untouched.
//!
//! # Design
//! - Configuration is explicit: `Keywords` at construction, `Overrides` per
//!   `configure` call, `Config` as the resolved active settings.
//! - The environment (`OPEN311_API_KEY`) and the HTTP transport are injected
//!   via the `Environment` and `Transport` traits; `ProcessEnv` and
//!   `UreqTransport` are the defaults.
//! - Requests are built as plain `HttpRequest` values before any I/O, so the
//!   URL and query logic is testable without a server.
//! - Errors propagate unchanged. There are no retries, no pagination, and no
//!   response-schema validation.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::Open311Client;
pub use config::{Config, Environment, Keywords, Overrides, ProcessEnv, API_KEY_VAR};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport, MAX_BODY_BYTES};
pub use types::Decoded;
