//! Blocking client for an Open311 (GeoReport v2) endpoint.
//!
//! # Design
//! `Open311Client` keeps the keywords it was constructed with and an active
//! `Config` derived from them. Every call goes through `build_get`, which
//! produces a plain `HttpRequest`, then through the injected `Transport`.
//! Bodies come back raw; `decode` turns them into structured values on
//! request. Failures propagate unchanged and nothing is retried.
//!
//! `build_path` appends a trailing `/` to the stored endpoint when it is
//! missing, so path-building methods take `&mut self`.

use tracing::debug;

use crate::config::{Config, Environment, Keywords, Overrides, ProcessEnv};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::Decoded;

const JURISDICTION_PARAM: &str = "jurisdiction_id";
const API_KEY_PARAM: &str = "api_key";

/// Synchronous client for one Open311 deployment.
///
/// Not safe to share between threads without external locking: path
/// building mutates the stored endpoint.
#[derive(Debug)]
pub struct Open311Client {
    keywords: Keywords,
    config: Config,
    env: Box<dyn Environment>,
    transport: Box<dyn Transport>,
}

impl Open311Client {
    /// Create a client that reads the process environment and talks HTTP
    /// through `ureq`. A non-empty `endpoint` replaces `keywords.endpoint`.
    pub fn new(keywords: Keywords, endpoint: Option<&str>) -> Self {
        Self::with_parts(keywords, endpoint, Box::new(ProcessEnv), Box::new(UreqTransport))
    }

    /// Create a client with an explicit environment reader and transport.
    pub fn with_parts(
        mut keywords: Keywords,
        endpoint: Option<&str>,
        env: Box<dyn Environment>,
        transport: Box<dyn Transport>,
    ) -> Self {
        if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
            keywords.endpoint = endpoint.to_string();
        }
        let config = Config::resolve(&keywords, env.as_ref());
        let client = Self {
            keywords,
            config,
            env,
            transport,
        };
        client.log_config();
        client
    }

    /// The keywords captured at construction.
    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    /// The active settings.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the active settings. `reset` undoes any change.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Re-resolve the active settings from the construction keywords with
    /// `overrides` applied on top. The stored keywords are not modified.
    pub fn configure(&mut self, overrides: &Overrides) {
        let merged = self.keywords.merge(overrides);
        self.config = Config::resolve(&merged, self.env.as_ref());
        self.log_config();
    }

    /// Restore the active settings to what the construction keywords produce.
    pub fn reset(&mut self) {
        self.configure(&Overrides::default());
    }

    /// Join non-empty `segments` onto the endpoint and append `.{format}`.
    ///
    /// Stores the endpoint with a trailing `/` if it lacked one. The result is
    /// not validated as a URL.
    pub fn build_path(&mut self, segments: &[&str]) -> String {
        if !self.config.endpoint.ends_with('/') {
            self.config.endpoint.push('/');
        }
        let path = segments
            .iter()
            .filter(|segment| !segment.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        format!("{}{}.{}", self.config.endpoint, path, self.config.format)
    }

    /// Build the GET request for `segments` without executing it.
    ///
    /// Caller query pairs come first, in order. `jurisdiction_id` and
    /// `api_key` are appended from the active settings when set, unless the
    /// caller already supplied that key.
    pub fn build_get(&mut self, segments: &[&str], query: &[(&str, &str)]) -> HttpRequest {
        let url = self.build_path(segments);

        let mut pairs: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let defaults = [
            (JURISDICTION_PARAM, &self.config.jurisdiction),
            (API_KEY_PARAM, &self.config.api_key),
        ];
        for (key, value) in defaults {
            if !value.is_empty() && !pairs.iter().any(|(k, _)| k == key) {
                pairs.push((key.to_string(), value.clone()));
            }
        }

        HttpRequest {
            method: HttpMethod::Get,
            url,
            query: pairs,
            proxy: self.config.proxy().map(str::to_string),
        }
    }

    /// GET `path` with `query` and return the raw body.
    ///
    /// The body is returned as text. With the default transport a non-UTF-8
    /// or oversized body is a `TransportError`; see `UreqTransport`.
    pub fn get(&mut self, path: &str, query: &[(&str, &str)]) -> Result<String, ApiError> {
        self.fetch(&[path], query)
    }

    /// Decode a body according to the active format.
    ///
    /// Only JSON is parsed. Any other format, XML included, is returned as
    /// `Decoded::Raw` unchanged.
    pub fn decode(&self, content: &str) -> Result<Decoded, ApiError> {
        if self.config.format == "json" {
            Ok(Decoded::Json(serde_json::from_str(content)?))
        } else {
            Ok(Decoded::Raw(content.to_string()))
        }
    }

    /// Fetch the endpoint's discovery document.
    pub fn discovery(&mut self) -> Result<String, ApiError> {
        self.fetch(&["discovery"], &[])
    }

    /// Fetch the service list, or one service definition when `code` is set.
    pub fn services(&mut self, code: Option<&str>) -> Result<String, ApiError> {
        self.fetch(&["services", code.unwrap_or_default()], &[])
    }

    fn fetch(&mut self, segments: &[&str], query: &[(&str, &str)]) -> Result<String, ApiError> {
        let request = self.build_get(segments, query);
        debug!(url = %request.url, params = request.query.len(), "GET");
        let response = self.transport.execute(&request)?;
        debug!(url = %request.url, status = response.status, "response");
        check_status(&response)?;
        Ok(response.body)
    }

    fn log_config(&self) {
        debug!(
            endpoint = %self.config.endpoint,
            format = %self.config.format,
            jurisdiction = %self.config.jurisdiction,
            has_api_key = !self.config.api_key.is_empty(),
            "configured Open311 client"
        );
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        404 => Err(ApiError::NotFound),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;
    use crate::config::API_KEY_VAR;

    /// Records every request and answers with a canned response.
    #[derive(Debug, Clone)]
    struct FakeTransport {
        log: Rc<RefCell<Vec<HttpRequest>>>,
        status: u16,
        body: String,
        refuse: bool,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                log: Rc::default(),
                status,
                body: body.to_string(),
                refuse: false,
            }
        }

        fn refusing() -> Self {
            Self {
                refuse: true,
                ..Self::replying(200, "")
            }
        }

        fn last_request(&self) -> HttpRequest {
            self.log.borrow().last().cloned().expect("no request recorded")
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.log.borrow_mut().push(request.clone());
            if self.refuse {
                let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
                return Err(ApiError::TransportError(Box::new(err)));
            }
            Ok(HttpResponse {
                status: self.status,
                headers: Vec::new(),
                body: self.body.clone(),
            })
        }
    }

    fn client_with(keywords: Keywords, env: HashMap<String, String>, transport: FakeTransport) -> Open311Client {
        Open311Client::with_parts(keywords, None, Box::new(env), Box::new(transport))
    }

    fn client() -> Open311Client {
        client_with(
            Keywords::default().with_endpoint("http://example.org/api"),
            HashMap::new(),
            FakeTransport::replying(200, "[]"),
        )
    }

    #[test]
    fn build_path_appends_format() {
        let mut c = client();
        assert_eq!(c.build_path(&["discovery"]), "http://example.org/api/discovery.json");
    }

    #[test]
    fn build_path_normalizes_endpoint_once() {
        let mut c = client();
        let first = c.build_path(&["services"]);
        let second = c.build_path(&["services"]);
        assert_eq!(first, second);
        assert_eq!(c.config().endpoint, "http://example.org/api/");
    }

    #[test]
    fn build_path_keeps_existing_trailing_slash() {
        let mut c = client_with(
            Keywords::default().with_endpoint("http://example.org/api/"),
            HashMap::new(),
            FakeTransport::replying(200, ""),
        );
        assert_eq!(c.build_path(&["services"]), "http://example.org/api/services.json");
    }

    #[test]
    fn build_path_filters_empty_segments() {
        let mut c = client();
        assert_eq!(c.build_path(&["services", ""]), c.build_path(&["services"]));
        assert_eq!(c.build_path(&["", "services", "", "033"]), "http://example.org/api/services/033.json");
    }

    #[test]
    fn build_path_uses_active_format() {
        let mut c = client();
        c.configure(&Overrides::default().with_format("xml"));
        assert_eq!(c.build_path(&["services"]), "http://example.org/api/services.xml");
    }

    #[test]
    fn endpoint_argument_replaces_keyword() {
        let c = Open311Client::with_parts(
            Keywords::default().with_endpoint("http://old.example/"),
            Some("http://new.example/"),
            Box::new(HashMap::new()),
            Box::new(FakeTransport::replying(200, "")),
        );
        assert_eq!(c.keywords().endpoint, "http://new.example/");
        assert_eq!(c.config().endpoint, "http://new.example/");
    }

    #[test]
    fn empty_endpoint_argument_is_ignored() {
        let c = Open311Client::with_parts(
            Keywords::default().with_endpoint("http://old.example/"),
            Some(""),
            Box::new(HashMap::new()),
            Box::new(FakeTransport::replying(200, "")),
        );
        assert_eq!(c.config().endpoint, "http://old.example/");
    }

    #[test]
    fn api_key_comes_from_environment_when_unset() {
        let env = HashMap::from([(API_KEY_VAR.to_string(), "env-key".to_string())]);
        let c = client_with(Keywords::default(), env, FakeTransport::replying(200, ""));
        assert_eq!(c.config().api_key, "env-key");
    }

    #[test]
    fn configure_overrides_only_active_settings() {
        let mut c = client_with(
            Keywords::default()
                .with_endpoint("http://example.org/api")
                .with_jurisdiction("example.org"),
            HashMap::new(),
            FakeTransport::replying(200, ""),
        );
        c.configure(&Overrides::default().with_format("xml").with_jurisdiction("other.org"));
        assert_eq!(c.config().format, "xml");
        assert_eq!(c.config().jurisdiction, "other.org");
        assert_eq!(c.keywords().jurisdiction, "example.org");
        assert_eq!(c.keywords().format, "");

        c.configure(&Overrides::default());
        assert_eq!(c.config().format, "json");
        assert_eq!(c.config().jurisdiction, "example.org");
    }

    #[test]
    fn reset_restores_construction_settings() {
        let mut c = client();
        let original = c.config().clone();

        c.config_mut().format = "xml".to_string();
        c.config_mut().endpoint = "http://elsewhere.example/".to_string();
        c.config_mut().api_key = "temporary".to_string();
        c.reset();

        assert_eq!(c.config(), &original);
    }

    #[test]
    fn build_get_appends_jurisdiction_and_api_key() {
        let mut c = client_with(
            Keywords::default()
                .with_endpoint("http://example.org/api")
                .with_jurisdiction("example.org")
                .with_api_key("secret"),
            HashMap::new(),
            FakeTransport::replying(200, ""),
        );
        let req = c.build_get(&["requests"], &[("status", "open")]);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://example.org/api/requests.json");
        assert_eq!(
            req.query,
            vec![
                ("status".to_string(), "open".to_string()),
                ("jurisdiction_id".to_string(), "example.org".to_string()),
                ("api_key".to_string(), "secret".to_string()),
            ]
        );
        assert!(req.proxy.is_none());
    }

    #[test]
    fn build_get_keeps_caller_jurisdiction() {
        let mut c = client_with(
            Keywords::default()
                .with_endpoint("http://example.org/api")
                .with_jurisdiction("example.org"),
            HashMap::new(),
            FakeTransport::replying(200, ""),
        );
        let req = c.build_get(&["services"], &[("jurisdiction_id", "other.org")]);
        assert_eq!(req.query, vec![("jurisdiction_id".to_string(), "other.org".to_string())]);
    }

    #[test]
    fn build_get_without_settings_sends_no_params() {
        let req = client().build_get(&["services"], &[]);
        assert!(req.query.is_empty());
    }

    #[test]
    fn build_get_carries_proxy() {
        let mut c = client_with(
            Keywords::default()
                .with_endpoint("http://example.org/api")
                .with_proxy("http://proxy.local:3128"),
            HashMap::new(),
            FakeTransport::replying(200, ""),
        );
        let req = c.build_get(&["services"], &[]);
        assert_eq!(req.proxy.as_deref(), Some("http://proxy.local:3128"));
    }

    #[test]
    fn get_returns_raw_body() {
        let transport = FakeTransport::replying(200, r#"[{"service_code":"001"}]"#);
        let mut c = client_with(
            Keywords::default().with_endpoint("http://example.org/api"),
            HashMap::new(),
            transport.clone(),
        );
        let body = c.get("requests", &[("status", "open")]).unwrap();
        assert_eq!(body, r#"[{"service_code":"001"}]"#);

        let req = transport.last_request();
        assert_eq!(req.url, "http://example.org/api/requests.json");
        assert_eq!(req.query, vec![("status".to_string(), "open".to_string())]);
    }

    #[test]
    fn discovery_builds_path_once() {
        let transport = FakeTransport::replying(200, "{}");
        let mut c = client_with(
            Keywords::default().with_endpoint("http://example.org/api"),
            HashMap::new(),
            transport.clone(),
        );
        c.discovery().unwrap();
        assert_eq!(transport.last_request().url, "http://example.org/api/discovery.json");
    }

    #[test]
    fn services_with_and_without_code() {
        let transport = FakeTransport::replying(200, "[]");
        let mut c = client_with(
            Keywords::default().with_endpoint("http://example.org/api"),
            HashMap::new(),
            transport.clone(),
        );
        c.services(None).unwrap();
        assert_eq!(transport.last_request().url, "http://example.org/api/services.json");

        c.services(Some("033")).unwrap();
        assert_eq!(transport.last_request().url, "http://example.org/api/services/033.json");

        c.services(Some("")).unwrap();
        assert_eq!(transport.last_request().url, "http://example.org/api/services.json");
    }

    #[test]
    fn not_found_status_maps_to_not_found() {
        let mut c = client_with(
            Keywords::default().with_endpoint("http://example.org/api"),
            HashMap::new(),
            FakeTransport::replying(404, "[]"),
        );
        let err = c.services(Some("999")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn server_error_keeps_status_and_body() {
        let mut c = client_with(
            Keywords::default().with_endpoint("http://example.org/api"),
            HashMap::new(),
            FakeTransport::replying(500, "internal error"),
        );
        let err = c.discovery().unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, ref body } if body == "internal error"));
    }

    #[test]
    fn transport_failure_propagates() {
        let mut c = client_with(
            Keywords::default().with_endpoint("http://example.org/api"),
            HashMap::new(),
            FakeTransport::refusing(),
        );
        let err = c.get("services", &[]).unwrap_err();
        assert!(matches!(err, ApiError::TransportError(_)));
    }

    #[test]
    fn decode_parses_json() {
        let decoded = client().decode(r#"{"a": 1}"#).unwrap();
        assert_eq!(decoded, Decoded::Json(serde_json::json!({"a": 1})));
        assert_eq!(decoded.as_json().unwrap()["a"], 1);
        assert!(decoded.as_raw().is_none());
    }

    #[test]
    fn decode_rejects_bad_json() {
        let err = client().decode("not json").unwrap_err();
        assert!(matches!(err, ApiError::ParseError(_)));
    }

    #[test]
    fn decode_passes_other_formats_through() {
        let mut c = client();
        c.configure(&Overrides::default().with_format("xml"));
        let decoded = c.decode("<services/>").unwrap();
        assert_eq!(decoded.as_raw(), Some("<services/>"));

        let decoded = c.decode("not json either").unwrap();
        assert_eq!(decoded, Decoded::Raw("not json either".to_string()));
    }
}
