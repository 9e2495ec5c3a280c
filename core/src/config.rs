//! Client configuration: construction keywords, per-call overrides, and the
//! resolved active settings.
//!
//! # Design
//! `Keywords` is the full set of recognized options with empty-string
//! defaults. `Overrides` is a partial update where `Some` wins per key, even
//! `Some("")`. `Config::resolve` applies the two fallbacks: an empty api key
//! falls back to `OPEN311_API_KEY`, and an empty format falls back to `json`.
//! The environment is read through `Environment` so tests never touch
//! process state.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment variable consulted when no api key is configured.
pub const API_KEY_VAR: &str = "OPEN311_API_KEY";

/// Format used when none is configured.
pub const DEFAULT_FORMAT: &str = "json";

/// Read access to environment variables.
pub trait Environment: fmt::Debug {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Options captured at construction time. Unset options are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub endpoint: String,
    pub api_key: String,
    pub format: String,
    pub jurisdiction: String,
    pub proxy: String,
}

impl Keywords {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = jurisdiction.into();
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = proxy.into();
        self
    }

    /// Returns a copy with every `Some` override applied. `self` is untouched.
    pub fn merge(&self, overrides: &Overrides) -> Keywords {
        let pick = |keyword: &String, value: &Option<String>| {
            value.clone().unwrap_or_else(|| keyword.clone())
        };
        Keywords {
            endpoint: pick(&self.endpoint, &overrides.endpoint),
            api_key: pick(&self.api_key, &overrides.api_key),
            format: pick(&self.format, &overrides.format),
            jurisdiction: pick(&self.jurisdiction, &overrides.jurisdiction),
            proxy: pick(&self.proxy, &overrides.proxy),
        }
    }
}

/// Partial update applied on top of `Keywords` for a single `configure` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl Overrides {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = Some(jurisdiction.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// The active settings a client builds requests from.
///
/// `format` is never empty after `resolve`. Fields are public so callers can
/// adjust them in place; `Open311Client::reset` restores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub endpoint: String,
    pub api_key: String,
    pub format: String,
    pub jurisdiction: String,
    pub proxy: String,
}

impl Config {
    /// Resolve keywords into active settings, reading `OPEN311_API_KEY` once.
    pub fn resolve(keywords: &Keywords, env: &dyn Environment) -> Config {
        let api_key = if keywords.api_key.is_empty() {
            env.var(API_KEY_VAR).unwrap_or_default()
        } else {
            keywords.api_key.clone()
        };
        let format = if keywords.format.is_empty() {
            DEFAULT_FORMAT.to_string()
        } else {
            keywords.format.clone()
        };
        Config {
            endpoint: keywords.endpoint.clone(),
            api_key,
            format,
            jurisdiction: keywords.jurisdiction.clone(),
            proxy: keywords.proxy.clone(),
        }
    }

    /// The proxy URL, if one is set.
    pub fn proxy(&self) -> Option<&str> {
        Some(self.proxy.as_str()).filter(|p| !p.is_empty())
    }
}
