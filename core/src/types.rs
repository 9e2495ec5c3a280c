//! Decoded response bodies.

use serde_json::Value;

/// The result of `Open311Client::decode`.
///
/// JSON bodies become a generic `serde_json::Value`; there is no schema.
/// Every other format is handed back untouched, XML included.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Json(Value),
    Raw(String),
}

impl Decoded {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Decoded::Json(value) => Some(value),
            Decoded::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Decoded::Json(_) => None,
            Decoded::Raw(content) => Some(content),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Decoded::Json(value) => Some(value),
            Decoded::Raw(_) => None,
        }
    }
}
