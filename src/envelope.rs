//! Response envelope returned by every admin API endpoint.
//!
//! ```json
//! { "data": <any>, "message": "...", "succeeded": true }
//! ```
//!
//! `data` is untyped on the wire and its shape depends on the endpoint, so it
//! is modelled as [`Payload`]. Renderers match on the shape and fall back
//! gracefully instead of assuming one. Numbers always arrive as JSON floats.

use serde::Deserialize;
use serde_json::{Map, Value};

/// The `data` member of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `null` or missing.
    Absent,
    /// Anything that is not an object: string, number, bool or array.
    Scalar(Value),
    /// A JSON object; its layout is endpoint-specific.
    Mapping(Map<String, Value>),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Absent,
            Value::Object(map) => Payload::Mapping(map),
            other => Payload::Scalar(other),
        }
    }
}

impl Payload {
    pub fn as_mapping(&self) -> Option<&Map<String, Value>> {
        match self {
            Payload::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// A non-empty mapping, or `None` for every other shape.
    pub fn entries(&self) -> Option<&Map<String, Value>> {
        self.as_mapping().filter(|m| !m.is_empty())
    }

    /// String field of a mapping payload.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.as_mapping()?.get(key)?.as_str()
    }

    /// Numeric field of a mapping payload coerced to a count.
    ///
    /// Accepts any finite, non-negative, integral JSON number (`3` or `3.0`).
    pub fn count_field(&self, key: &str) -> Option<u64> {
        let n = self.as_mapping()?.get(key)?.as_f64()?;
        if !(n.is_finite() && n >= 0.0 && n.fract() == 0.0) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = n as u64;
        Some(count)
    }
}

/// Decoded admin API response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub succeeded: bool,
    pub message: String,
    pub data: Payload,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    succeeded: Option<bool>,
}

impl Envelope {
    /// Decode a response body. Missing or `null` members take their zero value.
    pub fn decode(body: &str) -> Result<Self, serde_json::Error> {
        let raw: RawEnvelope = serde_json::from_str(body)?;
        Ok(Self {
            succeeded: raw.succeeded.unwrap_or_default(),
            message: raw.message.unwrap_or_default(),
            data: Payload::from(raw.data),
        })
    }
}

/// Text form of a loosely-typed field: strings unquoted, missing fields as `<unknown>`.
pub fn display_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "<unknown>".to_string(),
        Some(other) => other.to_string(),
    }
}
