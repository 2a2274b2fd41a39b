use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::DecodeError;

/// The part of an in-flight bus message the route gate looks at.
///
/// The bus message carries many more fields (`reg_type`, `isValid`,
/// `internalError`, `retryCount`, ...). They are ignored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEvent {
    #[serde(rename = "rid", alias = "recordId", default, deserialize_with = "rid_as_text")]
    pub record_id: String,

    #[serde(default, deserialize_with = "scalar_tags")]
    pub tags: HashMap<String, String>,
}

impl RecordEvent {
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Value of `key`, or `None` when the tag is absent or empty.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Decode a raw message body into a [`RecordEvent`].
pub fn decode(raw: &[u8]) -> Result<RecordEvent, DecodeError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject(json_kind(&value)));
    }
    serde_json::from_value(value).map_err(|e| DecodeError::InvalidField(e.to_string()))
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Scalars become their text form; null, arrays and objects are dropped.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn rid_as_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn scalar_tags<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error> {
    let raw = Option::<serde_json::Map<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| scalar_text(v).map(|v| (k, v)))
        .collect())
}

/// A message as handed over by the bus transport: the body plus the
/// address it was consumed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEnvelope {
    pub channel: String,
    pub body: MessageBody,
}

/// Message body, either the raw text off the wire or an inline JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Raw(String),
    Inline(Value),
}

impl MessageBody {
    pub fn as_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            MessageBody::Raw(text) => Cow::Borrowed(text.as_bytes()),
            MessageBody::Inline(value) => Cow::Owned(value.to_string().into_bytes()),
        }
    }
}
