//! Payload - タスク body の表現
//!
//! mapping は JSON テキストにシリアライズしてから UTF-8 bytes にエンコードする。
//! raw text はそのまま UTF-8 bytes になる。

use serde::Serialize;
use serde_json::Value;

use super::errors::SubmitError;

pub type JsonMap = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    Json(JsonMap),
    Text(String),
}

impl Payload {
    /// 任意の Serialize 型から mapping payload を作る
    ///
    /// JSON object にならない値（配列、数値など）は InvalidRequest になる。
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, SubmitError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Payload::Json(map)),
            other => Err(SubmitError::invalid(format!(
                "payload must serialize to a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Json(_) => false,
            Payload::Text(text) => text.is_empty(),
        }
    }

    /// 転送用の bytes にエンコード
    pub fn encode(&self) -> Result<Vec<u8>, SubmitError> {
        match self {
            Payload::Empty => Ok(Vec::new()),
            Payload::Json(map) => Ok(serde_json::to_string(map)?.into_bytes()),
            Payload::Text(text) => Ok(text.clone().into_bytes()),
        }
    }

    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Payload::Empty => None,
            Payload::Json(_) => Some("application/json"),
            Payload::Text(_) => Some("text/plain; charset=utf-8"),
        }
    }
}

impl From<JsonMap> for Payload {
    fn from(map: JsonMap) -> Self {
        Payload::Json(map)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
