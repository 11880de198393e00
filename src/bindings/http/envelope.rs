//! Uniform JSON response envelope.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::registry::TIMESTAMP_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// Body of every HTTP response.
///
/// `data` is always present and `null` when there is nothing to return.
/// `count`, `query`, `path` and `method` only appear when set.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub status: Outcome,
    pub message: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub timestamp: String,
}

impl Envelope {
    fn new(status: Outcome, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: Value::Null,
            count: None,
            query: None,
            path: None,
            method: None,
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Outcome::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Outcome::Error, message)
    }

    /// Attach a payload. Serialization failures degrade to `null`.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        self.data = serde_json::to_value(data).unwrap_or(Value::Null);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_route(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.path = Some(path.into());
        self
    }
}
