//! Execution result types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// An error reported by the executor for (part of) an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphError {
    pub message: String,
    /// Response path of the failing field, when known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

impl GraphError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    /// Attach the response path of the failing field.
    pub fn at<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }
}

/// Outcome of executing one operation.
///
/// `data` may be present together with `errors` when execution partially
/// succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphError>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ExecutionResult {
    /// A successful result carrying `data`.
    pub fn data(data: impl Into<Value>) -> Self {
        Self {
            data: Some(data.into()),
            ..Default::default()
        }
    }

    /// A failed result with no data.
    pub fn error(error: GraphError) -> Self {
        Self {
            errors: vec![error],
            ..Default::default()
        }
    }

    /// Add an error (builder style), e.g. for partial results.
    pub fn with_error(mut self, error: GraphError) -> Self {
        self.errors.push(error);
        self
    }

    /// Whether the executor reported any error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render the result in its JSON response shape.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "data".to_string(),
            self.data
                .as_ref()
                .map(Value::to_json)
                .unwrap_or(serde_json::Value::Null),
        );
        if !self.errors.is_empty() {
            map.insert(
                "errors".to_string(),
                serde_json::to_value(&self.errors).unwrap_or(serde_json::Value::Null),
            );
        }
        if !self.extensions.is_empty() {
            map.insert(
                "extensions".to_string(),
                serde_json::Value::Object(self.extensions.clone().into_iter().collect()),
            );
        }
        serde_json::Value::Object(map)
    }
}
