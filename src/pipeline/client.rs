use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::engine::types::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to fetch a batch of telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSpec {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub body: Option<JsonValue>,
}

impl FetchSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: None,
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, method: HttpMethod, body: JsonValue) -> Self {
        self.method = method;
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Source of raw telemetry records.
#[async_trait]
pub trait ClientServer: Send + Sync {
    async fn fetch(&self, spec: &FetchSpec) -> Result<Vec<Record>, FetchError>;
}

/// Accepts a JSON array of objects, an object wrapping such an array under
/// `data`, or a single object.
pub fn records_from_json(value: JsonValue) -> Result<Vec<Record>, FetchError> {
    let items = match value {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => match map.remove("data") {
            Some(JsonValue::Array(items)) => items,
            Some(other) => {
                map.insert("data".to_string(), other);
                vec![JsonValue::Object(map)]
            }
            None => vec![JsonValue::Object(map)],
        },
        other => {
            return Err(FetchError::UnexpectedShape(format!(
                "expected an array of objects, got {other}"
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            Record::from_json(item).ok_or_else(|| {
                FetchError::UnexpectedShape(format!("element {idx} is not an object"))
            })
        })
        .collect()
}
