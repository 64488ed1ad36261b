//! Outcome delivered to the caller of a scheduled request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status reported when no HTTP response was received at all.
pub const NETWORK_ERROR_STATUS: u16 = 0;

/// Body half of a [`QueryResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseBody {
    /// Parsed JSON resource (status 200), or `{}` for a failed batch member.
    Resource(Value),
    /// Human-readable text extracted from an `OperationOutcome`, possibly empty.
    Diagnostics(String),
}

/// Status and body of one request, whether it went out singly or in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// HTTP status, or [`NETWORK_ERROR_STATUS`] when the transport failed.
    pub status: u16,
    /// Resource or diagnostic text.
    pub body: ResponseBody,
}

impl QueryResponse {
    /// Successful response carrying a resource.
    #[must_use]
    pub const fn ok(resource: Value) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Resource(resource),
        }
    }

    /// Failed response carrying diagnostic text.
    #[must_use]
    pub fn failed(status: u16, diagnostics: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Diagnostics(diagnostics.into()),
        }
    }

    /// Failed batch member: the batch status with an empty object body.
    #[must_use]
    pub fn batch_failed(status: u16) -> Self {
        Self {
            status,
            body: ResponseBody::Resource(Value::Object(serde_json::Map::new())),
        }
    }

    /// True for status 200.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The resource, if the body carries one.
    #[must_use]
    pub const fn resource(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Resource(value) => Some(value),
            ResponseBody::Diagnostics(_) => None,
        }
    }

    /// The diagnostic text, if the body carries one.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Diagnostics(text) => Some(text),
            ResponseBody::Resource(_) => None,
        }
    }

    /// Consume the response and return the resource, if any.
    #[must_use]
    pub fn into_resource(self) -> Option<Value> {
        match self.body {
            ResponseBody::Resource(value) => Some(value),
            ResponseBody::Diagnostics(_) => None,
        }
    }
}
