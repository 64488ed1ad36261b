//! FHIR wire shapes: batch request bundles, batch response demultiplexing,
//! and `OperationOutcome` diagnostics.
//!
//! Batch response entries are paired with the submitted requests strictly by
//! position (FHIR batch semantics). Entry `i` answers request `i`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::response::{QueryResponse, NETWORK_ERROR_STATUS};

/// Diagnostic text for batch members the server response did not cover.
pub const MISSING_ENTRY_DIAGNOSTICS: &str = "missing entry in batch response";

/// A `Bundle` of type `batch` containing only GET entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchBundle {
    /// Always `"Bundle"`.
    pub resource_type: String,
    /// Always `"batch"`.
    #[serde(rename = "type")]
    pub bundle_type: String,
    /// One entry per folded request, in submission order.
    pub entry: Vec<BatchEntry>,
}

/// One entry of a [`BatchBundle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// The request this entry carries.
    pub request: BatchEntryRequest,
}

/// `Bundle.entry.request` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntryRequest {
    /// HTTP method, always `GET` here.
    pub method: String,
    /// Request URL relative to the service base.
    pub url: String,
}

impl BatchBundle {
    /// Build a batch bundle of GET requests for `urls`, preserving order.
    pub fn of_gets<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_type: "Bundle".into(),
            bundle_type: "batch".into(),
            entry: urls
                .into_iter()
                .map(|url| BatchEntry {
                    request: BatchEntryRequest {
                        method: "GET".into(),
                        url: url.into(),
                    },
                })
                .collect(),
        }
    }
}

/// Extract newline-joined `issue[].diagnostics` from an `OperationOutcome` body.
///
/// Returns an empty string when the body is not JSON or carries no diagnostics.
#[must_use]
pub fn operation_outcome_diagnostics(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .map(|value| outcome_diagnostics(&value))
        .unwrap_or_default()
}

/// Same as [`operation_outcome_diagnostics`] for an already parsed value.
#[must_use]
pub fn outcome_diagnostics(outcome: &Value) -> String {
    outcome
        .get("issue")
        .and_then(Value::as_array)
        .map(|issues| {
            issues
                .iter()
                .filter_map(|issue| issue.get("diagnostics").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Parse the leading status code of an entry status line such as `"404 Not Found"`.
#[must_use]
pub fn parse_status_line(line: &str) -> Option<u16> {
    line.split_whitespace().next()?.parse().ok()
}

/// Turn a 200 batch response body into exactly `expected` member responses.
///
/// Entries without `response.status` are reported as 200 with their `resource`
/// (or `{}` if absent). Entries with a non-2xx status report that status and the
/// diagnostics of their outcome. Members past the end of `entry` get status
/// [`NETWORK_ERROR_STATUS`] so that every member resolves once.
#[must_use]
pub fn split_batch_response(body: &Value, expected: usize) -> Vec<QueryResponse> {
    let entries = body
        .get("entry")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);

    (0..expected)
        .map(|i| match entries.get(i) {
            Some(entry) => entry_response(entry),
            None => QueryResponse::failed(NETWORK_ERROR_STATUS, MISSING_ENTRY_DIAGNOSTICS),
        })
        .collect()
}

fn entry_response(entry: &Value) -> QueryResponse {
    let status = entry
        .pointer("/response/status")
        .and_then(Value::as_str)
        .and_then(parse_status_line);

    match status {
        Some(code) if !(200..300).contains(&code) => {
            let outcome = entry
                .pointer("/response/outcome")
                .or_else(|| entry.get("resource"));
            QueryResponse::failed(code, outcome.map(outcome_diagnostics).unwrap_or_default())
        }
        _ => QueryResponse::ok(
            entry
                .get("resource")
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        ),
    }
}

/// URL of the `next` page link of a searchset bundle, if present.
#[must_use]
pub fn next_page_url(bundle: &Value) -> Option<&str> {
    bundle
        .get("link")?
        .as_array()?
        .iter()
        .find(|link| link.get("relation").and_then(Value::as_str) == Some("next"))?
        .get("url")?
        .as_str()
}
