//! Wire transport abstraction.

use async_trait::async_trait;

use crate::core::bundle::BatchBundle;
use crate::core::QueryError;

/// Raw HTTP response as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl HttpResponse {
    /// Build a response from a status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends the two kinds of requests the scheduler issues.
///
/// The scheduler owns batching, concurrency, and demultiplexing; a transport
/// only moves bytes. An `Err` means no HTTP response was obtained at all; any
/// HTTP status, including 4xx/5xx, is an `Ok`.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use fhir_batch_query::core::{BatchBundle, HttpResponse, QueryError, Transport};
///
/// #[derive(Clone)]
/// struct Canned;
///
/// #[async_trait]
/// impl Transport for Canned {
///     async fn get(&self, _url: &str) -> Result<HttpResponse, QueryError> {
///         Ok(HttpResponse::new(200, r#"{"resourceType":"Patient"}"#))
///     }
///     async fn post_bundle(&self, _url: &str, _b: &BatchBundle) -> Result<HttpResponse, QueryError> {
///         Ok(HttpResponse::new(200, r#"{"entry":[]}"#))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Issue a GET to an absolute URL.
    async fn get(&self, url: &str) -> Result<HttpResponse, QueryError>;

    /// POST a batch bundle to the service base URL.
    async fn post_bundle(
        &self,
        url: &str,
        bundle: &BatchBundle,
    ) -> Result<HttpResponse, QueryError>;
}
