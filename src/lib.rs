//! # FHIR Batch Query
//!
//! A client-side request scheduler for FHIR servers that coalesces many small
//! GET requests into FHIR `batch` bundles, bounds the number of requests in
//! flight, and layers a response cache on top.
//!
//! ## How requests flow
//!
//! - **Enqueue**: every [`FhirClient::get`](runtime::FhirClient::get) appends a
//!   request to a FIFO queue and returns a future for its response.
//! - **Coalesce**: below `max_requests_per_batch` the queue waits for a short
//!   debounce; once full, or once the debounce elapses, the head of the queue
//!   is cut into one `POST` of a batch bundle (or a single `GET`).
//! - **Bound**: at most `max_active_requests` dispatch units are in flight;
//!   the rest wait until a unit completes.
//! - **Demultiplex**: batch response entries are paired with requests by
//!   position and each caller receives its own status and resource, or the
//!   `OperationOutcome` diagnostics on failure.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use fhir_batch_query::builders::build_client;
//! use fhir_batch_query::config::ClientConfig;
//! use fhir_batch_query::core::CacheOptions;
//!
//! let client = build_client(&ClientConfig::new("https://hapi.fhir.org/baseR4"))?;
//!
//! let patient = client.get("Patient/example");
//! let conditions = client.get("Condition?subject=Patient/example");
//! let (patient, conditions) = tokio::join!(patient, conditions);
//!
//! let cached = client
//!     .get_with_cache("Patient/example", &CacheOptions::temporary().with_expiration_secs(300))
//!     .await?;
//! ```
//!
//! ## Caching
//!
//! [`ResponseCache`](core::ResponseCache) keeps a transient in-process store and,
//! with a [`CacheStore`](core::CacheStore) backend, any number of named
//! persistent stores. The same `Arc<ResponseCache>` may be shared by several
//! clients.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling, wire shapes, and the response cache.
pub mod core;
/// Configuration models for the client, scheduler limits, and cache.
pub mod config;
/// Builders to construct clients and caches from configuration.
pub mod builders;
/// Infrastructure adapters for HTTP and persistent cache backends.
pub mod infra;
/// Runtime adapters and the client API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
