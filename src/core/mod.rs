//! Core query abstractions: request scheduling, FHIR batch wire shapes, and
//! the response cache.

pub mod bundle;
pub mod cache;
pub mod error;
pub mod response;
pub mod scheduler;
pub mod stats;
pub mod target;
pub mod transport;

pub use bundle::{
    next_page_url, operation_outcome_diagnostics, split_batch_response, BatchBundle, BatchEntry,
    BatchEntryRequest,
};
pub use cache::{CacheEntry, CacheInfo, CacheOptions, CacheStore, CachedResponse, ResponseCache};
pub use error::{AppResult, QueryError};
pub use response::{QueryResponse, ResponseBody, NETWORK_ERROR_STATUS};
pub use scheduler::{BatchScheduler, ResponseFuture, SchedulerLimits, Spawn};
pub use stats::{SchedulerStats, StatsSnapshot};
pub use target::RequestTarget;
pub use transport::{HttpResponse, Transport};
