//! Caller-facing query client.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::core::{
    next_page_url, BatchScheduler, CacheOptions, CachedResponse, QueryError, QueryResponse,
    ResponseBody, ResponseCache, ResponseFuture, Spawn, StatsSnapshot, Transport,
};

/// FHIR query client: a batching scheduler plus a shared response cache.
///
/// ```rust,ignore
/// let client = fhir_batch_query::builders::build_client(&config)?;
/// let patient = client.get("Patient/123");
/// let observations = client.get("Observation?subject=Patient/123");
/// // both requests are coalesced into one batch bundle
/// let (patient, observations) = tokio::join!(patient, observations);
/// ```
pub struct FhirClient<T, S> {
    scheduler: BatchScheduler<T, S>,
    cache: Arc<ResponseCache>,
}

impl<T, S> Clone for FhirClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<T, S> FhirClient<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    /// Create a client from validated configuration.
    pub fn new(
        config: &ClientConfig,
        transport: T,
        spawner: S,
        cache: Arc<ResponseCache>,
    ) -> Result<Self, QueryError> {
        config.validate().map_err(QueryError::Config)?;
        Ok(Self {
            scheduler: BatchScheduler::new(
                config.service_base_url.clone(),
                config.limits(),
                transport,
                spawner,
            ),
            cache,
        })
    }

    /// Queue a GET for `url` (relative to the service base, or absolute).
    ///
    /// The request is queued before this returns.
    pub fn get(&self, url: &str) -> ResponseFuture {
        self.scheduler.enqueue(url)
    }

    /// GET `url` through the cache.
    ///
    /// A fresh cached entry is returned without touching the network. Otherwise
    /// the request is scheduled and a status-200 result is written back under
    /// `options`. A failing persistent store degrades to an uncached request.
    pub async fn get_with_cache(
        &self,
        url: &str,
        options: &CacheOptions,
    ) -> Result<QueryResponse, QueryError> {
        let key = self.scheduler.resolve_url(url);
        let stats = self.scheduler.stats();

        match self.cache.get(&key, options.cache_name.as_deref()).await {
            Ok(Some(cached)) => {
                stats.record_cache_hit();
                tracing::debug!(url = %key, "cache hit");
                return Ok(QueryResponse {
                    status: cached.status,
                    body: ResponseBody::Resource(cached.data),
                });
            }
            Ok(None) => stats.record_cache_miss(),
            Err(e) => {
                stats.record_cache_miss();
                tracing::warn!(url = %key, "cache lookup failed: {}", e);
            }
        }

        let response = self.scheduler.enqueue(url).await?;
        if let (true, Some(resource)) = (response.is_ok(), response.resource()) {
            let cached = CachedResponse {
                status: response.status,
                data: resource.clone(),
            };
            if let Err(e) = self.cache.add(&key, cached, options).await {
                tracing::warn!(url = %key, "cache write failed: {}", e);
            }
        }
        Ok(response)
    }

    /// Follow the `next` link of a searchset bundle, if it has one.
    pub fn next_page(&self, bundle: &Value) -> Option<ResponseFuture> {
        next_page_url(bundle).map(|url| self.scheduler.enqueue(url))
    }

    /// Drop every queued request that has not been dispatched yet.
    pub fn clear_pending_requests(&self) -> usize {
        self.scheduler.clear_pending_requests()
    }

    /// Change the batch size limit. `1` disables batching.
    pub fn set_max_requests_per_batch(&self, max: usize) {
        self.scheduler.set_max_requests_per_batch(max);
    }

    /// Point-in-time copy of the activity counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.scheduler.stats().snapshot()
    }

    /// Shared response cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Underlying scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &BatchScheduler<T, S> {
        &self.scheduler
    }
}
