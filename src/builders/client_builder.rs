//! Builders to construct query clients from configuration.

use std::sync::Arc;

use crate::config::CacheConfig;
use crate::core::{QueryError, ResponseCache};
use crate::infra::FileCacheStore;

#[cfg(feature = "reqwest-transport")]
use anyhow::Context;

#[cfg(feature = "reqwest-transport")]
use crate::config::ClientConfig;
#[cfg(feature = "reqwest-transport")]
use crate::core::AppResult;
#[cfg(feature = "reqwest-transport")]
use crate::infra::ReqwestTransport;
#[cfg(feature = "reqwest-transport")]
use crate::runtime::{FhirClient, TokioSpawner};

/// Client over HTTP on the current tokio runtime.
#[cfg(feature = "reqwest-transport")]
pub type DefaultClient = FhirClient<ReqwestTransport, TokioSpawner>;

/// Build a response cache, file-backed when a directory is configured.
pub fn build_cache(cfg: &CacheConfig) -> Result<Arc<ResponseCache>, QueryError> {
    let cache = match &cfg.directory {
        Some(dir) => {
            let store = FileCacheStore::new(dir)?;
            tracing::info!(directory = %dir.display(), "persistent cache enabled");
            ResponseCache::new(Some(Arc::new(store)))
        }
        None => ResponseCache::new(None),
    };
    Ok(Arc::new(cache))
}

/// Build a client with its own cache. Must be called inside a tokio runtime.
#[cfg(feature = "reqwest-transport")]
pub fn build_client(cfg: &ClientConfig) -> Result<DefaultClient, QueryError> {
    let cache = build_cache(&cfg.cache)?;
    build_client_with_cache(cfg, cache)
}

/// Build a client sharing `cache` with other clients.
#[cfg(feature = "reqwest-transport")]
pub fn build_client_with_cache(
    cfg: &ClientConfig,
    cache: Arc<ResponseCache>,
) -> Result<DefaultClient, QueryError> {
    cfg.validate().map_err(QueryError::Config)?;
    let transport = ReqwestTransport::new(cfg)?;
    let spawner = TokioSpawner::current()?;
    FhirClient::new(cfg, transport, spawner, cache)
}

/// Build a client from `FHIR_*` environment variables.
#[cfg(feature = "reqwest-transport")]
pub fn build_client_from_env() -> AppResult<DefaultClient> {
    let cfg = ClientConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("loading client configuration from environment")?;
    build_client(&cfg).context("building FHIR client")
}
