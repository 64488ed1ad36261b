//! Tests for client and cache builders

#![cfg(feature = "reqwest-transport")]

use fhir_batch_query::builders::{build_cache, build_client, build_client_with_cache};
use fhir_batch_query::config::{CacheConfig, ClientConfig};
use fhir_batch_query::core::QueryError;

const BASE: &str = "https://fhir.example.org/baseR4";

#[test]
fn test_build_cache_without_directory() {
    let cache = build_cache(&CacheConfig::default()).unwrap();
    assert!(!cache.has_persistent_store());
}

#[test]
fn test_build_cache_with_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("stores");
    let cache = build_cache(&CacheConfig {
        directory: Some(nested.clone()),
    })
    .unwrap();
    assert!(cache.has_persistent_store());
    assert!(nested.is_dir());
}

#[tokio::test]
async fn test_build_client() {
    let cfg = ClientConfig::new(BASE).with_header("Authorization", "Bearer token");
    let client = build_client(&cfg).unwrap();
    assert_eq!(client.scheduler().base_url(), BASE);
    assert_eq!(client.scheduler().max_requests_per_batch(), 10);
}

#[tokio::test]
async fn test_build_client_rejects_bad_header() {
    let cfg = ClientConfig::new(BASE).with_header("bad header", "x");
    assert!(matches!(build_client(&cfg), Err(QueryError::Config(_))));
}

#[tokio::test]
async fn test_clients_share_a_cache() {
    let cache = build_cache(&CacheConfig::default()).unwrap();
    let cfg = ClientConfig::new(BASE);
    let a = build_client_with_cache(&cfg, cache.clone()).unwrap();
    let b = build_client_with_cache(&cfg, cache).unwrap();
    assert!(std::sync::Arc::ptr_eq(a.cache(), b.cache()));
}

#[test]
fn test_build_client_outside_runtime_fails() {
    let result = build_client(&ClientConfig::new(BASE));
    assert!(matches!(result, Err(QueryError::Config(_))));
}
