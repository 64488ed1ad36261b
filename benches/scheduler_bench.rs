//! Benchmarks for the batching scheduler and the response cache.
//!
//! Benchmarks cover:
//! - Batch response demultiplexing
//! - End-to-end coalescing through the scheduler with an instant transport
//! - Transient and persistent cache lookups

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fhir_batch_query::core::{
    split_batch_response, BatchBundle, BatchScheduler, CacheOptions, CacheStore, CachedResponse,
    HttpResponse, QueryError, ResponseCache, SchedulerLimits, Transport,
};
use fhir_batch_query::infra::InMemoryCacheStore;
use fhir_batch_query::runtime::TokioSpawner;
use futures::future::join_all;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

const BASE: &str = "https://fhir.example.org/baseR4";

// ============================================================================
// Instant Transport
// ============================================================================

#[derive(Clone)]
struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, QueryError> {
        Ok(HttpResponse::new(200, json!({"url": url}).to_string()))
    }

    async fn post_bundle(
        &self,
        _url: &str,
        bundle: &BatchBundle,
    ) -> Result<HttpResponse, QueryError> {
        let entry: Vec<Value> = bundle
            .entry
            .iter()
            .map(|e| json!({"resource": {"url": e.request.url}, "response": {"status": "200 OK"}}))
            .collect();
        Ok(HttpResponse::new(200, json!({"entry": entry}).to_string()))
    }
}

fn batch_body(size: usize) -> Value {
    let entry: Vec<Value> = (0..size)
        .map(|i| json!({"resource": {"resourceType": "Observation", "id": i}, "response": {"status": "200 OK"}}))
        .collect();
    json!({"resourceType": "Bundle", "type": "batch-response", "entry": entry})
}

// ============================================================================
// Wire Benchmarks
// ============================================================================

fn bench_split_batch_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_batch_response");
    for size in [10_usize, 50, 200] {
        let body = batch_body(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(split_batch_response(&body, size)));
        });
    }
    group.finish();
}

// ============================================================================
// Scheduler Benchmarks
// ============================================================================

fn bench_scheduler_coalescing(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_coalescing");
    for requests in [10_u64, 100, 1_000] {
        group.throughput(Throughput::Elements(requests));
        group.bench_with_input(
            BenchmarkId::from_parameter(requests),
            &requests,
            |b, &requests| {
                b.to_async(Runtime::new().unwrap()).iter(|| async move {
                    let limits = SchedulerLimits {
                        max_requests_per_batch: 10,
                        max_active_requests: 6,
                        batch_timeout: Duration::from_millis(1),
                        max_batch_wait: None,
                    };
                    let sched = BatchScheduler::new(
                        BASE,
                        limits,
                        EchoTransport,
                        TokioSpawner::current().unwrap(),
                    );
                    let futures: Vec<_> = (0..requests)
                        .map(|i| sched.enqueue(&format!("Observation/{i}")))
                        .collect();
                    black_box(join_all(futures).await);
                });
            },
        );
    }
    group.finish();
}

// ============================================================================
// Cache Benchmarks
// ============================================================================

fn bench_cache_lookup(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
    let cache = Arc::new(ResponseCache::new(Some(store)));
    let response = CachedResponse {
        status: 200,
        data: json!({"resourceType": "Patient", "id": "1"}),
    };
    rt.block_on(async {
        for i in 0..1_000 {
            let url = format!("{BASE}/Patient/{i}");
            cache
                .add(&url, response.clone(), &CacheOptions::temporary())
                .await
                .unwrap();
            cache
                .add(&url, response.clone(), &CacheOptions::persistent("bench"))
                .await
                .unwrap();
        }
    });

    let mut group = c.benchmark_group("cache_lookup");
    for (label, name) in [("temporary", None), ("persistent", Some("bench"))] {
        let cache = Arc::clone(&cache);
        group.bench_function(label, |b| {
            b.to_async(&rt).iter(|| {
                let cache = Arc::clone(&cache);
                async move {
                    black_box(cache.get(&format!("{BASE}/Patient/500"), name).await.unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(
    scheduler_benches,
    bench_split_batch_response,
    bench_scheduler_coalescing,
    bench_cache_lookup
);
criterion_main!(scheduler_benches);
