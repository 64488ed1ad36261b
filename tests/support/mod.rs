//! Shared test fixtures: a recording mock transport and scheduler helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fhir_batch_query::core::{
    BatchBundle, BatchScheduler, HttpResponse, QueryError, SchedulerLimits, Transport,
};
use fhir_batch_query::runtime::TokioSpawner;
use parking_lot::Mutex;
use serde_json::json;
use tokio::time::Instant;

/// Service base URL used by every test.
pub const BASE: &str = "https://fhir.example.org/baseR4";

/// One request observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Individual GET to an absolute URL.
    Get(String),
    /// Batch bundle POST, with its entry URLs in order.
    Batch(Vec<String>),
}

type Responder = dyn Fn(&Call) -> Result<HttpResponse, QueryError> + Send + Sync;

struct MockInner {
    calls: Mutex<Vec<(Call, Duration)>>,
    started: Instant,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    responder: Box<Responder>,
}

/// Transport that records every request and answers from a responder.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

/// Relative path of `url` under [`BASE`], or `url` itself.
pub fn path_of(url: &str) -> String {
    url.strip_prefix(&format!("{BASE}/"))
        .unwrap_or(url)
        .to_string()
}

/// Echo each request path back as `{"path": ...}`; batches answer every entry with 200.
pub fn echo(call: &Call) -> Result<HttpResponse, QueryError> {
    match call {
        Call::Get(url) => Ok(HttpResponse::new(200, json!({"path": path_of(url)}).to_string())),
        Call::Batch(urls) => {
            let entry: Vec<_> = urls
                .iter()
                .map(|u| json!({"resource": {"path": u}, "response": {"status": "200 OK"}}))
                .collect();
            Ok(HttpResponse::new(
                200,
                json!({"resourceType": "Bundle", "type": "batch-response", "entry": entry})
                    .to_string(),
            ))
        }
    }
}

impl MockTransport {
    /// Echoing mock that answers immediately.
    pub fn new() -> Self {
        Self::build(Duration::ZERO, echo)
    }

    /// Echoing mock that holds every request for `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self::build(delay, echo)
    }

    /// Mock answering with `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&Call) -> Result<HttpResponse, QueryError> + Send + Sync + 'static,
    {
        Self::build(Duration::ZERO, responder)
    }

    fn build<F>(delay: Duration, responder: F) -> Self
    where
        F: Fn(&Call) -> Result<HttpResponse, QueryError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(MockInner {
                calls: Mutex::new(Vec::new()),
                started: Instant::now(),
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                responder: Box::new(responder),
            }),
        }
    }

    /// Requests seen so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().iter().map(|(c, _)| c.clone()).collect()
    }

    /// Requests with their arrival time relative to mock creation.
    pub fn timed_calls(&self) -> Vec<(Call, Duration)> {
        self.inner.calls.lock().clone()
    }

    /// Highest number of requests that were in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    async fn handle(&self, call: Call) -> Result<HttpResponse, QueryError> {
        self.inner
            .calls
            .lock()
            .push((call.clone(), self.inner.started.elapsed()));
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        if !self.inner.delay.is_zero() {
            tokio::time::sleep(self.inner.delay).await;
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.inner.responder)(&call)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, QueryError> {
        self.handle(Call::Get(url.to_string())).await
    }

    async fn post_bundle(
        &self,
        url: &str,
        bundle: &BatchBundle,
    ) -> Result<HttpResponse, QueryError> {
        assert_eq!(url, BASE, "batches are posted to the service base");
        let urls = bundle.entry.iter().map(|e| e.request.url.clone()).collect();
        self.handle(Call::Batch(urls)).await
    }
}

/// Limits with the default timers.
pub fn limits(max_requests_per_batch: usize, max_active_requests: usize) -> SchedulerLimits {
    SchedulerLimits {
        max_requests_per_batch,
        max_active_requests,
        ..SchedulerLimits::default()
    }
}

/// Scheduler on the current runtime.
pub fn scheduler(
    transport: MockTransport,
    limits: SchedulerLimits,
) -> BatchScheduler<MockTransport, TokioSpawner> {
    let spawner = TokioSpawner::current().expect("inside a tokio runtime");
    BatchScheduler::new(BASE, limits, transport, spawner)
}

/// Let spawned tasks run without advancing time.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
