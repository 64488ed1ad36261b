//! Request scheduler: debounced batching with a bound on in-flight requests.
//!
//! Every call to [`BatchScheduler::enqueue`] appends one [`PendingRequest`] to
//! a FIFO queue. Requests leave the queue in *dispatch units*: either a
//! prefix of up to `max_requests_per_batch` relative requests posted as one
//! FHIR `batch` bundle, or a single GET. At most `max_active_requests` units
//! are in flight at once; when the ceiling is reached the queue simply waits
//! for the next unit to complete, which re-runs the dispatch step.
//!
//! ```text
//!   enqueue ──► pending queue ──► cut ──► Batch(POST base)  ──┐
//!       │            ▲              └──► Single(GET url)   ──┤
//!       │            │                                      ▼
//!       └─ debounce ─┘◄──────────── completion: active -= 1, deliver, dispatch
//! ```
//!
//! Below the batch threshold each arrival restarts a `batch_timeout` debounce.
//! The optional `max_batch_wait` caps how long the oldest queued request can
//! be held back by a steady trickle of arrivals.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::bundle::{operation_outcome_diagnostics, split_batch_response, BatchBundle};
use crate::core::response::{QueryResponse, NETWORK_ERROR_STATUS};
use crate::core::stats::SchedulerStats;
use crate::core::target::RequestTarget;
use crate::core::transport::Transport;
use crate::core::QueryError;

/// Abstraction for spawning background work on a runtime.
pub trait Spawn {
    /// Spawn a future that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tunable limits of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Maximum GETs folded into one batch bundle. `1` disables batching.
    pub max_requests_per_batch: usize,
    /// Maximum dispatch units (batches or singles) in flight at once.
    pub max_active_requests: usize,
    /// Quiet period to wait for more requests before cutting a short batch.
    pub batch_timeout: Duration,
    /// Upper bound on the debounce delay of the oldest pending request.
    pub max_batch_wait: Option<Duration>,
}

impl Default for SchedulerLimits {
    fn default() -> Self {
        Self {
            max_requests_per_batch: 10,
            max_active_requests: 6,
            batch_timeout: Duration::from_millis(20),
            max_batch_wait: Some(Duration::from_millis(200)),
        }
    }
}

/// A request waiting in the queue.
pub struct PendingRequest {
    id: Uuid,
    target: RequestTarget,
    reply: oneshot::Sender<QueryResponse>,
}

impl PendingRequest {
    fn deliver(self, response: QueryResponse) {
        if self.reply.send(response).is_err() {
            tracing::debug!(request = %self.id, "response dropped, caller went away");
        }
    }
}

enum DispatchUnit {
    Single(PendingRequest),
    Batch(Vec<PendingRequest>),
}

enum Trigger {
    Now,
    After(Duration, u64),
}

struct QueueState {
    pending: VecDeque<PendingRequest>,
    active: usize,
    max_per_batch: usize,
    /// Bumped on every arrival; a debounce timer only fires if it still matches.
    timer_generation: u64,
    /// When the oldest currently queued request arrived.
    window_opened_at: Option<Instant>,
}

impl QueueState {
    /// Take the next dispatch unit off the head of the queue.
    fn cut(&mut self) -> Option<DispatchUnit> {
        let batchable = self
            .pending
            .iter()
            .take(self.max_per_batch)
            .take_while(|req| req.target.is_batchable())
            .count();

        let unit = if self.max_per_batch > 1 && batchable > 1 {
            Some(DispatchUnit::Batch(self.pending.drain(..batchable).collect()))
        } else {
            self.pending.pop_front().map(DispatchUnit::Single)
        };

        if unit.is_some() {
            self.window_opened_at = if self.pending.is_empty() {
                None
            } else {
                Some(Instant::now())
            };
        }
        unit
    }
}

/// Future resolving to the response of one enqueued request.
///
/// Resolves exactly once. If the request is dropped from the queue by
/// [`BatchScheduler::clear_pending_requests`] it resolves to
/// [`QueryError::Cancelled`].
#[must_use = "the response is only observable by awaiting the future"]
pub struct ResponseFuture {
    rx: oneshot::Receiver<QueryResponse>,
}

impl Future for ResponseFuture {
    type Output = Result<QueryResponse, QueryError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| QueryError::Cancelled))
    }
}

struct Inner<T, S> {
    base_url: String,
    limits: SchedulerLimits,
    state: Mutex<QueueState>,
    transport: T,
    spawner: S,
    stats: Arc<SchedulerStats>,
}

/// Coalescing request scheduler.
///
/// Cloning is cheap and yields a handle to the same queue.
pub struct BatchScheduler<T, S> {
    inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for BatchScheduler<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> BatchScheduler<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    /// Create a scheduler sending to `base_url` through `transport`.
    ///
    /// Zero limits are raised to `1` so the queue always drains.
    pub fn new(
        base_url: impl Into<String>,
        limits: SchedulerLimits,
        transport: T,
        spawner: S,
    ) -> Self {
        let limits = SchedulerLimits {
            max_requests_per_batch: limits.max_requests_per_batch.max(1),
            max_active_requests: limits.max_active_requests.max(1),
            ..limits
        };
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(
            base_url = %base_url,
            max_requests_per_batch = limits.max_requests_per_batch,
            max_active_requests = limits.max_active_requests,
            batch_timeout_ms = limits.batch_timeout.as_millis(),
            "batch scheduler created"
        );
        Self {
            inner: Arc::new(Inner {
                base_url,
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    active: 0,
                    max_per_batch: limits.max_requests_per_batch,
                    timer_generation: 0,
                    window_opened_at: None,
                }),
                limits,
                transport,
                spawner,
                stats: Arc::new(SchedulerStats::new()),
            }),
        }
    }

    /// Service base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Limits this scheduler was created with.
    #[must_use]
    pub fn limits(&self) -> SchedulerLimits {
        self.inner.limits
    }

    /// Shared activity counters.
    #[must_use]
    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.inner.stats)
    }

    /// Number of requests waiting in the queue.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Number of dispatch units currently in flight.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().active
    }

    /// Current batch size limit.
    #[must_use]
    pub fn max_requests_per_batch(&self) -> usize {
        self.inner.state.lock().max_per_batch
    }

    /// Absolute URL a request for `url` would be sent to.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        RequestTarget::resolve(&self.inner.base_url, url).absolute_url(&self.inner.base_url)
    }

    /// Queue a GET for `url` and return a future for its response.
    ///
    /// The request joins the queue immediately, before the future is polled.
    pub fn enqueue(&self, url: &str) -> ResponseFuture {
        let (reply, rx) = oneshot::channel();
        let request = PendingRequest {
            id: Uuid::new_v4(),
            target: RequestTarget::resolve(&self.inner.base_url, url),
            reply,
        };
        tracing::debug!(request = %request.id, url = %url, "request enqueued");
        self.inner.stats.record_enqueued();

        let trigger = {
            let mut state = self.inner.state.lock();
            let now = Instant::now();
            if state.pending.is_empty() {
                state.window_opened_at = Some(now);
            }
            state.pending.push_back(request);
            state.timer_generation = state.timer_generation.wrapping_add(1);

            if state.pending.len() >= state.max_per_batch {
                Trigger::Now
            } else {
                let waited = state
                    .window_opened_at
                    .map_or(Duration::ZERO, |opened| now.saturating_duration_since(opened));
                let delay = self.inner.limits.max_batch_wait.map_or(
                    self.inner.limits.batch_timeout,
                    |cap| self.inner.limits.batch_timeout.min(cap.saturating_sub(waited)),
                );
                if delay.is_zero() {
                    Trigger::Now
                } else {
                    Trigger::After(delay, state.timer_generation)
                }
            }
        };

        match trigger {
            Trigger::Now => Inner::dispatch(&self.inner),
            Trigger::After(delay, generation) => Inner::schedule_timer(&self.inner, delay, generation),
        }
        ResponseFuture { rx }
    }

    /// Drop every queued request that has not been dispatched yet.
    ///
    /// In-flight requests are unaffected. Returns the number of dropped requests;
    /// their futures resolve to [`QueryError::Cancelled`].
    pub fn clear_pending_requests(&self) -> usize {
        let dropped: Vec<PendingRequest> = {
            let mut state = self.inner.state.lock();
            state.timer_generation = state.timer_generation.wrapping_add(1);
            state.window_opened_at = None;
            state.pending.drain(..).collect()
        };
        let count = dropped.len();
        if count > 0 {
            self.inner.stats.record_cancelled(count);
            tracing::info!(count, "pending requests cleared");
        }
        count
    }

    /// Change the batch size limit at runtime. `1` disables batching.
    pub fn set_max_requests_per_batch(&self, max: usize) {
        let max = max.max(1);
        let flush = {
            let mut state = self.inner.state.lock();
            state.max_per_batch = max;
            state.pending.len() >= max
        };
        tracing::info!(max_requests_per_batch = max, "batch size changed");
        if flush {
            Inner::dispatch(&self.inner);
        }
    }
}

impl<T, S> Inner<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    fn schedule_timer(this: &Arc<Self>, delay: Duration, generation: u64) {
        let inner = Arc::clone(this);
        this.spawner.spawn(async move {
            tokio::time::sleep(delay).await;
            let current = inner.state.lock().timer_generation == generation;
            if current {
                Self::dispatch(&inner);
            }
        });
    }

    /// Launch dispatch units while there is queued work and spare capacity.
    fn dispatch(this: &Arc<Self>) {
        loop {
            let unit = {
                let mut state = this.state.lock();
                if state.active >= this.limits.max_active_requests {
                    return;
                }
                let Some(unit) = state.cut() else {
                    return;
                };
                state.active += 1;
                this.stats.observe_active(state.active);
                unit
            };
            Self::launch(this, unit);
        }
    }

    fn launch(this: &Arc<Self>, unit: DispatchUnit) {
        match unit {
            DispatchUnit::Single(request) => {
                this.stats.record_single();
                let mut slot = InFlight::new(this, vec![request]);
                this.spawner.spawn(async move {
                    let response = slot.inner.send_single(&slot.requests[0]).await;
                    slot.complete(vec![response]);
                });
            }
            DispatchUnit::Batch(requests) => {
                this.stats.record_batch(requests.len());
                let mut slot = InFlight::new(this, requests);
                this.spawner.spawn(async move {
                    let responses = slot.inner.send_batch(&slot.requests).await;
                    slot.complete(responses);
                });
            }
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
    }

    async fn send_single(&self, request: &PendingRequest) -> QueryResponse {
        let url = request.target.absolute_url(&self.base_url);
        tracing::debug!(request = %request.id, url = %url, "dispatching single request");

        match self.transport.get(&url).await {
            Ok(http) if http.status == 200 => match serde_json::from_str::<Value>(&http.body) {
                Ok(resource) => QueryResponse::ok(resource),
                Err(e) => {
                    tracing::warn!(url = %url, "unparseable response body: {}", e);
                    QueryResponse::failed(NETWORK_ERROR_STATUS, format!("invalid JSON response: {e}"))
                }
            },
            Ok(http) => {
                tracing::debug!(url = %url, status = http.status, "request failed");
                QueryResponse::failed(http.status, operation_outcome_diagnostics(&http.body))
            }
            Err(e) => {
                tracing::warn!(url = %url, "request not completed: {}", e);
                QueryResponse::failed(NETWORK_ERROR_STATUS, e.to_string())
            }
        }
    }

    /// Post one bundle for `requests` and return one response per request, in order.
    async fn send_batch(&self, requests: &[PendingRequest]) -> Vec<QueryResponse> {
        let bundle = BatchBundle::of_gets(requests.iter().map(|r| r.target.entry_url()));
        let size = requests.len();
        tracing::debug!(size, "dispatching batch");

        let status = match self.transport.post_bundle(&self.base_url, &bundle).await {
            Ok(http) if http.status == 200 => match serde_json::from_str::<Value>(&http.body) {
                Ok(body) => return split_batch_response(&body, size),
                Err(e) => {
                    tracing::warn!(size, "unparseable batch response: {}", e);
                    NETWORK_ERROR_STATUS
                }
            },
            Ok(http) => {
                tracing::warn!(size, status = http.status, "batch request failed");
                http.status
            }
            Err(e) => {
                tracing::warn!(size, "batch request not completed: {}", e);
                NETWORK_ERROR_STATUS
            }
        };

        self.stats.record_batch_failure();
        vec![QueryResponse::batch_failed(status); size]
    }
}

/// One occupied in-flight slot and the requests riding on it.
///
/// Dropping the slot frees it and re-runs dispatch, also when the send
/// unwinds. Requests still held at that point get a network error.
struct InFlight<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    inner: Arc<Inner<T, S>>,
    requests: Vec<PendingRequest>,
}

impl<T, S> InFlight<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    fn new(inner: &Arc<Inner<T, S>>, requests: Vec<PendingRequest>) -> Self {
        Self {
            inner: Arc::clone(inner),
            requests,
        }
    }

    fn complete(&mut self, responses: Vec<QueryResponse>) {
        self.inner.release();
        for (request, response) in self.requests.drain(..).zip(responses) {
            request.deliver(response);
        }
    }
}

impl<T, S> Drop for InFlight<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.requests.is_empty() {
            tracing::error!(count = self.requests.len(), "dispatch unit aborted before completion");
            self.inner.release();
            for request in self.requests.drain(..) {
                request.deliver(QueryResponse::failed(
                    NETWORK_ERROR_STATUS,
                    "request aborted before a response arrived",
                ));
            }
        }
        Inner::dispatch(&self.inner);
    }
}
