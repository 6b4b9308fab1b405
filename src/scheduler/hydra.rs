//! The scheduler: pending queue, in-flight set and the run loop.
//!
//! One `Hydra` is driven from one task. `run` is the only place that
//! suspends, and it only waits for "at least one transport exchange
//! finished". Callbacks receive `&mut Hydra` and may queue more work or
//! abort; both simply mutate state the loop revisits on its next turn.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument, Span};

use crate::cache::ResponseCache;
use crate::error::HydraError;
use crate::http::{Method, NormalizedHeaders, Request, Response};
use crate::telemetry::{self, RequestSpan, SpanExt};
use crate::transport::Transport;

use super::globals::Globals;
use super::hooks::{CallbackResult, OnComplete};
use super::memo::MemoTable;
use super::retry::RetryPolicy;
use super::stats::HydraStats;
use super::stub::{StubHandle, StubRegistry, UrlMatcher};

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HydraConfig {
    /// Ceiling on in-flight exchanges. `None` defers to the transport.
    pub max_concurrency: Option<usize>,
    /// Coalesce duplicate GETs.
    pub memoize: bool,
    pub retry: RetryPolicy,
}

impl Default for HydraConfig {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            memoize: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl HydraConfig {
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn without_memoization(mut self) -> Self {
        self.memoize = false;
        self
    }

    pub fn validate(&self) -> Result<(), HydraError> {
        if self.max_concurrency == Some(0) {
            return Err(HydraError::InvalidConfig(
                "max_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Where a completion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Transport,
    Stub,
    Cache,
    Memo,
}

impl Origin {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Stub => "stub",
            Self::Cache => "cache",
            Self::Memo => "memo",
        }
    }
}

/// A finished transport exchange waiting for the completion path.
pub(crate) struct Completion {
    pub(crate) request: Arc<Request>,
    pub(crate) response: Arc<Response>,
}

/// A request answered at queue time, fired by the run loop.
pub(crate) struct Resolved {
    pub(crate) request: Arc<Request>,
    pub(crate) response: Arc<Response>,
    pub(crate) origin: Origin,
}

/// Bounded-concurrency HTTP scheduler.
pub struct Hydra {
    pub(super) config: HydraConfig,
    pub(super) globals: Arc<Globals>,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) stubs: StubRegistry,
    pub(super) cache: Option<Arc<dyn ResponseCache>>,
    pub(super) on_complete: Vec<OnComplete>,
    pub(super) pending: VecDeque<Arc<Request>>,
    pub(super) resolved: VecDeque<Resolved>,
    pub(super) in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    pub(super) memo: MemoTable,
    pub(super) aborted: bool,
    pub(super) stats: HydraStats,
}

impl fmt::Debug for Hydra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hydra")
            .field("config", &self.config)
            .field("queued", &self.pending.len())
            .field("in_flight", &self.in_flight.len())
            .field("memoized", &self.memo.len())
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

impl Hydra {
    /// Scheduler bound to the process-wide [`Globals`].
    pub fn new(config: HydraConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_globals(config, transport, Globals::process())
    }

    /// Scheduler bound to an explicit [`Globals`] instance.
    pub fn with_globals(
        config: HydraConfig,
        transport: Arc<dyn Transport>,
        globals: Arc<Globals>,
    ) -> Self {
        Self {
            config,
            globals,
            transport,
            stubs: StubRegistry::new(),
            cache: None,
            on_complete: Vec::new(),
            pending: VecDeque::new(),
            resolved: VecDeque::new(),
            in_flight: FuturesUnordered::new(),
            memo: MemoTable::new(),
            aborted: false,
            stats: HydraStats::default(),
        }
    }

    pub fn config(&self) -> &HydraConfig {
        &self.config
    }

    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    /// `None` removes the scheduler's own limit.
    pub fn set_max_concurrency(&mut self, max: Option<usize>) {
        self.config.max_concurrency = max;
    }

    pub fn enable_memoization(&mut self) {
        self.config.memoize = true;
    }

    pub fn disable_memoization(&mut self) {
        self.config.memoize = false;
    }

    pub fn memoization_enabled(&self) -> bool {
        self.config.memoize
    }

    pub fn set_retry_policy(&mut self, retry: RetryPolicy) {
        self.config.retry = retry;
    }

    pub fn set_retry_connect_timeouts(&mut self, enabled: bool) {
        self.config.retry.retry_connect_timeouts = enabled;
    }

    pub fn set_retry_codes(&mut self, codes: impl IntoIterator<Item = i32>) {
        self.config.retry.retry_codes = codes.into_iter().collect();
    }

    /// Whether a finished exchange would be re-admitted instead of completed.
    pub fn retry_request(&self, request: &Request, response: &Response) -> bool {
        self.config.retry.should_retry(request, response)
    }

    pub fn set_cache(&mut self, cache: Arc<dyn ResponseCache>) {
        self.cache = Some(cache);
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Instance stub, consulted before the process-wide ones.
    pub fn stub(&self, method: Method, matcher: impl Into<UrlMatcher>) -> StubHandle {
        self.stubs.stub(method, matcher)
    }

    pub fn stub_with_headers(
        &self,
        method: Method,
        matcher: impl Into<UrlMatcher>,
        headers: NormalizedHeaders,
    ) -> StubHandle {
        self.stubs.stub_with_headers(method, matcher, headers)
    }

    pub fn stubs(&self) -> &StubRegistry {
        &self.stubs
    }

    /// Clears instance stubs only.
    pub fn clear_stubs(&self) {
        self.stubs.clear();
    }

    /// Callback fired for every completion handled by this scheduler, after
    /// the request's own callbacks.
    pub fn on_complete<F>(&mut self, f: F)
    where
        F: FnMut(&mut Hydra, &Arc<Response>) -> CallbackResult + Send + 'static,
    {
        self.on_complete.push(Box::new(f));
    }

    pub fn clear_on_complete(&mut self) {
        self.on_complete.clear();
    }

    pub fn queued_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Keys currently held by the memo table.
    pub fn memoized_len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn stats(&self) -> HydraStats {
        self.stats
    }

    /// Drive all reachable work to completion.
    ///
    /// Returns the first callback failure, after the scheduler has been
    /// reset to an empty state.
    pub async fn run(&mut self) -> Result<(), HydraError> {
        let span = info_span!(
            "hydra_run",
            queued = self.pending.len(),
            completed = tracing::field::Empty,
        );
        let before = self.stats.completed;
        let result = self.drive().instrument(span.clone()).await;
        span.record("completed", self.stats.completed - before);
        self.finish_run();
        result
    }

    async fn drive(&mut self) -> Result<(), HydraError> {
        loop {
            self.fire_resolved()?;

            if self.aborted {
                self.discard_queued();
            } else {
                self.admit();
            }

            if self.in_flight.is_empty() {
                if self.resolved.is_empty() && (self.aborted || self.pending.is_empty()) {
                    return Ok(());
                }
                continue;
            }

            if let Some(completion) = self.in_flight.next().await {
                self.finish_transport(completion)?;
                // Drain whatever else finished in the same wakeup.
                while let Some(Some(completion)) = self.in_flight.next().now_or_never() {
                    self.finish_transport(completion)?;
                }
            }
        }
    }

    fn fire_resolved(&mut self) -> Result<(), HydraError> {
        while !self.aborted {
            let Some(Resolved { request, response, origin }) = self.resolved.pop_front() else {
                break;
            };
            self.complete(request, response, origin)?;
        }
        Ok(())
    }

    fn ceiling(&self) -> usize {
        let configured = self.config.max_concurrency.unwrap_or(usize::MAX);
        let transport = self.transport.max_concurrency().unwrap_or(usize::MAX);
        configured.min(transport).max(1)
    }

    fn admit(&mut self) {
        let ceiling = self.ceiling();
        while self.in_flight.len() < ceiling {
            let Some(request) = self.pending.pop_front() else {
                break;
            };
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: Arc<Request>) {
        request.mark_performed();
        self.stats.admitted += 1;
        telemetry::record_admission();
        debug!(
            request_id = request.id(),
            method = %request.method(),
            url = request.full_url(),
            retry = request.retry_count(),
            "admitting request"
        );

        let transport = Arc::clone(&self.transport);
        let span = RequestSpan::new(request.id(), request.method().as_str(), request.full_url());
        let exchange = async move {
            let started = Instant::now();
            let mut response = transport.execute(&request).await;
            if response.time().is_zero() {
                response = response.with_time(started.elapsed());
            }
            Span::current().record_response(&response);
            Completion { request, response: Arc::new(response) }
        };
        self.in_flight.push(exchange.instrument(span).boxed());
    }

    fn finish_transport(&mut self, completion: Completion) -> Result<(), HydraError> {
        let Completion { request, response } = completion;
        telemetry::record_transport_latency(response.time());

        // Once aborted, a retry would be discarded with the queue.
        if !self.aborted && self.config.retry.should_retry(&request, &response) {
            let attempt = request.increment_retry();
            self.stats.retries += 1;
            telemetry::record_retry(response.return_code().code());
            debug!(
                request_id = request.id(),
                attempt,
                return_code = response.return_code().code(),
                "retrying request"
            );
            request.begin_cycle();
            self.pending.push_back(request);
            return Ok(());
        }

        self.complete(request, response, Origin::Transport)
    }

    fn discard_queued(&mut self) {
        for request in self.pending.drain(..) {
            self.memo.forget(&request);
        }
        self.resolved.clear();
    }

    fn finish_run(&mut self) {
        self.aborted = false;
        self.memo.clear_answered();
    }

    /// Stop admitting. In-flight exchanges finish and fire their callbacks;
    /// queued requests are dropped when the loop next turns.
    pub fn abort(&mut self) {
        info!(
            queued = self.pending.len(),
            in_flight = self.in_flight.len(),
            "abort requested"
        );
        self.aborted = true;
    }

    /// Drop queued and in-flight work and the memo table immediately.
    pub fn abort_now(&mut self) {
        info!(
            queued = self.pending.len(),
            in_flight = self.in_flight.len(),
            memoized = self.memo.len(),
            "hard abort"
        );
        self.pending.clear();
        self.resolved.clear();
        self.in_flight = FuturesUnordered::new();
        self.memo.clear();
        self.aborted = false;
    }

    /// Hand every queued request to the transport on the current tokio
    /// runtime and return without waiting. No callbacks fire for them;
    /// each request's response slot is filled when its exchange ends.
    pub fn fire_and_forget(&mut self) -> Result<usize, HydraError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| HydraError::Runtime(e.to_string()))?;

        let mut released = 0;
        for request in self.pending.drain(..) {
            self.memo.forget(&request);
            request.mark_performed();
            let transport = Arc::clone(&self.transport);
            handle.spawn(async move {
                let response = transport.execute(&request).await;
                request.set_response(Arc::new(response));
            });
            released += 1;
        }
        self.stats.admitted += released as u64;
        debug!(released, "fire and forget");
        Ok(released)
    }
}
