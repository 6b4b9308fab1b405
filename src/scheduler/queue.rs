//! Admission pipeline.
//!
//! Every decision here is synchronous: a request is rejected, answered
//! from a stub, the external cache or the memo table, attached to a pending
//! primary, or appended to the pending queue.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::HydraError;
use crate::http::{Request, Response};
use crate::telemetry;

use super::hydra::{Hydra, Origin, Resolved};
use super::memo::MemoLookup;

impl Hydra {
    /// Queue `request` behind everything already pending.
    ///
    /// Fails only on a net-connect policy violation, in which case the
    /// request is left untouched.
    pub fn queue(&mut self, request: Arc<Request>) -> Result<(), HydraError> {
        self.enqueue(request, false)
    }

    /// Queue `request` ahead of everything already pending.
    pub fn queue_front(&mut self, request: Arc<Request>) -> Result<(), HydraError> {
        self.enqueue(request, true)
    }

    fn enqueue(&mut self, request: Arc<Request>, front: bool) -> Result<(), HydraError> {
        if let Err(err) = self.globals.check_net_connect(&request) {
            debug!(url = request.full_url(), "net connect not allowed");
            return Err(err);
        }
        request.begin_cycle();

        if let Some(response) = self.find_stub(&request) {
            self.stats.stub_hits += 1;
            self.intercept(request, response, Origin::Stub);
            return Ok(());
        }

        if request.method().is_get() {
            if let Some(response) = self.cached_response(&request) {
                self.stats.cache_hits += 1;
                self.intercept(request, response, Origin::Cache);
                return Ok(());
            }
        }

        if self.config.memoize && request.method().is_get() {
            match self.memo.lookup_or_follow(&request) {
                MemoLookup::Followed => {
                    self.stats.memo_hits += 1;
                    telemetry::record_interception(Origin::Memo.as_str());
                    debug!(request_id = request.id(), url = request.full_url(), "following memoized request");
                    return Ok(());
                }
                MemoLookup::Answered(response) => {
                    self.stats.memo_hits += 1;
                    self.intercept(request, response, Origin::Memo);
                    return Ok(());
                }
                MemoLookup::Miss => self.memo.register_primary(&request),
            }
        }

        if front {
            self.pending.push_front(request);
        } else {
            self.pending.push_back(request);
        }
        Ok(())
    }

    fn intercept(&mut self, request: Arc<Request>, response: Arc<Response>, origin: Origin) {
        telemetry::record_interception(origin.as_str());
        debug!(
            request_id = request.id(),
            url = request.full_url(),
            origin = origin.as_str(),
            "request answered without dispatch"
        );
        self.resolved.push_back(Resolved { request, response, origin });
    }

    fn find_stub(&self, request: &Request) -> Option<Arc<Response>> {
        self.stubs
            .find(request)
            .or_else(|| self.globals.stubs().find(request))
    }

    fn cached_response(&mut self, request: &Request) -> Option<Arc<Response>> {
        let cache = self.cache.as_ref()?;
        match cache.get(request) {
            Ok(hit) => hit,
            Err(err) => {
                self.stats.cache_errors += 1;
                telemetry::record_cache_error("get");
                warn!(url = request.full_url(), error = %err, "cache lookup failed, treating as miss");
                None
            }
        }
    }
}
