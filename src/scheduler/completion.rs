//! Completion path: cache write-through, callbacks, memo followers.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{BoxError, HydraError};
use crate::http::{Request, Response};
use crate::telemetry;

use super::hydra::{Hydra, Origin};

impl Hydra {
    /// Finalize one resolved request and every follower waiting on it.
    pub(super) fn complete(
        &mut self,
        request: Arc<Request>,
        response: Arc<Response>,
        origin: Origin,
    ) -> Result<(), HydraError> {
        request.set_response(Arc::clone(&response));
        if origin != Origin::Cache {
            self.store_in_cache(&request, &response);
        }

        let followers = match origin {
            Origin::Transport => self.memo.resolve(&request, &response),
            _ => Vec::new(),
        };

        self.fire_completion(&request, &response, origin)?;
        let handled = request.handled_value();
        for follower in &followers {
            follower.set_response(Arc::clone(&response));
            if let Some(value) = &handled {
                follower.set_handled_response(Arc::clone(value));
            }
            self.fire_completion(follower, &response, Origin::Memo)?;
        }

        self.fire_after_complete(&request)?;
        for follower in &followers {
            self.fire_after_complete(follower)?;
        }
        Ok(())
    }

    fn fire_completion(
        &mut self,
        request: &Arc<Request>,
        response: &Arc<Response>,
        origin: Origin,
    ) -> Result<(), HydraError> {
        self.stats.completed += 1;
        telemetry::record_completion(origin.as_str(), response.code());
        debug!(
            request_id = request.id(),
            code = response.code(),
            origin = origin.as_str(),
            performed = request.performed(),
            "request complete"
        );

        for hook in self.globals.before_hooks() {
            if let Err(err) = hook(request.as_ref()) {
                return Err(self.fail(request, err));
            }
        }

        let mut callbacks = request.take_on_complete();
        let mut outcome = Ok(());
        for callback in callbacks.iter_mut() {
            outcome = callback(self, response);
            if outcome.is_err() {
                break;
            }
        }
        request.restore_on_complete(callbacks);
        if let Err(err) = outcome {
            return Err(self.fail(request, err));
        }

        let mut hooks = std::mem::take(&mut self.on_complete);
        let mut outcome = Ok(());
        for hook in hooks.iter_mut() {
            outcome = hook(self, response);
            if outcome.is_err() {
                break;
            }
        }
        hooks.append(&mut self.on_complete);
        self.on_complete = hooks;
        if let Err(err) = outcome {
            return Err(self.fail(request, err));
        }

        for hook in self.globals.on_complete_hooks() {
            if let Err(err) = hook(request.as_ref(), response) {
                return Err(self.fail(request, err));
            }
        }
        Ok(())
    }

    fn fire_after_complete(&mut self, request: &Arc<Request>) -> Result<(), HydraError> {
        let mut callbacks = request.take_after_complete();
        let mut outcome = Ok(());
        for callback in callbacks.iter_mut() {
            outcome = callback(self, request);
            if outcome.is_err() {
                break;
            }
        }
        request.restore_after_complete(callbacks);
        outcome.map_err(|err| self.fail(request, err))
    }

    fn store_in_cache(&mut self, request: &Request, response: &Arc<Response>) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        if !request.cache_timeout().is_some_and(|ttl| !ttl.is_zero()) {
            return;
        }
        if let Err(err) = cache.set(request, response) {
            self.stats.cache_errors += 1;
            telemetry::record_cache_error("set");
            warn!(url = request.full_url(), error = %err, "cache write failed");
        }
    }

    /// Record a callback failure and reset to an empty scheduler.
    fn fail(&mut self, request: &Request, err: BoxError) -> HydraError {
        self.stats.callback_failures += 1;
        telemetry::record_callback_failure();
        warn!(request_id = request.id(), url = request.full_url(), error = %err, "callback failed, aborting batch");
        self.abort_now();
        HydraError::Callback(err)
    }
}
