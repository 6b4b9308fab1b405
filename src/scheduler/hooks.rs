//! Callback and hook types.
//!
//! Per-request and per-scheduler callbacks receive `&mut Hydra` so they can
//! queue more work or abort; process-wide hooks are shared across
//! schedulers and threads and only see the request and response.

use std::sync::Arc;

use crate::error::BoxError;
use crate::http::{Request, Response};

use super::hydra::Hydra;

/// Result of a callback. An `Err` aborts the current batch.
pub type CallbackResult = Result<(), BoxError>;

/// Completion callback on a request or a scheduler.
pub type OnComplete = Box<dyn FnMut(&mut Hydra, &Arc<Response>) -> CallbackResult + Send>;

/// Callback that runs after all `on_complete` callbacks of a completion.
pub type AfterComplete = Box<dyn FnMut(&mut Hydra, &Arc<Request>) -> CallbackResult + Send>;

/// Process-wide completion hook.
pub type GlobalHook = Arc<dyn Fn(&Request, &Arc<Response>) -> CallbackResult + Send + Sync>;

/// Process-wide hook fired before any `on_complete` callback.
pub type BeforeHook = Arc<dyn Fn(&Request) -> CallbackResult + Send + Sync>;

/// Ordered hook lists; no de-duplication.
#[derive(Default, Clone)]
pub struct GlobalHooks {
    pub(crate) on_complete: Vec<GlobalHook>,
    pub(crate) after_request_before_on_complete: Vec<BeforeHook>,
}

impl GlobalHooks {
    pub fn len(&self) -> usize {
        self.on_complete.len() + self.after_request_before_on_complete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
