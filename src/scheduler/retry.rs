//! Retry decision for finished transport exchanges.
//!
//! Unless `max_retries` is set, the policy has no attempt cap: a retry code
//! that keeps matching keeps the request cycling.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::http::{Request, Response};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    /// Retry responses that timed out while connecting.
    pub retry_connect_timeouts: bool,
    /// Extend connect-timeout retries beyond GET. The remote may have seen
    /// the request, so this is opt-in.
    pub retry_any_method: bool,
    /// Transport return codes retried for any method.
    pub retry_codes: BTreeSet<i32>,
    /// Cap on `retry_count`; `None` retries for as long as the rules match.
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    pub fn should_retry(&self, request: &Request, response: &Response) -> bool {
        if self.max_retries.is_some_and(|max| request.retry_count() >= max) {
            return false;
        }
        if self.retry_connect_timeouts
            && response.connect_timed_out()
            && (request.method().is_get() || self.retry_any_method)
        {
            return true;
        }
        let code = response.return_code();
        !code.is_ok() && self.retry_codes.contains(&code.code())
    }
}
