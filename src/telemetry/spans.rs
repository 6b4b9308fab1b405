//! Span utilities for transport exchanges.

use tracing::{info_span, Span};

use crate::http::Response;

/// Extension trait for filling in exchange spans.
pub trait SpanExt {
    /// Record the outcome of a transport exchange into the span.
    fn record_response(&self, response: &Response);
}

impl SpanExt for Span {
    fn record_response(&self, response: &Response) {
        self.record("code", response.code());
        self.record("latency_ms", response.time().as_millis() as u64);
        if response.return_code().is_ok() {
            self.record("status", "ok");
        } else {
            self.record("status", "error");
            self.record("return_code", response.return_code().code());
            if let Some(message) = response.error_message() {
                self.record("error.message", message);
            }
        }
    }
}

/// Factory for transport exchange spans.
pub struct RequestSpan;

impl RequestSpan {
    /// Fields `status`, `code`, `return_code`, `error.message` and
    /// `latency_ms` start empty and are filled by [`SpanExt::record_response`].
    pub fn new(request_id: u64, method: &str, url: &str) -> Span {
        info_span!(
            "http_exchange",
            request_id = request_id,
            method = %method,
            url = %url,
            status = tracing::field::Empty,
            code = tracing::field::Empty,
            return_code = tracing::field::Empty,
            error.message = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}
