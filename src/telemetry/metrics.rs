//! Metrics emitted through the `metrics` facade.
//!
//! Nothing here installs a recorder; without one every call is a no-op.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    describe_counter!("hydra_requests_admitted_total", "Requests handed to the transport");
    describe_counter!("hydra_requests_intercepted_total", "Requests answered without dispatch");
    describe_counter!("hydra_requests_retried_total", "Transport exchanges re-admitted");
    describe_counter!("hydra_requests_completed_total", "Completions delivered to callbacks");
    describe_counter!("hydra_callback_failures_total", "Callbacks that returned an error");
    describe_counter!("hydra_cache_errors_total", "Swallowed external cache failures");
    describe_histogram!(
        "hydra_transport_latency_seconds",
        Unit::Seconds,
        "Transport exchange latency"
    );
}

pub fn record_admission() {
    counter!("hydra_requests_admitted_total").increment(1);
}

pub fn record_interception(origin: &'static str) {
    counter!("hydra_requests_intercepted_total", "origin" => origin).increment(1);
}

pub fn record_retry(return_code: i32) {
    counter!("hydra_requests_retried_total", "return_code" => return_code.to_string())
        .increment(1);
}

pub fn record_completion(origin: &'static str, status: u16) {
    counter!(
        "hydra_requests_completed_total",
        "origin" => origin,
        "status" => status_class(status)
    )
    .increment(1);
}

pub fn record_callback_failure() {
    counter!("hydra_callback_failures_total").increment(1);
}

pub fn record_cache_error(operation: &'static str) {
    counter!("hydra_cache_errors_total", "operation" => operation).increment(1);
}

pub fn record_transport_latency(latency: Duration) {
    histogram!("hydra_transport_latency_seconds").record(latency.as_secs_f64());
}

fn status_class(status: u16) -> &'static str {
    match status {
        0 => "none",
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}
