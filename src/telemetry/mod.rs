//! Telemetry for Hydra.
//!
//! Structured logging through `tracing`, spans around transport exchanges
//! and counters through the `metrics` facade.

mod logging;
mod metrics;
mod spans;

pub use logging::{build_filter, init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    init_metrics, record_admission, record_cache_error, record_callback_failure,
    record_completion, record_interception, record_retry, record_transport_latency,
};
pub use spans::{RequestSpan, SpanExt};
