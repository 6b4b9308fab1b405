//! Hydra: a concurrent HTTP request scheduler.
//!
//! Callers build [`Request`]s, queue them on a [`Hydra`] and `run` it. The
//! scheduler admits queued requests into a [`Transport`] up to a
//! concurrency ceiling, and fires callbacks as exchanges finish.
//!
//! Around each request it applies, in order at queue time:
//!
//! - the process-wide net-connect policy (violations fail `queue`)
//! - stubs (instance registry, then process-wide)
//! - an optional external [`ResponseCache`] (GET only)
//! - memoization of duplicate GETs
//!
//! After an exchange finishes, the retry policy decides whether the request
//! re-enters the queue before any callback fires.
//!
//! ```no_run
//! use std::sync::Arc;
//! use hydra_core::{Hydra, HydraConfig, Request, ReqwestTransport};
//!
//! # async fn demo() -> Result<(), hydra_core::HydraError> {
//! let mut hydra = Hydra::new(
//!     HydraConfig::default().with_max_concurrency(10),
//!     Arc::new(ReqwestTransport::default()),
//! );
//! let request = Request::new("http://localhost:3000/");
//! request.on_complete(|hydra, response| {
//!     if response.is_success() {
//!         hydra.queue(Request::new("http://localhost:3000/next"))?;
//!     }
//!     Ok(())
//! });
//! hydra.queue(request)?;
//! hydra.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod scheduler;
pub mod telemetry;
pub mod transport;

pub use cache::{CacheHooks, MemoryCache, MemoryCacheConfig, ResponseCache};
pub use error::{BoxError, CacheError, HydraError};
pub use http::{
    Auth, HandledResponse, Method, NormalizedHeaders, Request, RequestBuilder, Response, ReturnCode,
};
pub use scheduler::{
    CallbackResult, Globals, Hydra, HydraConfig, HydraStats, NetConnectPolicy, RetryPolicy,
    StubHandle, UrlMatcher,
};
pub use transport::{MockTransport, ReqwestTransport, Transport, TransportConfig};
