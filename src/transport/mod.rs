//! Transport engines: the unit of work the scheduler admits.
//!
//! A transport performs one HTTP exchange and always yields a `Response`.
//! Failures are reported through `ReturnCode`, with connect-phase timeouts
//! kept apart from timeouts after the connection was established.

mod http;
mod mock;

use async_trait::async_trait;

use crate::http::{Request, Response};

pub use http::{ReqwestTransport, TransportConfig};
pub use mock::MockTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange for `request`.
    async fn execute(&self, request: &Request) -> Response;

    /// Most operations this transport runs at once; `None` means no limit.
    fn max_concurrency(&self) -> Option<usize> {
        None
    }
}
