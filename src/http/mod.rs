//! HTTP request and response model shared by the scheduler and transports.

mod headers;
mod request;
mod response;

pub use headers::NormalizedHeaders;
pub(crate) use request::normalize_url;
pub use request::{Auth, HandledResponse, Method, Request, RequestBuilder};
pub use response::{Response, ReturnCode};
