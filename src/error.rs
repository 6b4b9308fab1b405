//! Error types for the Hydra scheduler.
//!
//! Policy violations surface synchronously from `Hydra::queue`. Transport
//! failures are never errors here: they arrive as a normal `Response` with a
//! non-zero return code.

use thiserror::Error;

/// Boxed error returned from callbacks and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the scheduler.
#[derive(Debug, Error)]
pub enum HydraError {
    #[error("Real HTTP connections are disabled. Unregistered request: {url} (host: {host})")]
    NetConnectNotAllowed { host: String, url: String },

    #[error("Callback failed: {0}")]
    Callback(BoxError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No async runtime available: {0}")]
    Runtime(String),
}

impl HydraError {
    /// Returns true if this error is a net-connect policy violation.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::NetConnectNotAllowed { .. })
    }

    /// Returns true if this error came out of a user callback.
    pub fn is_callback_failure(&self) -> bool {
        matches!(self, Self::Callback(_))
    }
}

/// Errors produced by external cache implementations.
///
/// The scheduler never propagates these: a failing read is a miss and a
/// failing write is dropped.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache entry rejected: {0}")]
    Rejected(String),
}
