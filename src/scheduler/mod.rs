//! Request scheduling for Hydra.
//!
//! Admission pipeline, run loop, completion path, memoization, retry
//! policy, stubs and the process-wide hook/policy state.

mod completion;
mod globals;
mod hooks;
mod hydra;
mod memo;
mod policy;
mod queue;
mod retry;
mod stats;
mod stub;

pub use globals::Globals;
pub use hooks::{AfterComplete, BeforeHook, CallbackResult, GlobalHook, GlobalHooks, OnComplete};
pub use hydra::{Hydra, HydraConfig};
pub use memo::MemoTable;
pub use policy::{NetConnectPolicy, LOCALHOST_ALIASES};
pub use retry::RetryPolicy;
pub use stats::HydraStats;
pub use stub::{Stub, StubHandle, StubRegistry, UrlMatcher};
