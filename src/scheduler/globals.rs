//! Process-wide scheduler state: net-connect policy, stubs and hooks.
//!
//! Every `Hydra` holds an `Arc<Globals>`. `Hydra::new` uses the process
//! instance from [`Globals::process`]; tests build their own with
//! [`Globals::new`] or call [`Globals::reset`] between runs.
//!
//! Initial state: net connect allowed, localhost not special, no ignored
//! hosts, no stubs, no hooks.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::error::HydraError;
use crate::http::{Method, NormalizedHeaders, Request, Response};

use super::hooks::{BeforeHook, CallbackResult, GlobalHook, GlobalHooks};
use super::policy::NetConnectPolicy;
use super::stub::{StubHandle, StubRegistry, UrlMatcher};

static PROCESS_GLOBALS: OnceLock<Arc<Globals>> = OnceLock::new();

/// Shared policy, stub registry and hook lists.
#[derive(Default)]
pub struct Globals {
    policy: RwLock<NetConnectPolicy>,
    stubs: StubRegistry,
    hooks: RwLock<GlobalHooks>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance, created on first use.
    pub fn process() -> Arc<Self> {
        Arc::clone(PROCESS_GLOBALS.get_or_init(|| Arc::new(Self::new())))
    }

    /// Restore the initial state.
    pub fn reset(&self) {
        *self.policy.write() = NetConnectPolicy::default();
        self.stubs.clear();
        self.clear_global_hooks();
    }

    pub fn net_connect_policy(&self) -> NetConnectPolicy {
        self.policy.read().clone()
    }

    pub fn set_net_connect_policy(&self, policy: NetConnectPolicy) {
        *self.policy.write() = policy;
    }

    pub fn allow_net_connect(&self) -> bool {
        self.policy.read().allow_net_connect
    }

    pub fn set_allow_net_connect(&self, allow: bool) {
        self.policy.write().allow_net_connect = allow;
    }

    pub fn ignore_localhost(&self) -> bool {
        self.policy.read().ignore_localhost
    }

    pub fn set_ignore_localhost(&self, ignore: bool) {
        self.policy.write().ignore_localhost = ignore;
    }

    pub fn ignore_hosts(&self) -> Vec<String> {
        self.policy.read().ignore_hosts.clone()
    }

    pub fn set_ignore_hosts<I, S>(&self, hosts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.write().ignore_hosts = hosts.into_iter().map(Into::into).collect();
    }

    pub(crate) fn check_net_connect(&self, request: &Request) -> Result<(), HydraError> {
        self.policy.read().check(request)
    }

    pub fn stubs(&self) -> &StubRegistry {
        &self.stubs
    }

    pub fn stub(&self, method: Method, matcher: impl Into<UrlMatcher>) -> StubHandle {
        self.stubs.stub(method, matcher)
    }

    pub fn stub_with_headers(
        &self,
        method: Method,
        matcher: impl Into<UrlMatcher>,
        headers: NormalizedHeaders,
    ) -> StubHandle {
        self.stubs.stub_with_headers(method, matcher, headers)
    }

    pub fn clear_stubs(&self) {
        self.stubs.clear();
    }

    /// Hook fired for every completion of every scheduler sharing this state.
    pub fn on_complete<F>(&self, f: F)
    where
        F: Fn(&Request, &Arc<Response>) -> CallbackResult + Send + Sync + 'static,
    {
        self.hooks.write().on_complete.push(Arc::new(f));
    }

    /// Hook fired before any `on_complete` callback of a completion.
    pub fn after_request_before_on_complete<F>(&self, f: F)
    where
        F: Fn(&Request) -> CallbackResult + Send + Sync + 'static,
    {
        self.hooks.write().after_request_before_on_complete.push(Arc::new(f));
    }

    pub fn clear_global_hooks(&self) {
        *self.hooks.write() = GlobalHooks::default();
    }

    pub fn hooks_len(&self) -> usize {
        self.hooks.read().len()
    }

    // Snapshots so hooks can register hooks without deadlocking.
    pub(crate) fn on_complete_hooks(&self) -> Vec<GlobalHook> {
        self.hooks.read().on_complete.clone()
    }

    pub(crate) fn before_hooks(&self) -> Vec<BeforeHook> {
        self.hooks.read().after_request_before_on_complete.clone()
    }
}
