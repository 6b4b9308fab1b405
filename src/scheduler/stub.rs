//! Stub registry: canned responses that short-circuit real dispatch.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use regex::Regex;

use crate::error::HydraError;
use crate::http::{normalize_url, Method, NormalizedHeaders, Request, Response};

/// How a stub selects request URLs.
#[derive(Debug, Clone)]
pub enum UrlMatcher {
    /// Equal to the request's normalized full URL.
    Exact(String),
    /// Regex searched in the request's full URL.
    Pattern(Regex),
}

impl UrlMatcher {
    pub fn exact(url: &str) -> Self {
        Self::Exact(normalize_url(url))
    }

    pub fn pattern(pattern: &str) -> Result<Self, HydraError> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| HydraError::InvalidConfig(format!("bad stub pattern {pattern:?}: {e}")))
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == url,
            Self::Pattern(re) => re.is_match(url),
        }
    }
}

impl From<&str> for UrlMatcher {
    fn from(url: &str) -> Self {
        Self::exact(url)
    }
}

impl From<String> for UrlMatcher {
    fn from(url: String) -> Self {
        Self::exact(&url)
    }
}

impl From<Regex> for UrlMatcher {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

/// A registered matcher and its canned responses.
///
/// A stub only matches once it has been given a response.
pub struct Stub {
    method: Method,
    matcher: UrlMatcher,
    headers: Option<NormalizedHeaders>,
    responses: Mutex<VecDeque<Arc<Response>>>,
}

/// Handle returned by `stub`, used to attach responses.
pub type StubHandle = Arc<Stub>;

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("method", &self.method)
            .field("matcher", &self.matcher)
            .field("headers", &self.headers)
            .field("responses", &self.responses.lock().len())
            .finish()
    }
}

impl Stub {
    pub fn new(method: Method, matcher: UrlMatcher, headers: Option<NormalizedHeaders>) -> Self {
        Self {
            method,
            matcher,
            headers,
            responses: Mutex::new(VecDeque::new()),
        }
    }

    /// Answer every matching request with `response`.
    pub fn and_return(&self, response: Response) -> &Self {
        let mut responses = self.responses.lock();
        responses.clear();
        responses.push_back(Arc::new(response));
        self
    }

    /// Answer matching requests with `responses` in order; the last one
    /// keeps being returned once the others are used up.
    pub fn and_return_sequence(&self, responses: impl IntoIterator<Item = Response>) -> &Self {
        let mut queue = self.responses.lock();
        queue.clear();
        queue.extend(responses.into_iter().map(Arc::new));
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn matcher(&self) -> &UrlMatcher {
        &self.matcher
    }

    pub fn has_response(&self) -> bool {
        !self.responses.lock().is_empty()
    }

    pub fn matches(&self, request: &Request) -> bool {
        if self.method != request.method() || !self.matcher.matches(request.full_url()) {
            return false;
        }
        match &self.headers {
            Some(expected) => request.headers().matches(expected),
            None => true,
        }
    }

    fn next_response(&self) -> Option<Arc<Response>> {
        let mut responses = self.responses.lock();
        if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        }
    }
}

/// Ordered list of stubs; first match wins.
#[derive(Debug, Default)]
pub struct StubRegistry {
    stubs: RwLock<Vec<StubHandle>>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stub(&self, method: Method, matcher: impl Into<UrlMatcher>) -> StubHandle {
        self.register(Stub::new(method, matcher.into(), None))
    }

    /// Stub that also requires the request to carry `headers`.
    pub fn stub_with_headers(
        &self,
        method: Method,
        matcher: impl Into<UrlMatcher>,
        headers: NormalizedHeaders,
    ) -> StubHandle {
        self.register(Stub::new(method, matcher.into(), Some(headers)))
    }

    pub fn register(&self, stub: Stub) -> StubHandle {
        let handle = Arc::new(stub);
        self.stubs.write().push(Arc::clone(&handle));
        handle
    }

    /// Response of the first armed stub matching `request`.
    pub fn find(&self, request: &Request) -> Option<Arc<Response>> {
        let stubs = self.stubs.read();
        stubs
            .iter()
            .filter(|stub| stub.has_response() && stub.matches(request))
            .find_map(|stub| stub.next_response())
    }

    pub fn stubs(&self) -> Vec<StubHandle> {
        self.stubs.read().clone()
    }

    pub fn set_stubs(&self, stubs: Vec<StubHandle>) {
        *self.stubs.write() = stubs;
    }

    pub fn clear(&self) {
        self.stubs.write().clear();
    }

    pub fn len(&self) -> usize {
        self.stubs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.read().is_empty()
    }
}
