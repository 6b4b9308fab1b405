//! Request description plus per-call mutable state.
//!
//! The shape (URL, method, headers, body, params, transport options) is
//! fixed by `RequestBuilder::build`. Response slot, callback lists and retry
//! counter live behind a lock so callers and the scheduler can share one
//! `Arc<Request>`.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use url::Url;

use super::headers::NormalizedHeaders;
use super::response::Response;
use crate::error::{BoxError, HydraError};
use crate::scheduler::{AfterComplete, CallbackResult, Hydra, OnComplete};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Value produced by a completion handler, shared with memoized followers.
pub type HandledResponse = Arc<dyn Any + Send + Sync>;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    pub fn is_get(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = HydraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            other => Err(HydraError::InvalidConfig(format!("unknown HTTP method: {other}"))),
        }
    }
}

/// Basic authentication credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Default)]
struct RequestState {
    response: Option<Arc<Response>>,
    performed: bool,
    retry_count: u32,
    on_complete: Vec<OnComplete>,
    after_complete: Vec<AfterComplete>,
}

/// One HTTP call: immutable shape plus the state of its current cycle.
pub struct Request {
    id: u64,
    url: String,
    method: Method,
    headers: NormalizedHeaders,
    body: Option<Bytes>,
    params: Vec<(String, String)>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    follow_redirects: bool,
    max_redirects: Option<u32>,
    auth: Option<Auth>,
    cache_timeout: Option<Duration>,
    full_url: String,
    cache_key: String,
    state: Mutex<RequestState>,
    handled: Arc<Mutex<Option<HandledResponse>>>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("url", &self.full_url)
            .field("performed", &self.performed())
            .field("retry_count", &self.retry_count())
            .finish()
    }
}

impl Request {
    /// GET request for `url` with default options.
    pub fn new(url: impl Into<String>) -> Arc<Self> {
        RequestBuilder::new(url).build()
    }

    pub fn builder(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url)
    }

    pub fn get(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url).method(Method::Get)
    }

    pub fn post(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url).method(Method::Post)
    }

    pub fn put(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url).method(Method::Put)
    }

    pub fn delete(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url).method(Method::Delete)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// URL as given to the builder.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Normalized URL with params appended.
    pub fn full_url(&self) -> &str {
        &self.full_url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &NormalizedHeaders {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    pub fn max_redirects(&self) -> Option<u32> {
        self.max_redirects
    }

    pub fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    pub fn cache_timeout(&self) -> Option<Duration> {
        self.cache_timeout
    }

    /// Fingerprint of method, normalized URL and body.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Host part of the URL, if it parses.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.full_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Response of the latest finished cycle.
    pub fn response(&self) -> Option<Arc<Response>> {
        self.state.lock().response.clone()
    }

    /// True if this request itself went through the transport.
    pub fn performed(&self) -> bool {
        self.state.lock().performed
    }

    pub fn retry_count(&self) -> u32 {
        self.state.lock().retry_count
    }

    /// Register a completion callback. Callbacks run in registration order.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnMut(&mut Hydra, &Arc<Response>) -> CallbackResult + Send + 'static,
    {
        self.state.lock().on_complete.push(Box::new(f));
    }

    /// Register a completion handler whose result becomes this request's
    /// handled response. Handlers run in the same order as `on_complete`.
    pub fn on_complete_with<F, T>(&self, mut f: F)
    where
        F: FnMut(&mut Hydra, &Arc<Response>) -> Result<T, BoxError> + Send + 'static,
        T: Any + Send + Sync,
    {
        let slot = Arc::clone(&self.handled);
        self.on_complete(move |hydra, response| {
            let value = f(hydra, response)?;
            *slot.lock() = Some(Arc::new(value));
            Ok(())
        });
    }

    /// Handler result of the latest cycle, or the response itself when no
    /// handler produced one.
    pub fn handled_response(&self) -> Option<HandledResponse> {
        if let Some(value) = self.handled.lock().clone() {
            return Some(value);
        }
        self.response().map(|response| response as HandledResponse)
    }

    /// Typed view of [`Request::handled_response`].
    pub fn handled_response_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.handled_response()?.downcast::<T>().ok()
    }

    pub fn set_handled_response(&self, value: HandledResponse) {
        *self.handled.lock() = Some(value);
    }

    /// Explicitly set handler result, without the response fallback.
    pub(crate) fn handled_value(&self) -> Option<HandledResponse> {
        self.handled.lock().clone()
    }

    /// Register a callback that runs after every `on_complete` of this
    /// completion, including those of memoized followers.
    pub fn after_complete<F>(&self, f: F)
    where
        F: FnMut(&mut Hydra, &Arc<Request>) -> CallbackResult + Send + 'static,
    {
        self.state.lock().after_complete.push(Box::new(f));
    }

    pub(crate) fn begin_cycle(&self) {
        let mut state = self.state.lock();
        state.response = None;
        state.performed = false;
        *self.handled.lock() = None;
    }

    pub(crate) fn mark_performed(&self) {
        self.state.lock().performed = true;
    }

    pub(crate) fn set_response(&self, response: Arc<Response>) {
        self.state.lock().response = Some(response);
    }

    pub(crate) fn increment_retry(&self) -> u32 {
        let mut state = self.state.lock();
        state.retry_count += 1;
        state.retry_count
    }

    pub(crate) fn take_on_complete(&self) -> Vec<OnComplete> {
        std::mem::take(&mut self.state.lock().on_complete)
    }

    /// Put callbacks back in front of any registered while they ran.
    pub(crate) fn restore_on_complete(&self, mut callbacks: Vec<OnComplete>) {
        let mut state = self.state.lock();
        callbacks.append(&mut state.on_complete);
        state.on_complete = callbacks;
    }

    pub(crate) fn take_after_complete(&self) -> Vec<AfterComplete> {
        std::mem::take(&mut self.state.lock().after_complete)
    }

    pub(crate) fn restore_after_complete(&self, mut callbacks: Vec<AfterComplete>) {
        let mut state = self.state.lock();
        callbacks.append(&mut state.after_complete);
        state.after_complete = callbacks;
    }
}

/// Builder for [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    url: String,
    method: Method,
    headers: NormalizedHeaders,
    body: Option<Bytes>,
    params: Vec<(String, String)>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    follow_redirects: bool,
    max_redirects: Option<u32>,
    auth: Option<Auth>,
    cache_timeout: Option<Duration>,
}

impl RequestBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: NormalizedHeaders::new(),
            body: None,
            params: Vec::new(),
            timeout: None,
            connect_timeout: None,
            follow_redirects: false,
            max_redirects: None,
            auth: None,
            cache_timeout: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: &NormalizedHeaders) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn user_agent(self, agent: impl Into<String>) -> Self {
        self.header("User-Agent", agent)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = Some(max);
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.auth = Some(Auth { username: username.into(), password });
        self
    }

    /// TTL for the external cache. Only non-zero values make the response
    /// eligible for caching.
    pub fn cache_timeout(mut self, ttl: Duration) -> Self {
        self.cache_timeout = Some(ttl);
        self
    }

    pub fn build(self) -> Arc<Request> {
        let full_url = full_url(&self.url, &self.params);
        let cache_key = cache_key(self.method, &full_url, self.body.as_deref());
        Arc::new(Request {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            url: self.url,
            method: self.method,
            headers: self.headers,
            body: self.body,
            params: self.params,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
            auth: self.auth,
            cache_timeout: self.cache_timeout,
            full_url,
            cache_key,
            state: Mutex::new(RequestState::default()),
            handled: Arc::default(),
        })
    }
}

/// Normalized form of a URL; unparsable input is returned unchanged.
pub(crate) fn normalize_url(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

fn full_url(url: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return normalize_url(url);
    }
    let mut sorted = params.to_vec();
    sorted.sort();
    let pairs = sorted.iter().map(|(k, v)| (k.as_str(), v.as_str()));

    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().extend_pairs(pairs);
            parsed.to_string()
        }
        Err(_) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{url}{sep}{query}")
        }
    }
}

fn cache_key(method: Method, full_url: &str, body: Option<&[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(full_url.as_bytes());
    hasher.update(b"\n");
    if let Some(body) = body {
        hasher.update(body);
    }
    hex::encode(hasher.finalize())
}
