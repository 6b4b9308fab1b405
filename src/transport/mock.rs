//! Scripted transport for tests, benches and dry runs.
//!
//! Routes are keyed by normalized full URL (params included). Unrouted
//! requests answer 200 with the full URL as body.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::Transport;
use crate::http::{normalize_url, Request, Response};

#[derive(Default)]
struct Route {
    responses: VecDeque<Response>,
    delay: Option<Duration>,
}

impl Route {
    /// Next scripted response; the last one repeats.
    fn next(&mut self) -> Option<Response> {
        if self.responses.len() > 1 {
            self.responses.pop_front()
        } else {
            self.responses.front().cloned()
        }
    }
}

/// Decrements the in-flight counter even if the exchange is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-process [`Transport`] with scripted responses.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    default_delay: Option<Duration>,
    capacity: Option<usize>,
    executed: Mutex<Vec<String>>,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to every exchange without a route-specific delay.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Advertised admission capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Answer `url` with `response`.
    pub fn respond(&self, url: &str, response: Response) -> &Self {
        self.respond_sequence(url, [response])
    }

    /// Answer `url` with `responses` in order, repeating the last.
    pub fn respond_sequence(&self, url: &str, responses: impl IntoIterator<Item = Response>) -> &Self {
        let mut routes = self.routes.lock();
        let route = routes.entry(normalize_url(url)).or_default();
        route.responses = responses.into_iter().collect();
        self
    }

    /// Delay exchanges for `url`.
    pub fn delay(&self, url: &str, delay: Duration) -> &Self {
        self.routes.lock().entry(normalize_url(url)).or_default().delay = Some(delay);
        self
    }

    /// Full URLs in the order they were handed to the transport.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executed.lock().len()
    }

    pub fn executions_for(&self, url: &str) -> usize {
        let url = normalize_url(url);
        self.executed.lock().iter().filter(|u| **u == url).count()
    }

    /// Most exchanges observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn reset_log(&self) {
        self.executed.lock().clear();
        self.peak.store(0, Ordering::SeqCst);
    }

    fn script(&self, url: &str) -> (Option<Response>, Option<Duration>) {
        let mut routes = self.routes.lock();
        match routes.get_mut(url) {
            Some(route) => (route.next(), route.delay.or(self.default_delay)),
            None => (None, self.default_delay),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &Request) -> Response {
        let url = request.full_url().to_string();
        self.executed.lock().push(url.clone());

        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.current);

        let (scripted, delay) = self.script(&url);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        scripted.unwrap_or_else(|| Response::new(200).with_body(url))
    }

    fn max_concurrency(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReturnCode;

    #[test]
    fn scripted_response_without_runtime_setup() {
        let transport = MockTransport::new();
        transport.respond("http://localhost:3000/x", Response::new(404));
        let response =
            tokio_test::block_on(transport.execute(&Request::new("http://localhost:3000/x")));
        assert_eq!(response.code(), 404);
        assert_eq!(transport.in_flight(), 0);
    }

    #[tokio::test]
    async fn unrouted_requests_echo_url() {
        let transport = MockTransport::new();
        let response = transport.execute(&Request::new("http://localhost:3000/foo")).await;
        assert_eq!(response.code(), 200);
        assert_eq!(response.text(), "http://localhost:3000/foo");
        assert_eq!(transport.executed(), vec!["http://localhost:3000/foo".to_string()]);
    }

    #[tokio::test]
    async fn sequence_repeats_last() {
        let transport = MockTransport::new();
        transport.respond_sequence(
            "http://localhost:3000/flaky",
            [Response::failed(ReturnCode::ConnectTimedOut), Response::new(200)],
        );
        let request = Request::new("http://localhost:3000/flaky");

        assert!(transport.execute(&request).await.connect_timed_out());
        assert_eq!(transport.execute(&request).await.code(), 200);
        assert_eq!(transport.execute(&request).await.code(), 200);
        assert_eq!(transport.executions_for("http://localhost:3000/flaky"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_peak_concurrency() {
        let transport = MockTransport::new().with_default_delay(Duration::from_millis(10));
        let a = Request::new("http://localhost:3000/a");
        let b = Request::new("http://localhost:3000/b");

        futures::join!(transport.execute(&a), transport.execute(&b));
        assert_eq!(transport.peak_concurrency(), 2);
        assert_eq!(transport.in_flight(), 0);
    }

    #[test]
    fn capacity_is_advertised() {
        assert_eq!(MockTransport::new().max_concurrency(), None);
        assert_eq!(MockTransport::new().with_capacity(3).max_concurrency(), Some(3));
    }
}
