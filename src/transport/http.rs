//! Real HTTP transport backed by reqwest.

use std::collections::HashMap;
use std::error::Error as _;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::redirect::Policy;
use serde::Serialize;
use url::Url;

use super::Transport;
use crate::http::{Method, NormalizedHeaders, Request, Response, ReturnCode};

const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Transport-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportConfig {
    /// Most exchanges in flight at once; `None` means no limit.
    pub capacity: Option<usize>,
    /// Sent when a request has no `User-Agent` header of its own.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            capacity: Some(200),
            user_agent: format!("hydra-core/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Client settings that cannot vary per request in reqwest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ClientKey {
    connect_timeout: Option<Duration>,
    /// `None` disables redirects.
    max_redirects: Option<u32>,
}

impl ClientKey {
    fn for_request(request: &Request) -> Self {
        Self {
            connect_timeout: request.connect_timeout(),
            max_redirects: request
                .follow_redirects()
                .then(|| request.max_redirects().unwrap_or(DEFAULT_MAX_REDIRECTS)),
        }
    }
}

/// [`Transport`] performing real network I/O.
pub struct ReqwestTransport {
    config: TransportConfig,
    clients: Mutex<HashMap<ClientKey, reqwest::Client>>,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config, clients: Mutex::new(HashMap::new()) }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn client(&self, key: ClientKey) -> Result<reqwest::Client, reqwest::Error> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let redirect = match key.max_redirects {
            Some(max) => Policy::limited(max as usize),
            None => Policy::none(),
        };
        let mut builder = reqwest::Client::builder()
            .redirect(redirect)
            .user_agent(self.config.user_agent.clone());
        if let Some(timeout) = key.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    async fn exchange(&self, request: &Request) -> Result<Response, Response> {
        let url = Url::parse(request.full_url())
            .map_err(|e| Response::failed(ReturnCode::UrlMalformat).with_error_message(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Response::failed(ReturnCode::UnsupportedProtocol)
                .with_error_message(format!("unsupported scheme: {}", url.scheme())));
        }

        let client = self
            .client(ClientKey::for_request(request))
            .map_err(|e| Response::failed(ReturnCode::Other(2)).with_error_message(e.to_string()))?;

        let mut builder = client.request(reqwest_method(request.method()), url);
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(auth) = request.auth() {
            builder = builder.basic_auth(&auth.username, auth.password.as_ref());
        }

        let reply = builder.send().await.map_err(failure)?;
        let status = reply.status().as_u16();
        let headers = reply_headers(reply.headers());
        let body = reply.bytes().await.map_err(failure)?;

        Ok(Response::new(status).with_headers(headers).with_body(body))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &Request) -> Response {
        let started = Instant::now();
        let response = match self.exchange(request).await {
            Ok(response) | Err(response) => response,
        };
        if !response.return_code().is_ok() {
            tracing::debug!(
                url = request.full_url(),
                return_code = response.return_code().code(),
                error = response.error_message().unwrap_or_default(),
                "transport failure"
            );
        }
        response.with_time(started.elapsed())
    }

    fn max_concurrency(&self) -> Option<usize> {
        self.config.capacity
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

/// Every reply header, repeated names included.
fn reply_headers(map: &reqwest::header::HeaderMap) -> NormalizedHeaders {
    map.iter()
        .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect()
}

fn failure(err: reqwest::Error) -> Response {
    Response::failed(classify(&err)).with_error_message(describe(&err))
}

/// Map a reqwest error onto a transport return code. Connect-phase
/// timeouts are kept apart from timeouts after the connection was made.
fn classify(err: &reqwest::Error) -> ReturnCode {
    if err.is_timeout() {
        return if err.is_connect() {
            ReturnCode::ConnectTimedOut
        } else {
            ReturnCode::OperationTimedOut
        };
    }
    if err.is_connect() {
        return if looks_like_dns_failure(err) {
            ReturnCode::CouldntResolveHost
        } else {
            ReturnCode::CouldntConnect
        };
    }
    if err.is_redirect() {
        return ReturnCode::TooManyRedirects;
    }
    if err.is_builder() {
        return ReturnCode::UrlMalformat;
    }
    if err.is_body() || err.is_decode() {
        return ReturnCode::RecvError;
    }
    if err.is_request() {
        return ReturnCode::SendError;
    }
    ReturnCode::GotNothing
}

fn looks_like_dns_failure(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns") || text.contains("lookup") || text.contains("resolve") {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Error text including the source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_key_tracks_redirect_policy() {
        let plain = Request::new("http://localhost/");
        assert_eq!(ClientKey::for_request(&plain).max_redirects, None);

        let follow = Request::get("http://localhost/").follow_redirects(true).build();
        assert_eq!(ClientKey::for_request(&follow).max_redirects, Some(DEFAULT_MAX_REDIRECTS));

        let capped = Request::get("http://localhost/")
            .follow_redirects(true)
            .max_redirects(2)
            .connect_timeout(Duration::from_millis(50))
            .build();
        let key = ClientKey::for_request(&capped);
        assert_eq!(key.max_redirects, Some(2));
        assert_eq!(key.connect_timeout, Some(Duration::from_millis(50)));
    }

    #[test]
    fn clients_are_reused_per_key() {
        let transport = ReqwestTransport::default();
        let key = ClientKey::for_request(&Request::new("http://localhost/"));
        transport.client(key).unwrap();
        transport.client(key).unwrap();
        assert_eq!(transport.clients.lock().len(), 1);
    }

    #[test]
    fn default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.capacity, Some(200));
        assert!(config.user_agent.starts_with("hydra-core/"));
        assert_eq!(ReqwestTransport::new(config).max_concurrency(), Some(200));
    }

    #[tokio::test]
    async fn unparsable_url_is_malformed() {
        let transport = ReqwestTransport::default();
        let response = transport.execute(&Request::new("not a url")).await;
        assert_eq!(response.code(), 0);
        assert_eq!(response.return_code(), ReturnCode::UrlMalformat);
    }

    #[tokio::test]
    async fn non_http_scheme_is_unsupported() {
        let transport = ReqwestTransport::default();
        let response = transport.execute(&Request::new("ftp://localhost/file")).await;
        assert_eq!(response.return_code(), ReturnCode::UnsupportedProtocol);
        assert!(response.error_message().unwrap().contains("ftp"));
    }

    #[tokio::test]
    async fn refused_connection_is_couldnt_connect() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = ReqwestTransport::default();
        let response = transport.execute(&Request::new(format!("http://127.0.0.1:{port}/"))).await;
        assert_eq!(response.code(), 0);
        assert_eq!(response.return_code(), ReturnCode::CouldntConnect);
    }

    #[test]
    fn reply_headers_keep_repeats() {
        let mut map = reqwest::header::HeaderMap::new();
        map.append("set-cookie", "a=1".parse().unwrap());
        map.append("set-cookie", "b=2".parse().unwrap());
        map.insert("content-length", "0".parse().unwrap());

        let headers = reply_headers(&map);
        assert_eq!(headers.get_all("Set-Cookie"), ["a=1", "b=2"]);
        assert_eq!(headers.get("content_length"), Some("0"));
    }

    #[tokio::test]
    async fn duplicate_set_cookie_survives_exchange() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            let mut buf = [0u8; 1024];
            while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\
                      Content-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .unwrap();
        });

        let transport = ReqwestTransport::default();
        let response = transport.execute(&Request::new(format!("http://127.0.0.1:{port}/"))).await;
        server.join().unwrap();

        assert_eq!(response.code(), 200);
        assert_eq!(response.headers().get_all("set-cookie"), ["a=1", "b=2"]);
    }
}
