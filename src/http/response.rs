//! Response container handed to callbacks.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use super::headers::NormalizedHeaders;

/// Outcome of one transport exchange, using the classic numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Ok,
    UnsupportedProtocol,
    UrlMalformat,
    CouldntResolveHost,
    CouldntConnect,
    /// Timed out before the connection was established.
    ConnectTimedOut,
    /// Timed out after the connection was established.
    OperationTimedOut,
    TooManyRedirects,
    GotNothing,
    SendError,
    RecvError,
    Other(i32),
}

impl ReturnCode {
    /// Numeric transport code. Both timeout phases share code 28.
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UnsupportedProtocol => 1,
            Self::UrlMalformat => 3,
            Self::CouldntResolveHost => 6,
            Self::CouldntConnect => 7,
            Self::ConnectTimedOut | Self::OperationTimedOut => 28,
            Self::TooManyRedirects => 47,
            Self::GotNothing => 52,
            Self::SendError => 55,
            Self::RecvError => 56,
            Self::Other(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Ok => "No error",
            Self::UnsupportedProtocol => "Unsupported protocol",
            Self::UrlMalformat => "URL using bad/illegal format or missing URL",
            Self::CouldntResolveHost => "Couldn't resolve host name",
            Self::CouldntConnect => "Couldn't connect to server",
            Self::ConnectTimedOut | Self::OperationTimedOut => "Timeout was reached",
            Self::TooManyRedirects => "Number of redirects hit maximum amount",
            Self::GotNothing => "Server returned nothing (no headers, no data)",
            Self::SendError => "Failed sending data to the peer",
            Self::RecvError => "Failure when receiving data from the peer",
            Self::Other(_) => "Transport error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimedOut | Self::OperationTimedOut)
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// Result of a request: status, headers, body, timing and transport outcome.
///
/// `code() == 0` exactly when `return_code()` is not `Ok`; the constructors
/// maintain this.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    code: u16,
    headers: NormalizedHeaders,
    body: Bytes,
    time: Duration,
    return_code: ReturnCode,
    error_message: Option<String>,
}

impl Response {
    /// Successful exchange with the given HTTP status.
    ///
    /// A status of 0 means the server sent nothing, so it is recorded as
    /// `ReturnCode::GotNothing`.
    pub fn new(code: u16) -> Self {
        if code == 0 {
            return Self::failed(ReturnCode::GotNothing);
        }
        Self {
            code,
            headers: NormalizedHeaders::new(),
            body: Bytes::new(),
            time: Duration::ZERO,
            return_code: ReturnCode::Ok,
            error_message: None,
        }
    }

    /// Exchange that never produced an HTTP reply.
    pub fn failed(return_code: ReturnCode) -> Self {
        let return_code = if return_code.code() == 0 {
            ReturnCode::GotNothing
        } else {
            return_code
        };
        Self {
            code: 0,
            headers: NormalizedHeaders::new(),
            body: Bytes::new(),
            time: Duration::ZERO,
            return_code,
            error_message: Some(return_code.message().to_string()),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: NormalizedHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_time(mut self, time: Duration) -> Self {
        self.time = time;
        self
    }

    /// Replace the transport's error message (failed responses only).
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        if !self.return_code.is_ok() {
            self.error_message = Some(message.into());
        }
        self
    }

    /// HTTP status, or 0 when the transport never got a reply.
    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn headers(&self) -> &NormalizedHeaders {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn return_code(&self) -> ReturnCode {
        self.return_code
    }

    /// Transport error message; `None` for successful exchanges.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn timed_out(&self) -> bool {
        self.return_code.is_timeout()
    }

    pub fn connect_timed_out(&self) -> bool {
        self.return_code == ReturnCode::ConnectTimedOut
    }
}
