//! Net-connect allow-list, evaluated when a request is queued.

use serde::Serialize;

use crate::error::HydraError;
use crate::http::Request;

/// Host names treated as the local machine.
pub const LOCALHOST_ALIASES: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0"];

/// Which hosts may be contacted over the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetConnectPolicy {
    pub allow_net_connect: bool,
    /// Localhost aliases stay reachable when net connect is off.
    pub ignore_localhost: bool,
    /// Hosts that stay reachable when net connect is off.
    pub ignore_hosts: Vec<String>,
}

impl Default for NetConnectPolicy {
    fn default() -> Self {
        Self {
            allow_net_connect: true,
            ignore_localhost: false,
            ignore_hosts: Vec::new(),
        }
    }
}

impl NetConnectPolicy {
    pub fn is_localhost(host: &str) -> bool {
        LOCALHOST_ALIASES.iter().any(|alias| alias.eq_ignore_ascii_case(host))
    }

    /// Whether a request to `host` may go out. A missing host is only
    /// allowed while net connect is on.
    pub fn allows(&self, host: Option<&str>) -> bool {
        if self.allow_net_connect {
            return true;
        }
        let Some(host) = host else { return false };
        if self.ignore_localhost && Self::is_localhost(host) {
            return true;
        }
        self.ignore_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    pub fn check(&self, request: &Request) -> Result<(), HydraError> {
        let host = request.host();
        if self.allows(host.as_deref()) {
            return Ok(());
        }
        Err(HydraError::NetConnectNotAllowed {
            host: host.unwrap_or_default(),
            url: request.full_url().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed() -> NetConnectPolicy {
        NetConnectPolicy { allow_net_connect: false, ..Default::default() }
    }

    #[test]
    fn default_allows_everything() {
        let policy = NetConnectPolicy::default();
        assert!(policy.allows(Some("example.com")));
        assert!(policy.allows(None));
    }

    #[test]
    fn ignore_localhost_covers_all_aliases() {
        let policy = NetConnectPolicy { ignore_localhost: true, ..closed() };
        for alias in LOCALHOST_ALIASES {
            assert!(policy.allows(Some(alias)), "{alias} should be allowed");
        }
        assert!(!policy.allows(Some("example.com")));
    }

    #[test]
    fn ignore_hosts_is_exact_and_case_insensitive() {
        let policy = NetConnectPolicy {
            ignore_hosts: vec!["127.0.0.1".into(), "Api.Internal".into()],
            ..closed()
        };
        assert!(policy.allows(Some("127.0.0.1")));
        assert!(policy.allows(Some("api.internal")));
        assert!(!policy.allows(Some("localhost")));
        assert!(!policy.allows(None));
    }

    #[test]
    fn check_reports_host() {
        let request = Request::new("http://example.com:3000/");
        let err = closed().check(&request).unwrap_err();
        match err {
            HydraError::NetConnectNotAllowed { host, .. } => assert_eq!(host, "example.com"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
