//! Configuration loading from environment variables.
//!
//! All values come from `HYDRA_*` environment variables with defaults.
//! Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `HYDRA_MAX_CONCURRENCY` | 0 | Scheduler ceiling (0 = transport decides) |
//! | `HYDRA_MEMOIZE` | true | Coalesce duplicate GETs |
//! | `HYDRA_RETRY_CONNECT_TIMEOUTS` | false | Retry connect-phase timeouts |
//! | `HYDRA_RETRY_ANY_METHOD` | false | Allow connect-timeout retry beyond GET |
//! | `HYDRA_RETRY_CODES` | (empty) | Comma-separated transport codes to retry |
//! | `HYDRA_MAX_RETRIES` | 0 | Retry cap per request (0 = no cap) |
//! | `HYDRA_ALLOW_NET_CONNECT` | true | Allow real network connections |
//! | `HYDRA_IGNORE_LOCALHOST` | false | Localhost stays reachable when net connect is off |
//! | `HYDRA_IGNORE_HOSTS` | (empty) | Comma-separated hosts reachable when net connect is off |
//! | `HYDRA_TRANSPORT_CAPACITY` | 200 | Transport ceiling (0 = unbounded) |
//! | `HYDRA_USER_AGENT` | hydra-core/<version> | Default User-Agent |
//! | `HYDRA_LOG_LEVEL` | info | Log filter directive |
//! | `HYDRA_LOG_FORMAT` | pretty | `json` or `pretty` |

use std::collections::BTreeSet;

use serde::Serialize;

use crate::scheduler::{Globals, HydraConfig, NetConnectPolicy, RetryPolicy};
use crate::telemetry::{LogConfig, LogFormat};
use crate::transport::TransportConfig;

const DEFAULT_TRANSPORT_CAPACITY: usize = 200;

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub max_concurrency: usize,
    pub memoize: bool,
    pub retry_connect_timeouts: bool,
    pub retry_any_method: bool,
    pub retry_codes: Vec<i32>,
    pub max_retries: u32,
    pub allow_net_connect: bool,
    pub ignore_localhost: bool,
    pub ignore_hosts: Vec<String>,
    pub transport_capacity: usize,
    pub user_agent: String,
    pub log_level: String,
    pub log_format: String,
}

/// All configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub hydra: HydraConfig,
    pub net_connect: NetConnectPolicy,
    pub transport: TransportConfig,
    pub log: LogConfig,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a boolean env var (`true/false`, `1/0`, `yes/no`, `on/off`).
fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Comma-separated list; blank items are skipped.
fn parse_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|val| {
            val.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Optional limit where 0 means "no limit".
fn non_zero(value: usize) -> Option<usize> {
    (value > 0).then_some(value)
}

fn load_retry_policy() -> RetryPolicy {
    let retry_codes: BTreeSet<i32> = parse_list("HYDRA_RETRY_CODES")
        .iter()
        .filter_map(|code| code.parse::<i32>().ok())
        .collect();
    RetryPolicy {
        retry_connect_timeouts: parse_bool("HYDRA_RETRY_CONNECT_TIMEOUTS", false),
        retry_any_method: parse_bool("HYDRA_RETRY_ANY_METHOD", false),
        retry_codes,
        max_retries: u32::try_from(parse_usize("HYDRA_MAX_RETRIES", 0))
            .ok()
            .filter(|max| *max > 0),
    }
}

fn load_hydra_config() -> HydraConfig {
    HydraConfig {
        max_concurrency: non_zero(parse_usize("HYDRA_MAX_CONCURRENCY", 0)),
        memoize: parse_bool("HYDRA_MEMOIZE", true),
        retry: load_retry_policy(),
    }
}

fn load_net_connect() -> NetConnectPolicy {
    NetConnectPolicy {
        allow_net_connect: parse_bool("HYDRA_ALLOW_NET_CONNECT", true),
        ignore_localhost: parse_bool("HYDRA_IGNORE_LOCALHOST", false),
        ignore_hosts: parse_list("HYDRA_IGNORE_HOSTS"),
    }
}

fn load_transport_config() -> TransportConfig {
    let defaults = TransportConfig::default();
    let user_agent = std::env::var("HYDRA_USER_AGENT")
        .ok()
        .map(|ua| ua.trim().to_string())
        .filter(|ua| !ua.is_empty())
        .unwrap_or(defaults.user_agent);
    TransportConfig {
        capacity: non_zero(parse_usize("HYDRA_TRANSPORT_CAPACITY", DEFAULT_TRANSPORT_CAPACITY)),
        user_agent,
    }
}

fn load_log_config() -> LogConfig {
    let level = std::env::var("HYDRA_LOG_LEVEL")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    let format = std::env::var("HYDRA_LOG_FORMAT")
        .ok()
        .and_then(|format| format.parse::<LogFormat>().ok())
        .unwrap_or_default();
    LogConfig { format, level, output_path: None }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to defaults without panicking.
pub fn load() -> EnvConfig {
    EnvConfig {
        hydra: load_hydra_config(),
        net_connect: load_net_connect(),
        transport: load_transport_config(),
        log: load_log_config(),
    }
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            max_concurrency: self.hydra.max_concurrency.unwrap_or(0),
            memoize: self.hydra.memoize,
            retry_connect_timeouts: self.hydra.retry.retry_connect_timeouts,
            retry_any_method: self.hydra.retry.retry_any_method,
            retry_codes: self.hydra.retry.retry_codes.iter().copied().collect(),
            max_retries: self.hydra.retry.max_retries.unwrap_or(0),
            allow_net_connect: self.net_connect.allow_net_connect,
            ignore_localhost: self.net_connect.ignore_localhost,
            ignore_hosts: self.net_connect.ignore_hosts.clone(),
            transport_capacity: self.transport.capacity.unwrap_or(0),
            user_agent: self.transport.user_agent.clone(),
            log_level: self.log.level.clone(),
            log_format: self.log.format.as_str().to_string(),
        }
    }

    /// Install the loaded net-connect policy into `globals`.
    pub fn apply_net_connect(&self, globals: &Globals) {
        globals.set_net_connect_policy(self.net_connect.clone());
    }
}
