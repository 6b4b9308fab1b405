//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read configuration directly from environment variables.

use crate::config::{self, EffectiveConfig};
use crate::telemetry;

/// Print effective config as key-value pairs to stdout.
pub fn run_show() {
    let cfg = config::load().effective_config();
    print_config(&cfg);
}

/// Print effective config as JSON to stdout.
pub fn run_show_json() -> i32 {
    let cfg = config::load().effective_config();
    match serde_json::to_string_pretty(&cfg) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("Failed to serialize configuration: {e}");
            1
        }
    }
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    println!("HYDRA_MAX_CONCURRENCY=0");
    println!("HYDRA_MEMOIZE=true");
    println!("HYDRA_RETRY_CONNECT_TIMEOUTS=false");
    println!("HYDRA_RETRY_ANY_METHOD=false");
    println!("HYDRA_RETRY_CODES=");
    println!("HYDRA_MAX_RETRIES=0");
    println!("HYDRA_ALLOW_NET_CONNECT=true");
    println!("HYDRA_IGNORE_LOCALHOST=false");
    println!("HYDRA_IGNORE_HOSTS=");
    println!("HYDRA_TRANSPORT_CAPACITY=200");
    println!("HYDRA_USER_AGENT=hydra-core/{}", env!("CARGO_PKG_VERSION"));
    println!("HYDRA_LOG_LEVEL=info");
    println!("HYDRA_LOG_FORMAT=pretty");
}

/// Check the loaded configuration for misconfigurations.
///
/// Returns 0 if valid, 1 if any warnings are found.
pub fn run_validate() -> i32 {
    let warnings = collect_warnings(&config::load());
    for warning in &warnings {
        eprintln!("WARNING: {warning}");
    }
    if warnings.is_empty() {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

fn collect_warnings(env: &config::EnvConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Err(e) = env.hydra.validate() {
        warnings.push(e.to_string());
    }
    if let Err(e) = telemetry::build_filter(&env.log) {
        warnings.push(format!("HYDRA_LOG_LEVEL: {e}"));
    }
    if let (Some(max), Some(capacity)) = (env.hydra.max_concurrency, env.transport.capacity) {
        if max > capacity {
            warnings.push(format!(
                "HYDRA_MAX_CONCURRENCY ({max}) exceeds HYDRA_TRANSPORT_CAPACITY ({capacity}); \
                 the transport ceiling applies"
            ));
        }
    }
    if env.hydra.retry.retry_codes.contains(&0) {
        warnings.push("HYDRA_RETRY_CODES contains 0, which never matches a failure".into());
    }
    if env.hydra.retry.retry_any_method && !env.hydra.retry.retry_connect_timeouts {
        warnings.push(
            "HYDRA_RETRY_ANY_METHOD has no effect without HYDRA_RETRY_CONNECT_TIMEOUTS".into(),
        );
    }
    if env.net_connect.allow_net_connect
        && (env.net_connect.ignore_localhost || !env.net_connect.ignore_hosts.is_empty())
    {
        warnings.push(
            "HYDRA_IGNORE_LOCALHOST/HYDRA_IGNORE_HOSTS have no effect while net connect is allowed"
                .into(),
        );
    }
    warnings
}

fn print_config(cfg: &EffectiveConfig) {
    let codes: Vec<String> = cfg.retry_codes.iter().map(i32::to_string).collect();
    println!("HYDRA_MAX_CONCURRENCY={}", cfg.max_concurrency);
    println!("HYDRA_MEMOIZE={}", cfg.memoize);
    println!("HYDRA_RETRY_CONNECT_TIMEOUTS={}", cfg.retry_connect_timeouts);
    println!("HYDRA_RETRY_ANY_METHOD={}", cfg.retry_any_method);
    println!("HYDRA_RETRY_CODES={}", codes.join(","));
    println!("HYDRA_MAX_RETRIES={}", cfg.max_retries);
    println!("HYDRA_ALLOW_NET_CONNECT={}", cfg.allow_net_connect);
    println!("HYDRA_IGNORE_LOCALHOST={}", cfg.ignore_localhost);
    println!("HYDRA_IGNORE_HOSTS={}", cfg.ignore_hosts.join(","));
    println!("HYDRA_TRANSPORT_CAPACITY={}", cfg.transport_capacity);
    println!("HYDRA_USER_AGENT={}", cfg.user_agent);
    println!("HYDRA_LOG_LEVEL={}", cfg.log_level);
    println!("HYDRA_LOG_FORMAT={}", cfg.log_format);
}
