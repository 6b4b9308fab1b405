//! `fetch` subcommand: run a batch of GETs (or one method for all URLs)
//! through a scheduler and print one line per completion.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::{self, EnvConfig};
use crate::http::{Method, Request, RequestBuilder, Response};
use crate::scheduler::{Globals, Hydra, HydraStats};
use crate::transport::{ReqwestTransport, Transport};

/// Parsed `fetch` arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchArgs {
    pub urls: Vec<String>,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub max_concurrency: Option<usize>,
    pub json: bool,
}

impl Default for FetchArgs {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            method: Method::Get,
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            timeout: None,
            connect_timeout: None,
            follow_redirects: false,
            max_concurrency: None,
            json: false,
        }
    }
}

impl FetchArgs {
    /// Parse arguments following `fetch`.
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--method" | "-X" => {
                    parsed.method = value(args, i, flag)?.parse().map_err(|e| format!("{e}"))?;
                    i += 2;
                }
                "--header" | "-H" => {
                    let raw = value(args, i, flag)?;
                    let (name, val) = raw
                        .split_once(':')
                        .ok_or_else(|| format!("Header must be NAME:VALUE, got {raw}"))?;
                    parsed.headers.push((name.trim().to_string(), val.trim().to_string()));
                    i += 2;
                }
                "--param" => {
                    let raw = value(args, i, flag)?;
                    let (key, val) = raw
                        .split_once('=')
                        .ok_or_else(|| format!("Param must be KEY=VALUE, got {raw}"))?;
                    parsed.params.push((key.to_string(), val.to_string()));
                    i += 2;
                }
                "--data" | "-d" => {
                    parsed.body = Some(value(args, i, flag)?.to_string());
                    i += 2;
                }
                "--timeout" => {
                    parsed.timeout = Some(seconds(value(args, i, flag)?, flag)?);
                    i += 2;
                }
                "--connect-timeout" => {
                    parsed.connect_timeout = Some(seconds(value(args, i, flag)?, flag)?);
                    i += 2;
                }
                "--max-concurrency" => {
                    let raw = value(args, i, flag)?;
                    let max = raw
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| format!("Invalid value for {flag}: {raw}"))?;
                    parsed.max_concurrency = Some(max);
                    i += 2;
                }
                "--follow" | "-L" => {
                    parsed.follow_redirects = true;
                    i += 1;
                }
                "--json" => {
                    parsed.json = true;
                    i += 1;
                }
                other if other.starts_with('-') => {
                    return Err(format!("Unknown argument: {other}"));
                }
                url => {
                    parsed.urls.push(url.to_string());
                    i += 1;
                }
            }
        }
        if parsed.urls.is_empty() {
            return Err("At least one URL is required".into());
        }
        Ok(parsed)
    }

    fn request(&self, url: &str) -> Arc<Request> {
        let mut builder = RequestBuilder::new(url)
            .method(self.method)
            .follow_redirects(self.follow_redirects);
        for (name, val) in &self.headers {
            builder = builder.header(name, val.clone());
        }
        for (key, val) in &self.params {
            builder = builder.param(key.clone(), val.clone());
        }
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        builder.build()
    }
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {flag}"))
}

fn seconds(raw: &str, flag: &str) -> Result<Duration, String> {
    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| format!("Invalid value for {flag}: {raw}"))
}

/// One printed completion.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub url: String,
    pub code: u16,
    pub return_code: i32,
    pub error: Option<String>,
    pub time_ms: u64,
    pub bytes: usize,
    pub performed: bool,
}

impl FetchOutcome {
    fn new(request: &Request, response: &Response) -> Self {
        Self {
            url: request.full_url().to_string(),
            code: response.code(),
            return_code: response.return_code().code(),
            error: response.error_message().map(str::to_string),
            time_ms: response.time().as_millis() as u64,
            bytes: response.body().len(),
            performed: request.performed(),
        }
    }

    fn line(&self) -> String {
        match &self.error {
            Some(error) => format!("{} ERR {} ({}) {}ms", self.url, self.return_code, error, self.time_ms),
            None => format!("{} {} {}B {}ms", self.url, self.code, self.bytes, self.time_ms),
        }
    }
}

/// Summary of a finished `fetch` run.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub outcomes: Vec<FetchOutcome>,
    pub stats: HydraStats,
}

impl FetchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.error.is_none() && o.code < 400)
    }
}

/// Run the batch against `transport`, with net-connect policy from `env`.
pub async fn fetch_with(
    args: &FetchArgs,
    env: &EnvConfig,
    transport: Arc<dyn Transport>,
    globals: Arc<Globals>,
) -> Result<FetchReport, String> {
    env.apply_net_connect(&globals);
    let mut config = env.hydra.clone();
    if args.max_concurrency.is_some() {
        config.max_concurrency = args.max_concurrency;
    }
    config.validate().map_err(|e| e.to_string())?;

    let mut hydra = Hydra::with_globals(config, transport, globals);
    let outcomes = Arc::new(Mutex::new(Vec::with_capacity(args.urls.len())));

    for url in &args.urls {
        let request = args.request(url);
        let sink = Arc::clone(&outcomes);
        let json = args.json;
        request.after_complete(move |_, request| {
            let Some(response) = request.response() else {
                return Ok(());
            };
            let outcome = FetchOutcome::new(request, &response);
            if json {
                println!("{}", serde_json::to_string(&outcome)?);
            } else {
                println!("{}", outcome.line());
            }
            sink.lock().push(outcome);
            Ok(())
        });
        hydra.queue(request).map_err(|e| e.to_string())?;
    }

    hydra.run().await.map_err(|e| e.to_string())?;
    let outcomes = std::mem::take(&mut *outcomes.lock());
    Ok(FetchReport { outcomes, stats: hydra.stats() })
}

/// Entry point for `hydra-fetch fetch ...`. Returns the process exit code.
pub async fn run_fetch(args: &[String]) -> i32 {
    let parsed = match FetchArgs::parse(args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Usage: hydra-fetch fetch [OPTIONS] <URL>...");
            return 2;
        }
    };

    let env = config::load();
    let transport = Arc::new(ReqwestTransport::new(env.transport.clone()));
    match fetch_with(&parsed, &env, transport, Globals::process()).await {
        Ok(report) => {
            tracing::info!(
                completed = report.stats.completed,
                admitted = report.stats.admitted,
                retries = report.stats.retries,
                memo_hits = report.stats.memo_hits,
                "fetch finished"
            );
            if report.all_succeeded() {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            2
        }
    }
}
