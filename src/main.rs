//! `hydra-fetch` entry point.
//!
//! ## CLI Subcommands
//!
//! - `hydra-fetch fetch [OPTIONS] <URL>...` - Fetch URLs through the scheduler
//! - `hydra-fetch config show|defaults|validate` - Inspect configuration
//! - `hydra-fetch version` - Show version

use std::process::ExitCode;

use hydra_core::cli::{config_cmd, run_fetch};
use hydra_core::config as hydra_config;
use hydra_core::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match command {
        "fetch" => {
            let env = hydra_config::load();
            if let Err(e) = telemetry::init_logging(&env.log) {
                eprintln!("Logging disabled: {e}");
            }
            telemetry::init_metrics();
            let code = run_fetch(&args[2..]).await;
            ExitCode::from(code as u8)
        }
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            let json = args.get(3).map(|s| s.as_str()) == Some("--json");
            match subcommand {
                "show" if json => ExitCode::from(config_cmd::run_show_json() as u8),
                "show" => {
                    config_cmd::run_show();
                    ExitCode::SUCCESS
                }
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => {
                    let code = config_cmd::run_validate();
                    ExitCode::from(code as u8)
                }
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("hydra-fetch {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "hydra-fetch - bounded-concurrency HTTP fetcher v{}

USAGE:
    hydra-fetch <COMMAND> [OPTIONS]

COMMANDS:
    fetch        Fetch one or more URLs through the scheduler
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

EXAMPLES:
    hydra-fetch fetch http://localhost:3000/a http://localhost:3000/b
    hydra-fetch fetch --max-concurrency 4 --json https://example.com/
    hydra-fetch config show --json
    hydra-fetch help fetch

ENVIRONMENT:
    HYDRA_*              See `hydra-fetch config defaults`
    HYDRA_LOG_LEVEL      Log filter (debug, info, hydra_core=trace, ...)

EXIT CODES:
    0  Success
    1  At least one request failed / configuration warnings
    2  Usage or configuration error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "fetch" => {
            eprintln!(
                "hydra-fetch fetch - Fetch URLs

USAGE:
    hydra-fetch fetch [OPTIONS] <URL>...

OPTIONS:
    -X, --method METHOD       HTTP method for every URL (default: GET)
    -H, --header NAME:VALUE   Add a request header (repeatable)
    --param KEY=VALUE         Add a query parameter (repeatable)
    -d, --data BODY           Request body
    --timeout SECS            Total timeout per request
    --connect-timeout SECS    Connect-phase timeout per request
    -L, --follow              Follow redirects
    --max-concurrency N       Scheduler ceiling for this run
    --json                    Print one JSON object per completion

DESCRIPTION:
    Queues every URL, runs the scheduler until all complete and prints
    one line per completion. Duplicate GETs are fetched once.
"
            );
        }
        "config" => {
            eprintln!(
                "hydra-fetch config - Inspect configuration

USAGE:
    hydra-fetch config <SUBCOMMAND>

SUBCOMMANDS:
    show [--json]  Show effective configuration
    defaults       Show default configuration
    validate       Check configuration for dead or conflicting settings
"
            );
        }
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'hydra-fetch help' for general usage.",
                command
            );
        }
    }
}
