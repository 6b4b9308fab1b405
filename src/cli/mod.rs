//! CLI subcommands for `hydra-fetch`.
//!
//! ## Usage
//!
//! ```bash
//! hydra-fetch fetch http://localhost:3000/a http://localhost:3000/b
//! hydra-fetch config show
//! hydra-fetch config validate
//! ```

pub mod config_cmd;
pub mod fetch_cmd;

pub use fetch_cmd::{fetch_with, run_fetch, FetchArgs, FetchOutcome, FetchReport};
