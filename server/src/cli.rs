//! # CLI Interface
//!
//! Command-line structure for `verity-server` using `clap` derive.
//! Subcommands: `run`, `code`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Verity admin server.
///
/// Serves credential discovery and verified-identity lookup over HTTP,
/// backed by an in-memory identity pool seeded from a JSON fixture, and
/// exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "verity-server",
    about = "Verity identity verification admin server",
    version,
    propagate_version = true
)]
pub struct VerityCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the admin API server.
    Run(RunArgs),
    /// Print the current verification code for a stored code secret.
    Code(CodeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the admin API (discovery, lookup, metrics).
    #[arg(long, env = "VERITY_LISTEN_PORT", default_value_t = 4434)]
    pub port: u16,

    /// JSON array of identities to seed the in-memory store with.
    ///
    /// The store starts empty when omitted.
    #[arg(long, short = 'f', env = "VERITY_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Service-wide secret mixed into every verification code.
    #[arg(long, env = "VERITY_CODE_SECRET", hide_env_values = true)]
    pub code_secret: String,

    /// Lifespan of newly issued verification tokens, in seconds.
    #[arg(long, env = "VERITY_VERIFICATION_LIFESPAN_SECS", default_value_t = 3600)]
    pub lifespan_secs: u64,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "VERITY_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `code` subcommand.
#[derive(Parser, Debug)]
pub struct CodeArgs {
    /// Service-wide secret mixed into every verification code.
    #[arg(long, env = "VERITY_CODE_SECRET", hide_env_values = true)]
    pub code_secret: String,

    /// The token's stored code secret.
    #[arg(long)]
    pub token: String,
}
