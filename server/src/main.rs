// Copyright (c) 2026 Verity Contributors. MIT License.
// See LICENSE for details.

//! # Verity Admin Server
//!
//! Entry point for the `verity-server` binary. Parses CLI arguments,
//! initializes logging and metrics, seeds the identity pool, and serves the
//! admin API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     : start the admin API server
//! - `code`    : print today's verification code for a stored code secret
//! - `version` : print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use verity_core::identity::TraitSchema;
use verity_core::verification::derive_code;
use verity_core::{MemoryStore, VerificationSettings};

use cli::{Commands, VerityCli};
use logging::LogFormat;
use metrics::DiscoveryMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VerityCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Code(args) => {
            print_code(args);
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Seeds the store and serves the admin API until a shutdown signal.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    );

    if args.code_secret.is_empty() {
        bail!("--code-secret must not be empty");
    }
    if args.lifespan_secs == 0 {
        bail!("--lifespan-secs must be positive");
    }

    let settings = VerificationSettings {
        lifespan: Duration::from_secs(args.lifespan_secs),
        ..VerificationSettings::with_secret(args.code_secret)
    };

    tracing::info!(
        port = args.port,
        fixtures = ?args.fixtures,
        ?settings,
        "starting verity-server"
    );

    // --- Identity pool ---
    let store = match &args.fixtures {
        Some(path) => seed_store(path, &settings)?,
        None => MemoryStore::new(),
    };
    tracing::info!(identities = store.len(), "identity pool ready");

    // --- Metrics ---
    let metrics =
        Arc::new(DiscoveryMetrics::new().context("failed to register prometheus metrics")?);

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: Arc::new(store),
        metrics,
    };

    // --- API server ---
    let router = api::create_router(app_state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", addr))?;
    tracing::info!("admin API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    tracing::info!("verity-server stopped");
    Ok(())
}

/// Loads fixture identities, reconciling each one's verifiable addresses
/// from its `email` trait before inserting it.
///
/// Addresses already present in the fixture keep their verification state.
fn seed_store(path: &Path, settings: &VerificationSettings) -> Result<MemoryStore> {
    let mut identities = MemoryStore::read_fixture(path)
        .with_context(|| format!("failed to load fixtures from {}", path.display()))?;

    let schema = TraitSchema::email_only();
    for identity in &mut identities {
        if let Err(errors) = identity.reconcile_addresses(&schema, settings.lifespan) {
            let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            bail!(
                "fixture identity {} has invalid traits: {}",
                identity.id,
                details.join("; ")
            );
        }
    }

    MemoryStore::from_identities(identities).context("failed to seed identity pool")
}

/// Prints the code a user would currently be asked for.
fn print_code(args: cli::CodeArgs) {
    println!("{}", derive_code(&args.code_secret, &args.token));
}

fn print_version() {
    println!("verity-server {}", env!("CARGO_PKG_VERSION"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");
}
