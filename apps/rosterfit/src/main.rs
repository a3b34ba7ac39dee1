//! # rosterfit - Staffing Capacity & Fit
//!
//! The main binary for the rosterfit staffing engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for roster inspection and plan runs
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │               apps/rosterfit (THE BINARY)             │
//! │                                                       │
//! │  ┌─────────────┐   ┌─────────────┐   ┌────────────┐   │
//! │  │    CLI      │   │  HTTP API   │   │   Roster   │   │
//! │  │   (clap)    │   │   (axum)    │   │   Source   │   │
//! │  └──────┬──────┘   └──────┬──────┘   └─────┬──────┘   │
//! │         └─────────────────┼────────────────┘          │
//! │                           ▼                           │
//! │                  ┌─────────────────┐                  │
//! │                  │ rosterfit-core  │                  │
//! │                  │  (THE LOGIC)    │                  │
//! │                  └─────────────────┘                  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server with a roster preloaded
//! rosterfit serve --roster roster.json --port 8080
//!
//! # CLI operations
//! rosterfit inspect roster.json --start 2024-01-01 --end 2024-03-31
//! rosterfit suggest plan.toml --export out/
//! rosterfit compare plan.toml --project 2 --name "Ana Lima"
//! ```

use clap::Parser;
use rosterfit::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // ROSTERFIT_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("ROSTERFIT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rosterfit=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  rosterfit v{}
  capacity • fit • allocation
"#,
        env!("CARGO_PKG_VERSION")
    );
}
