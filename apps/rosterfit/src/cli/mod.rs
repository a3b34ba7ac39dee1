//! # rosterfit CLI Module
//!
//! This module implements the CLI interface for rosterfit.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `inspect` - Summarize a roster and preview week counts
//! - `suggest` - Run a TOML plan and print ranked candidates
//! - `compare` - Compare one person against a planned project's roles

mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rosterfit_core::RosterFitError;
use std::path::PathBuf;

use crate::source::RosterSource;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// rosterfit - staffing capacity and fit
///
/// Ranks people for project roles by how much of the required effort their
/// free hours cover, and carries commitments from one project to the next.
#[derive(Parser, Debug)]
#[command(name = "rosterfit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Roster to load at startup (path or http(s) link)
        #[arg(short, long)]
        roster: Option<RosterSource>,

        /// Project count ceiling (overrides ROSTERFIT_MAX_PROJECTS)
        #[arg(long)]
        max_projects: Option<usize>,
    },

    /// Summarize a roster
    Inspect {
        /// Roster path or http(s) link
        roster: RosterSource,

        /// Preview the weeks covered from this date
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        /// Preview the weeks covered up to this date
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },

    /// Run a plan file and print ranked candidates per project
    Suggest {
        /// Plan file (TOML)
        plan: PathBuf,

        /// Roster path or link (overrides the plan's `roster`)
        #[arg(short, long)]
        roster: Option<String>,

        /// Write one CSV per project into this directory
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Compare one person against every role a planned project requests
    Compare {
        /// Plan file (TOML)
        plan: PathBuf,

        /// Project number in the plan (1-based)
        #[arg(short, long)]
        project: usize,

        /// Person to compare
        #[arg(short, long)]
        name: String,

        /// Roster path or link (overrides the plan's `roster`)
        #[arg(short, long)]
        roster: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), RosterFitError> {
    let json_mode = cli.json_mode;
    if cli.verbose {
        tracing::debug!("Executing {:?}", cli.command);
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            roster,
            max_projects,
        } => cmd_serve(&host, port, roster.as_ref(), max_projects).await,
        Commands::Inspect { roster, start, end } => {
            let range = match (start, end) {
                (Some(s), Some(e)) => Some((s, e)),
                _ => None,
            };
            cmd_inspect(&roster, range, json_mode).await
        }
        Commands::Suggest {
            plan,
            roster,
            export,
        } => cmd_suggest(&plan, roster.as_deref(), export.as_deref(), json_mode).await,
        Commands::Compare {
            plan,
            project,
            name,
            roster,
        } => cmd_compare(&plan, roster.as_deref(), project, &name, json_mode).await,
    }
}
