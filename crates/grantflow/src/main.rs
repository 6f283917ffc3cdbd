//! Grantflow command-line front end
//!
//! Inspect the permission catalog, check drafts before submission, and
//! replay approval scenarios against an in-memory workflow engine.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use grantflow_logging::{init_logging, LogConfig};
use grantflow_workflow::RequestStatus;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "grantflow", about = "Permission grant approval workflow")]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Permission catalog (TOML)
    #[arg(
        long,
        global = true,
        env = "GRANTFLOW_CATALOG",
        default_value = "config/catalog.toml"
    )]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List grantable permissions and their evidence requirements
    Catalog,

    /// Check a draft request (JSON) without submitting it
    Validate {
        /// Draft file
        draft: PathBuf,
    },

    /// Submit drafts and apply reviewer actions from a scenario file (JSON)
    Replay {
        /// Scenario file
        scenario: PathBuf,

        /// Only list requests with this status (pending, approved, denied)
        #[arg(long)]
        status: Option<RequestStatus>,

        /// Only list requests whose id contains this text (case-insensitive)
        #[arg(short = 's', long)]
        search: Option<String>,

        /// Earliest creation time, RFC 3339 (inclusive)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Latest creation time, RFC 3339 (inclusive)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
}

fn run(cli: Cli) -> Result<ExitCode> {
    let catalog = Arc::new(cli::load_catalog(&cli.catalog)?);

    match cli.command {
        Commands::Catalog => cli::catalog::run(&catalog, cli.json)?,
        Commands::Validate { draft } => {
            if !cli::validate::run(catalog, &draft, cli.json)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Replay {
            scenario,
            status,
            search,
            from,
            to,
        } => {
            let view = cli::replay::view_filter(status, search, from, to);
            cli::replay::run(catalog, &scenario, &view, cli.json)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "grantflow",
        verbose: cli.verbose,
        json_output: cli.json,
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: logging unavailable: {:#}", err);
            None
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
