//! dormgrade command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration (environment, then flags) and initialize logging.
//! - Open the database and dispatch one engine operation per invocation.
//!
//! # Invariants
//! - Exit code is non-zero whenever the requested operation failed.
//! - Command output goes to stdout; diagnostics go to the log target.

use clap::{Parser, Subcommand};
use dormgrade_core::{init_from_config, CoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

/// dormgrade - boarding school grading and permission engine
#[derive(Parser, Debug)]
#[command(name = "dormgrade")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database path (overrides DORMGRADE_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides DORMGRADE_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files (overrides DORMGRADE_LOG_DIR)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Per-member aggregation budget in milliseconds
    #[arg(long)]
    member_budget_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // === Grading ===
    /// Grade the previous calendar month (or an explicit period) once
    RunGrading {
        /// Period to grade instead of last month, as YYYY-MM-01
        #[arg(long)]
        period: Option<String>,
    },

    /// Stay in the foreground and grade at the start of every month
    Schedule,

    // === Capabilities ===
    /// Grant a capability to an actor
    Grant(commands::CapabilityArgs),

    /// Revoke a capability from an actor
    Revoke(commands::CapabilityArgs),

    /// List capabilities granted to an actor
    Capabilities {
        /// Actor username
        username: String,
    },

    // === Directory ===
    /// Register an actor identity
    RegisterActor {
        username: String,

        /// ADMIN, MEMBER or EXTERNAL
        #[arg(long, default_value = "MEMBER")]
        role: String,
    },

    /// Create a member profile for a MEMBER actor
    Enroll {
        /// Actor username
        username: String,

        #[arg(long)]
        full_name: String,

        #[arg(long)]
        division: String,
    },

    /// Print the resolved configuration
    ShowConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = init_from_config(&config) {
        eprintln!("error: {err}");
        return ExitCode::from(2);
    }

    let result = match &cli.command {
        Commands::RunGrading { period } => commands::run_grading(&config, period.as_deref()),
        Commands::Schedule => commands::schedule(&config),
        Commands::Grant(args) => commands::grant(&config, args),
        Commands::Revoke(args) => commands::revoke(&config, args),
        Commands::Capabilities { username } => commands::capabilities(&config, username),
        Commands::RegisterActor { username, role } => {
            commands::register_actor(&config, username, role)
        }
        Commands::Enroll {
            username,
            full_name,
            division,
        } => commands::enroll(&config, username, full_name, division),
        Commands::ShowConfig => {
            commands::show_config(&config);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig, String> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.trim().to_ascii_lowercase();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(budget) = cli.member_budget_ms {
        if budget == 0 {
            return Err("--member-budget-ms must be greater than zero".to_string());
        }
        config.member_budget_ms = budget;
    }
    Ok(config)
}
