//! Journal CLI - Command-line interface for the staking-session journal.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "journal")]
#[command(about = "Staking-session journal and risk-management ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Journal directory
    #[arg(long, default_value = ".", global = true)]
    journal: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new journal directory
    Init,
    /// List persisted sessions
    Sessions {
        /// Only sessions with this mode
        #[arg(long)]
        mode: Option<String>,
        /// Only sessions from the last N days
        #[arg(long)]
        days: Option<i64>,
    },
    /// Show one session with its full operation history
    Show {
        /// Session id
        id: u64,
    },
    /// Delete a session
    Delete {
        /// Session id
        id: u64,
        /// Delete permanently instead of moving to trash
        #[arg(long)]
        hard: bool,
    },
    /// Import session records from a JSON file
    Import {
        /// Path to a JSON array of session records
        file: PathBuf,
        /// Skip normalization and import records verbatim
        #[arg(long)]
        raw: bool,
    },
    /// Flip the outcome of an operation in an archived session
    Edit {
        /// Session id
        session: u64,
        /// Operation index within the session history
        index: usize,
        /// New outcome
        outcome: Outcome,
    },
    /// Detect and heal corrupted session records
    Repair {
        #[command(subcommand)]
        command: RepairCommands,
    },
    /// Inspect the soft-delete trash partition
    Trash {
        #[command(subcommand)]
        command: TrashCommands,
    },
}

#[derive(Subcommand)]
enum RepairCommands {
    /// Remove corrupted session records
    Clear,
    /// Fill corrupted fields with safe defaults instead of removing
    Fill,
    /// Recompute invalid financial results from operation history
    Results,
}

#[derive(Subcommand)]
enum TrashCommands {
    /// List trash records
    List,
    /// Remove expired trash records
    Purge,
}

/// Operation outcome, as written on the command line.
#[derive(Clone, Copy, ValueEnum)]
enum Outcome {
    /// The operation was won.
    Win,
    /// The operation was lost.
    Loss,
}

impl Outcome {
    fn is_win(self) -> bool {
        matches!(self, Outcome::Win)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::run(&cli.journal),
        Commands::Sessions { mode, days } => {
            commands::sessions::list(&cli.journal, mode.as_deref(), days)
        }
        Commands::Show { id } => commands::sessions::show(&cli.journal, id),
        Commands::Delete { id, hard } => commands::sessions::delete(&cli.journal, id, hard),
        Commands::Import { file, raw } => commands::import::run(&cli.journal, &file, raw),
        Commands::Edit {
            session,
            index,
            outcome,
        } => commands::edit::run(&cli.journal, session, index, outcome.is_win()),
        Commands::Repair { command } => match command {
            RepairCommands::Clear => commands::repair::clear(&cli.journal),
            RepairCommands::Fill => commands::repair::fill(&cli.journal),
            RepairCommands::Results => commands::repair::results(&cli.journal),
        },
        Commands::Trash { command } => match command {
            TrashCommands::List => commands::trash::list(&cli.journal),
            TrashCommands::Purge => commands::trash::purge(&cli.journal),
        },
    }
}
