//! habitcal - personal habit calendar
//!
//! Log habits, bulk-import pasted notes and read monthly summaries from the
//! terminal.

mod commands;
mod process_lock;
mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use habitcal_core::{Config, Database, HabitStore};
use std::path::PathBuf;

use crate::process_lock::acquire_write_guard;

#[derive(Parser)]
#[command(name = "habitcal")]
#[command(about = "Personal habit calendar")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log a new record
    Log(LogArgs),
    /// Change fields of an existing record
    Edit(EditArgs),
    /// Delete a record
    Delete {
        /// Record id
        id: String,
    },
    /// Import records from pasted text (year line, then `DD/MM ...` lines)
    Import {
        /// File to read, or `-` for stdin
        #[arg(default_value = "-")]
        file: String,
        /// Year for dates when the text has no year line
        #[arg(long)]
        year: Option<i32>,
    },
    /// Show recent imports
    Imports {
        /// Maximum number of imports to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Show one day grouped by time of day
    Day {
        /// Day as YYYY-MM-DD
        date: String,
    },
    /// Monthly summary per category
    Month {
        /// Month as YYYY-MM
        month: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Monthly breakdown by time of day
    Hourly {
        /// Month as YYYY-MM
        month: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Days with activity in a year
    Calendar {
        /// Year, e.g. 2024
        year: i32,
    },
    /// List records
    List {
        /// Only records in this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Args)]
pub struct LogArgs {
    /// BOB, FL or SOCIAL
    pub category: String,
    /// Day to log on (YYYY-MM-DD); the record starts at noon
    #[arg(long, conflicts_with = "at")]
    pub date: Option<String>,
    /// Exact start time (RFC 3339)
    #[arg(long)]
    pub at: Option<String>,
    /// Duration in seconds
    #[arg(long, default_value_t = 0)]
    pub duration: i64,
    /// Partner name (repeatable)
    #[arg(long = "partner")]
    pub partners: Vec<String>,
    /// Sub-event count
    #[arg(long)]
    pub edges: Option<i64>,
    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Record id
    pub id: String,
    /// New category
    #[arg(long)]
    pub category: Option<String>,
    /// New start time (RFC 3339)
    #[arg(long)]
    pub at: Option<String>,
    /// New duration in seconds
    #[arg(long)]
    pub duration: Option<i64>,
    /// Replace partners (repeatable)
    #[arg(long = "partner")]
    pub partners: Vec<String>,
    /// Remove all partners
    #[arg(long, conflicts_with = "partners")]
    pub clear_partners: bool,
    /// New sub-event count (0 clears it)
    #[arg(long)]
    pub edges: Option<i64>,
    /// New notes (empty clears them)
    #[arg(long)]
    pub notes: Option<String>,
}

impl Command {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Log(_) | Command::Edit(_) | Command::Delete { .. } | Command::Import { .. }
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        habitcal_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = Config::database_path();

    // Single writer: mutating commands hold the lock until exit.
    let _write_guard = if cli.command.mutates() {
        Some(acquire_write_guard(&db_path).context("failed to acquire process lock")?)
    } else {
        None
    };

    let mut store = open_store(&config, &db_path)?;

    match cli.command {
        Command::Log(args) => commands::log(&mut store, args)?,
        Command::Edit(args) => commands::edit(&mut store, args)?,
        Command::Delete { id } => commands::delete(&mut store, &id)?,
        Command::Import { file, year } => commands::import(&mut store, &config, &file, year)?,
        Command::Imports { limit } => commands::imports(&store, limit)?,
        Command::Day { date } => commands::day(&store, &date)?,
        Command::Month { month, json } => commands::month(&store, &month, json)?,
        Command::Hourly { month, json } => commands::hourly(&store, &month, json)?,
        Command::Calendar { year } => commands::calendar(&store, year),
        Command::List { month } => commands::list(&store, month.as_deref())?,
    }

    if let Some(warning) = store.take_persistence_warning() {
        eprintln!("warning: {}", warning);
    }

    Ok(())
}

/// Open the database and load the record set.
fn open_store(config: &Config, db_path: &PathBuf) -> Result<HabitStore<Database>> {
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let options = config.store_options().context("invalid configuration")?;
    let mut store = HabitStore::new(db, options);
    let report = store.load().context("failed to load records")?;

    if report.migrated_records > 0 {
        eprintln!(
            "Migrated {} legacy entries into {} records.",
            report.migrated_entries, report.migrated_records
        );
    }
    if report.unreadable > 0 {
        eprintln!(
            "warning: {} stored entries could not be read and were skipped.",
            report.unreadable
        );
    }

    Ok(store)
}
