//! # habitcal-core
//!
//! Core library for habitcal - a personal habit calendar.
//!
//! This library provides:
//! - The canonical record schema and its validation
//! - One-way migration of legacy date-keyed entries
//! - A lenient parser for pasted import text
//! - Derived day/month indices and the aggregation engine behind summaries
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! ```text
//! import text ──► ingest ──┐
//!                          ▼
//! user action ──────► HabitStore ──► DerivedIndex ──► analytics
//!                          │
//!                          ▼
//!                    EntryStorage (SQLite)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use habitcal_core::{Config, Database, HabitStore};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let mut store = HabitStore::new(db, config.store_options().expect("invalid config"));
//! store.load().expect("failed to load records");
//!
//! let summary = store.aggregate_month("2024-07").expect("bad month");
//! println!("{} records in July", summary.grand_total.total);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{Aggregation, CategoryStats, Period};
pub use config::Config;
pub use db::{Database, EntryStorage, MemoryStorage};
pub use error::{Error, Result};
pub use index::DerivedIndex;
pub use ingest::{parse_import, ImportOptions, ImportResult};
pub use store::{ChangeEvent, HabitStore, LoadReport, StoreOptions};
pub use types::*;
pub use zone::Zone;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod index;
pub mod ingest;
pub mod legacy;
pub mod logging;
pub mod store;
pub mod types;
pub mod zone;
