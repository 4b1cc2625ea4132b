//! The in-process record store
//!
//! [`HabitStore`] exclusively owns the record set. Every mutation:
//!
//! 1. changes the in-memory records
//! 2. rebuilds the [`DerivedIndex`] from scratch
//! 3. writes the full record array to [`EntryStorage`]
//! 4. notifies subscribers
//!
//! A failed write in step 3 is logged and kept as a pending warning; the
//! in-memory change stands.

use crate::analytics::{self, Aggregation, DayView, Period, SectionBreakdown};
use crate::db::EntryStorage;
use crate::error::{Error, Result};
use crate::index::DerivedIndex;
use crate::ingest::{self, ImportOptions, ImportResult};
use crate::legacy::{self, MigrateOptions};
use crate::types::{
    canonical_month_key, new_record_id, Category, HabitFields, HabitPatch, LoggedHabit, TimeOfDay,
};
use crate::zone::Zone;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "habit-cal-entries";

/// Settings the store needs from configuration.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Storage slot holding the record array
    pub key: String,
    /// Zone for calendar keys, buckets and synthesized times
    pub zone: Zone,
    /// Bucket for import chunks with no time information
    pub default_time_of_day: TimeOfDay,
    /// Hour standing in for `not-sure`
    pub unsure_hour: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_string(),
            zone: Zone::Local,
            default_time_of_day: TimeOfDay::Morning,
            unsure_hour: 12,
        }
    }
}

impl StoreOptions {
    fn import_options(&self) -> ImportOptions {
        ImportOptions {
            zone: self.zone,
            default_time_of_day: self.default_time_of_day,
            unsure_hour: self.unsure_hour,
        }
    }

    fn migrate_options(&self) -> MigrateOptions {
        MigrateOptions {
            zone: self.zone,
            unsure_hour: self.unsure_hour,
        }
    }
}

/// What [`HabitStore::load`] found in storage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Records in the store after loading
    pub records: usize,
    /// Records synthesized from legacy entries
    pub migrated_records: usize,
    /// Legacy entries that produced records
    pub migrated_entries: usize,
    /// Legacy entries with an unparseable date
    pub skipped_legacy: usize,
    /// Legacy entries with nothing counted
    pub empty_legacy: usize,
    /// Seconds lost splitting legacy bucket durations
    pub truncated_secs: u64,
    /// Stored elements matching no known shape
    pub unreadable: usize,
    /// Records dropped because their id was already taken
    pub duplicate_ids: usize,
    /// Whether the canonical array was written back
    pub rewritten: bool,
}

/// A completed mutation, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Loaded { records: usize },
    Created { id: String },
    Updated { id: String },
    Deleted { id: String },
    Imported { records: usize },
}

type Listener = Box<dyn Fn(&ChangeEvent) + Send>;

/// Single owner of the record set and its derived indices.
pub struct HabitStore<S: EntryStorage> {
    storage: S,
    options: StoreOptions,
    records: Vec<LoggedHabit>,
    index: DerivedIndex,
    listeners: Vec<Listener>,
    pending_warning: Option<String>,
    write_failures: usize,
}

impl<S: EntryStorage> HabitStore<S> {
    /// Create an empty store. Nothing is read until [`HabitStore::load`].
    pub fn new(storage: S, options: StoreOptions) -> Self {
        Self {
            storage,
            options,
            records: Vec::new(),
            index: DerivedIndex::default(),
            listeners: Vec::new(),
            pending_warning: None,
            write_failures: 0,
        }
    }

    /// Read the stored payload, migrating legacy shapes once.
    ///
    /// A payload that is not JSON at all is an error; the store stays empty
    /// and nothing is overwritten.
    pub fn load(&mut self) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        let Some(raw) = self.storage.read(&self.options.key)? else {
            tracing::info!(key = %self.options.key, "No stored records; starting empty");
            self.replace_records(Vec::new());
            self.notify(ChangeEvent::Loaded { records: 0 });
            return Ok(report);
        };

        let decoded = legacy::decode_payload(&raw)?;
        report.unreadable = decoded.unreadable;
        let needs_migration = decoded.needs_migration();

        let mut records = decoded.records;
        if needs_migration {
            let migration = legacy::migrate(&decoded.legacy, &self.options.migrate_options());
            report.migrated_records = migration.records.len();
            report.migrated_entries = migration.entries_migrated;
            report.skipped_legacy = migration.entries_skipped;
            report.empty_legacy = migration.entries_empty;
            report.truncated_secs = migration.truncated_secs;
            records.extend(migration.records);
        }

        let before = records.len();
        let mut seen = HashSet::new();
        records.retain(|r| {
            let fresh = seen.insert(r.id.clone());
            if !fresh {
                tracing::warn!(id = %r.id, "Dropping stored record with duplicate id");
            }
            fresh
        });
        report.duplicate_ids = before - records.len();
        report.records = records.len();

        self.replace_records(records);

        if needs_migration {
            let failures = self.write_failures;
            self.persist();
            report.rewritten = self.write_failures == failures;
        }

        tracing::info!(
            records = report.records,
            migrated = report.migrated_records,
            unreadable = report.unreadable,
            "Loaded record store"
        );
        self.notify(ChangeEvent::Loaded {
            records: report.records,
        });

        Ok(report)
    }

    // ============================================
    // Mutations
    // ============================================

    /// Validate `fields` and add a new record.
    pub fn create_record(&mut self, fields: HabitFields) -> Result<LoggedHabit> {
        let record = fields.into_record(new_record_id())?;
        tracing::debug!(id = %record.id, category = %record.category, "Creating record");

        self.records.push(record.clone());
        self.after_mutation(ChangeEvent::Created {
            id: record.id.clone(),
        });
        Ok(record)
    }

    /// Replace fields of an existing record.
    pub fn update_record(&mut self, id: &str, patch: &HabitPatch) -> Result<LoggedHabit> {
        let position = self.position(id)?;
        let updated = patch.apply(&self.records[position])?;
        self.records[position] = updated.clone();

        self.after_mutation(ChangeEvent::Updated { id: id.to_string() });
        Ok(updated)
    }

    /// Remove a record by id.
    pub fn delete_record(&mut self, id: &str) -> Result<LoggedHabit> {
        let position = self.position(id)?;
        let removed = self.records.remove(position);

        self.after_mutation(ChangeEvent::Deleted { id: id.to_string() });
        Ok(removed)
    }

    /// Parse import text and append every record it yields.
    ///
    /// There is no deduplication: importing the same text twice doubles it.
    pub fn import_text(&mut self, raw: &str, fallback_year: Option<i32>) -> Result<ImportResult> {
        let result = ingest::parse_import(raw, fallback_year, &self.options.import_options())?;
        let imported = result.imported_count();

        if imported > 0 {
            self.records.extend(result.records.iter().cloned());
            self.after_mutation(ChangeEvent::Imported { records: imported });
        }

        Ok(result)
    }

    // ============================================
    // Queries
    // ============================================

    /// Every record, including those with unparseable start times.
    pub fn records(&self) -> &[LoggedHabit] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&LoggedHabit> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The backing storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn zone(&self) -> &Zone {
        &self.options.zone
    }

    pub fn index(&self) -> &DerivedIndex {
        &self.index
    }

    /// Categories logged on `day_key` (`YYYY-MM-DD`).
    pub fn day_categories(&self, day_key: &str) -> BTreeSet<Category> {
        self.index.day_categories(day_key)
    }

    /// Records starting in `month_key` (`YYYY-MM`), in no particular order.
    ///
    /// An invalid key matches no records.
    pub fn month_records(&self, month_key: &str) -> &[LoggedHabit] {
        match canonical_month_key(month_key) {
            Ok(key) => self.index.month_records(&key),
            Err(_) => &[],
        }
    }

    /// Statistics for one `YYYY-MM` month.
    pub fn aggregate_month(&self, month_key: &str) -> Result<Aggregation> {
        let key = canonical_month_key(month_key)?;
        let period = Period::from_month_key(&key)?;
        Ok(analytics::aggregate(
            self.index.month_records(&key),
            &period,
            &self.options.zone,
        ))
    }

    /// Statistics for any period.
    pub fn aggregate(&self, period: &Period) -> Aggregation {
        analytics::aggregate(&self.records, period, &self.options.zone)
    }

    /// Records of one day, grouped by time of day.
    pub fn day_view(&self, date: NaiveDate) -> DayView {
        analytics::day_view(&self.records, date, &self.options.zone)
    }

    /// Per time-of-day breakdown for a period.
    pub fn hourly_breakdown(&self, period: &Period) -> BTreeMap<TimeOfDay, SectionBreakdown> {
        analytics::hourly_breakdown(&self.records, period, &self.options.zone)
    }

    /// Day → categories for one year.
    pub fn year_calendar(&self, year: i32) -> BTreeMap<String, BTreeSet<Category>> {
        analytics::year_calendar(&self.index, year)
    }

    // ============================================
    // Notifications
    // ============================================

    /// Call `listener` after every completed mutation.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&ChangeEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// The most recent persistence failure not yet shown to the user.
    pub fn take_persistence_warning(&mut self) -> Option<String> {
        self.pending_warning.take()
    }

    /// Writes that have failed since the store was created.
    pub fn write_failures(&self) -> usize {
        self.write_failures
    }

    // ============================================
    // Internals
    // ============================================

    fn position(&self, id: &str) -> Result<usize> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn replace_records(&mut self, records: Vec<LoggedHabit>) {
        self.records = records;
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index = DerivedIndex::build(&self.records, &self.options.zone);
    }

    fn after_mutation(&mut self, event: ChangeEvent) {
        self.rebuild_index();
        self.persist();
        self.notify(event);
    }

    fn persist(&mut self) {
        let outcome = serde_json::to_string(&self.records)
            .map_err(Error::from)
            .and_then(|payload| self.storage.write(&self.options.key, &payload));

        if let Err(e) = outcome {
            tracing::warn!(error = %e, key = %self.options.key, "Failed to persist records");
            self.write_failures += 1;
            self.pending_warning = Some(format!("changes were not saved: {}", e));
        }
    }

    fn notify(&self, event: ChangeEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }
}
