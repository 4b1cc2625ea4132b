//! Integration tests for the habitcal store, import pipeline and migration
//!
//! These tests drive the public API against an in-memory SQLite database and
//! use fixture files in `tests/fixtures/`.

use habitcal_core::analytics::{aggregate, Period};
use habitcal_core::db::Database;
use habitcal_core::{
    Category, DerivedIndex, HabitFields, HabitPatch, HabitStore, LoggedHabit, StoreOptions,
    TimeOfDay, Zone,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Get the path to a fixture file
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn options() -> StoreOptions {
    StoreOptions {
        zone: Zone::Utc,
        ..Default::default()
    }
}

fn open_store() -> HabitStore<Database> {
    habitcal_core::logging::init_test();
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    let mut store = HabitStore::new(db, options());
    store.load().unwrap();
    store
}

fn seeded_store(payload: &str) -> HabitStore<Database> {
    habitcal_core::logging::init_test();
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    db.put_value("habit-cal-entries", payload).unwrap();
    HabitStore::new(db, options())
}

// ============================================
// Startup and migration
// ============================================

#[test]
fn test_load_mixed_generations() {
    let payload = std::fs::read_to_string(fixture_path("legacy-mixed.json")).unwrap();
    let mut store = seeded_store(&payload);
    let report = store.load().unwrap();

    // 1 + 1 + 2 + 2 + 3 FL + 2 SOCIAL from legacy entries
    assert_eq!(report.migrated_records, 11);
    assert_eq!(report.migrated_entries, 5);
    assert_eq!(report.empty_legacy, 1);
    assert_eq!(report.skipped_legacy, 1);
    assert_eq!(report.unreadable, 1);
    assert_eq!(report.truncated_secs, 1);
    assert!(report.rewritten);
    assert_eq!(store.len(), 14);

    assert_eq!(
        store.day_categories("2024-05-05"),
        BTreeSet::from([Category::Fl, Category::Social])
    );

    let may = store.aggregate_month("2024-05").unwrap();
    assert_eq!(may.category(Category::Bob).total, 5);
    assert_eq!(may.category(Category::Fl).total_duration_secs, 99);
    assert_eq!(may.partners.get("Alice"), Some(&2));
    assert_eq!(may.partners.get("Bob"), Some(&2));
}

#[test]
fn test_corrupt_start_time_survives_reload() {
    let payload = std::fs::read_to_string(fixture_path("legacy-mixed.json")).unwrap();
    let mut store = seeded_store(&payload);
    store.load().unwrap();

    let corrupt = store.get("c-3").cloned().unwrap();
    assert_eq!(corrupt.start_time, "definitely not a time");
    assert_eq!(store.index().excluded(), 1);

    // Written back verbatim alongside the migrated records.
    let raw = store
        .storage()
        .get_value("habit-cal-entries")
        .unwrap()
        .unwrap();
    let persisted: Vec<LoggedHabit> = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted.len(), 14);
    assert!(persisted.contains(&corrupt));

    let july = store.aggregate_month("2024-07").unwrap();
    assert_eq!(july.grand_total.total, 2);
}

#[test]
fn test_migration_conserves_counts_and_duration() {
    let payload = r#"[{"date":"2024-03-10","habits":{
        "BOB":{"dawn":{"count":3,"duration":1000},"afternoon":{"count":4,"duration":7}},
        "FL":{"night":{"count":1,"duration":59}}}}]"#;
    let mut store = seeded_store(payload);
    let report = store.load().unwrap();

    let bob: Vec<&LoggedHabit> = store
        .records()
        .iter()
        .filter(|r| r.category == Category::Bob)
        .collect();
    assert_eq!(bob.len(), 7);

    let total: u64 = store.records().iter().map(|r| r.duration_secs).sum();
    assert_eq!(total + report.truncated_secs, 1066);
    // One truncation remainder per bucket, each below the bucket's count.
    assert!(report.truncated_secs < 3 + 4 + 1);
}

// ============================================
// Import
// ============================================

#[test]
fn test_import_fixture() {
    let text = std::fs::read_to_string(fixture_path("import-sample.txt")).unwrap();
    let mut store = open_store();
    let result = store.import_text(&text, None).unwrap();

    // BOB + 3 FL + default BOB + SOCIAL + BOB + FL
    assert_eq!(result.imported_count(), 8);
    assert_eq!(result.skipped_lines, 1);
    assert_eq!(result.skipped_chunks, 1);

    let social = store
        .records()
        .iter()
        .find(|r| r.category == Category::Social)
        .unwrap();
    assert_eq!(
        social.partners,
        Some(vec!["Alice".to_string(), "Carol".to_string()])
    );
    assert_eq!(social.notes.as_deref(), Some("dinner"));

    let edged: Vec<_> = store
        .records()
        .iter()
        .filter(|r| r.sub_events.is_some())
        .collect();
    assert_eq!(edged.len(), 1);
    assert_eq!(edged[0].sub_events, Some(2));
}

#[test]
fn test_documented_import_scenario() {
    let mut store = open_store();
    store
        .import_text("2024\n01/07 BOB morning\n03/07 FL x2\n05/07 Alice night", None)
        .unwrap();

    let day = |d: &str| store.day_categories(d);
    assert_eq!(day("2024-07-01"), BTreeSet::from([Category::Bob]));
    assert_eq!(day("2024-07-03"), BTreeSet::from([Category::Fl]));
    assert_eq!(day("2024-07-05"), BTreeSet::from([Category::Social]));

    let july = store.aggregate_month("2024-07").unwrap();
    assert_eq!(july.category(Category::Fl).total, 2);
    assert_eq!(
        july.category(Category::Bob).bucket(TimeOfDay::Morning).count,
        1
    );
    assert_eq!(
        july.category(Category::Social).bucket(TimeOfDay::Night).count,
        1
    );
    assert_eq!(july.partners_ranked(), vec![("Alice", 1)]);
}

#[test]
fn test_import_twice_doubles() {
    let text = std::fs::read_to_string(fixture_path("import-sample.txt")).unwrap();
    let mut store = open_store();
    let first = store.import_text(&text, None).unwrap().imported_count();
    store.import_text(&text, None).unwrap();
    assert_eq!(store.len(), 2 * first);
}

#[test]
fn test_malformed_line_among_valid_ones() {
    let mut store = open_store();
    let result = store
        .import_text("2024\n01/07 BOB\n02/07 FL\n99/99 x\n04/07 BOB\n05/07 FL", None)
        .unwrap();
    assert_eq!(result.imported_count(), 4);
}

#[test]
fn test_import_history_is_recorded() {
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    let mut store = HabitStore::new(&db, options());
    store.load().unwrap();

    let result = store.import_text("2024\n01/07", None).unwrap();
    db.record_import(&result).unwrap();

    let history = db.list_imports(5).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].imported, 1);
}

// ============================================
// Store round trip through SQLite
// ============================================

#[test]
fn test_mutations_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.db");

    let id = {
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        let mut store = HabitStore::new(db, options());
        store.load().unwrap();

        let record = store
            .create_record(HabitFields {
                category: "SOCIAL".into(),
                start_time: Some("2024-07-05T21:00:00Z".into()),
                duration_secs: 0,
                partners: vec!["Alice".into()],
                sub_events: Some(0),
                notes: None,
            })
            .unwrap();
        store
            .update_record(
                &record.id,
                &HabitPatch {
                    notes: Some("late dinner".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        record.id
    };

    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    let mut store = HabitStore::new(db, options());
    let report = store.load().unwrap();
    assert_eq!(report.records, 1);

    let record = store.get(&id).unwrap();
    assert_eq!(record.notes.as_deref(), Some("late dinner"));
    assert_eq!(record.sub_events, None);

    // Zero duration formats and aggregates as zero.
    let july = store.aggregate_month("2024-07").unwrap();
    assert_eq!(july.grand_total.total_duration_secs, 0);
    assert_eq!(habitcal_core::format::format_duration(record.duration_secs), "0s");
}

// ============================================
// Property checks (seeded, reproducible)
// ============================================

fn random_records(rng: &mut StdRng, n: usize) -> Vec<LoggedHabit> {
    (0..n)
        .map(|i| {
            let category = Category::ALL[rng.gen_range(0..3)];
            let start_time = if rng.gen_ratio(1, 20) {
                "corrupt".to_string()
            } else {
                format!(
                    "2024-{:02}-{:02}T{:02}:{:02}:00Z",
                    rng.gen_range(6..=8),
                    rng.gen_range(1..=28),
                    rng.gen_range(0..24),
                    rng.gen_range(0..60)
                )
            };
            LoggedHabit {
                id: format!("r{}", i),
                category,
                start_time,
                duration_secs: rng.gen_range(0..4000),
                partners: category
                    .is_social()
                    .then(|| vec!["Alice".to_string(), "Bob".to_string()]),
                sub_events: rng.gen_bool(0.3).then(|| rng.gen_range(1..5)),
                notes: None,
            }
        })
        .collect()
}

#[test]
fn test_index_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..50 {
        let n = rng.gen_range(0..200);
        let records = random_records(&mut rng, n);
        let index = DerivedIndex::build(&records, &Zone::Utc);

        let mut expected: BTreeMap<String, BTreeSet<Category>> = BTreeMap::new();
        for r in &records {
            if let Some(day) = r.day_key(&Zone::Utc) {
                expected.entry(day).or_default().insert(r.category);
            }
        }

        let actual: BTreeMap<String, BTreeSet<Category>> = index
            .days()
            .map(|(d, c)| (d.to_string(), c.clone()))
            .collect();
        assert_eq!(actual, expected);

        for (day, categories) in &expected {
            assert_eq!(&index.day_categories(day), categories);
        }
    }
}

#[test]
fn test_index_tracks_random_mutations() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut store = open_store();

    for step in 0..150 {
        let roll = rng.gen_range(0..10);
        if roll < 6 || store.is_empty() {
            let category = Category::ALL[rng.gen_range(0..3)];
            let start = format!(
                "2024-07-{:02}T{:02}:00:00Z",
                rng.gen_range(1..=5),
                rng.gen_range(0..24)
            );
            store
                .create_record(HabitFields {
                    category: category.to_string(),
                    start_time: Some(start),
                    ..Default::default()
                })
                .unwrap();
        } else if roll < 8 {
            let id = store.records()[rng.gen_range(0..store.len())].id.clone();
            let patch = HabitPatch {
                category: Some(Category::ALL[rng.gen_range(0..3)].to_string()),
                ..Default::default()
            };
            store.update_record(&id, &patch).unwrap();
        } else {
            let id = store.records()[rng.gen_range(0..store.len())].id.clone();
            store.delete_record(&id).unwrap();
        }

        for d in 1..=5 {
            let day = format!("2024-07-{:02}", d);
            let expected: BTreeSet<Category> = store
                .records()
                .iter()
                .filter(|r| r.day_key(&Zone::Utc).as_deref() == Some(day.as_str()))
                .map(|r| r.category)
                .collect();
            assert_eq!(store.day_categories(&day), expected, "step {}", step);
        }
    }
}

#[test]
fn test_aggregation_is_additive() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..50 {
        let n = rng.gen_range(0..150);
        let records = random_records(&mut rng, n);
        for month in 6..=8 {
            let agg = aggregate(&records, &Period::Month(2024, month), &Zone::Utc);

            let sum: u64 = Category::ALL.iter().map(|c| agg.category(*c).total).sum();
            assert_eq!(agg.grand_total.total, sum);

            let duration: u64 = Category::ALL
                .iter()
                .map(|c| agg.category(*c).total_duration_secs)
                .sum();
            assert_eq!(agg.grand_total.total_duration_secs, duration);

            let by_time: u64 = agg.grand_total.by_time.values().map(|b| b.count).sum();
            assert_eq!(by_time, agg.grand_total.total);
        }
    }
}
