//! Subcommand handlers.

use anyhow::{bail, Context, Result};
use chrono::Datelike;
use habitcal_core::{
    parse_day_key, Config, Database, HabitFields, HabitPatch, HabitStore, Period,
};
use std::io::Read;

use crate::render;
use crate::{EditArgs, LogArgs};

pub fn log(store: &mut HabitStore<Database>, args: LogArgs) -> Result<()> {
    let mut fields = match (&args.at, &args.date) {
        (Some(at), _) => HabitFields {
            category: args.category.clone(),
            start_time: Some(at.clone()),
            ..Default::default()
        },
        (None, Some(date)) => {
            let date = parse_day_key(date).context("invalid --date")?;
            HabitFields::at_noon(args.category.clone(), date, store.zone())?
        }
        (None, None) => {
            let today = store.zone().localize(&store.zone().now()).date();
            HabitFields::at_noon(args.category.clone(), today, store.zone())?
        }
    };
    fields.duration_secs = args.duration;
    fields.partners = args.partners;
    fields.sub_events = args.edges;
    fields.notes = args.notes;

    let record = store.create_record(fields).context("failed to log record")?;
    println!("Logged {} {}", record.category.as_str(), record.id);
    Ok(())
}

pub fn edit(store: &mut HabitStore<Database>, args: EditArgs) -> Result<()> {
    let partners = if args.clear_partners {
        Some(Vec::new())
    } else if args.partners.is_empty() {
        None
    } else {
        Some(args.partners)
    };
    let patch = HabitPatch {
        category: args.category,
        start_time: args.at,
        duration_secs: args.duration,
        partners,
        sub_events: args.edges,
        notes: args.notes,
    };
    if patch.is_empty() {
        bail!("nothing to change; pass at least one field");
    }

    let record = store
        .update_record(&args.id, &patch)
        .with_context(|| format!("failed to update record {}", args.id))?;
    println!("Updated {}", record.id);
    Ok(())
}

pub fn delete(store: &mut HabitStore<Database>, id: &str) -> Result<()> {
    let record = store
        .delete_record(id)
        .with_context(|| format!("failed to delete record {}", id))?;
    println!("Deleted {}", record.id);
    Ok(())
}

pub fn import(
    store: &mut HabitStore<Database>,
    config: &Config,
    file: &str,
    year: Option<i32>,
) -> Result<()> {
    let text = if file == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        text
    } else {
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file))?
    };

    let fallback_year = year.or_else(|| {
        config
            .import
            .use_current_year
            .then(|| store.zone().localize(&store.zone().now()).year())
    });

    let result = store
        .import_text(&text, fallback_year)
        .context("import failed")?;

    if let Err(e) = store.storage().record_import(&result) {
        tracing::warn!(error = %e, "Failed to record import history");
    }

    println!("Imported {} records.", result.imported_count());
    if result.skipped_lines > 0 || result.skipped_chunks > 0 {
        println!(
            "Skipped {} lines and {} chunks that could not be read.",
            result.skipped_lines, result.skipped_chunks
        );
    }
    Ok(())
}

pub fn imports(store: &HabitStore<Database>, limit: usize) -> Result<()> {
    let history = store
        .storage()
        .list_imports(limit)
        .context("failed to read import history")?;
    render::imports(&history);
    Ok(())
}

pub fn day(store: &HabitStore<Database>, date: &str) -> Result<()> {
    let date = parse_day_key(date).context("invalid date")?;
    render::day(&store.day_view(date));
    Ok(())
}

pub fn month(store: &HabitStore<Database>, month: &str, json: bool) -> Result<()> {
    let period = Period::from_month_key(month).context("invalid month")?;
    let summary = store.aggregate(&period);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        render::month(&period, &summary);
    }
    Ok(())
}

pub fn hourly(store: &HabitStore<Database>, month: &str, json: bool) -> Result<()> {
    let period = Period::from_month_key(month).context("invalid month")?;
    let sections = store.hourly_breakdown(&period);
    if json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
    } else {
        render::hourly(&period, &sections);
    }
    Ok(())
}

pub fn calendar(store: &HabitStore<Database>, year: i32) {
    render::calendar(year, &store.year_calendar(year));
}

pub fn list(store: &HabitStore<Database>, month: Option<&str>) -> Result<()> {
    match month {
        Some(key) => {
            // Validates the key before the index lookup.
            Period::from_month_key(key).context("invalid month")?;
            render::records(store.month_records(key), store.zone());
        }
        None => render::records(store.records(), store.zone()),
    }
    Ok(())
}
