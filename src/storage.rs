use crate::models::{DetailRecord, ListingRecord};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;

const LISTING_COLUMNS: [&str; 12] = [
    "card_id",
    "title",
    "url",
    "price_raw",
    "price_value",
    "price_currency",
    "location_text",
    "posted_date_raw",
    "posted_date",
    "time_raw",
    "district_id",
    "district_name",
];

const DETAIL_COLUMNS: [&str; 6] = [
    "card_id",
    "area",
    "number_rooms",
    "furniture",
    "condition",
    "date",
];

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Overwrite a district's listing table. A district with no listings still
/// gets a header-only file.
pub fn save_listings(path: &Path, records: &[ListingRecord]) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(LISTING_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_listings(path: &Path) -> Result<Vec<ListingRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open listing file {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: ListingRecord =
            result.with_context(|| format!("Malformed row in {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_details(path: &Path) -> Result<Vec<DetailRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open detail file {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: DetailRecord =
            result.with_context(|| format!("Malformed row in {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

/// Append detail rows, writing the header only when the file is created.
/// Prior rows are never rewritten; interrupted runs lose at most the
/// unflushed buffer.
pub fn append_details(path: &Path, records: &[DetailRecord]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }
    ensure_parent_dir(path)?;
    let write_header = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open detail file {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if write_header {
        writer.write_record(DETAIL_COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(records.len())
}
