use crate::models::ListingRecord;
use std::collections::{HashMap, HashSet};

/// Row counts for one cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub input: usize,
    pub removed: usize,
    pub retained: usize,
}

/// Remove low-quality duplicate rows from a district listing table.
///
/// Rows are grouped by card_id. For an id that occurs more than once, every
/// occurrence missing both price fields is dropped; when all occurrences
/// are price-less the first-seen one is kept (deterministic tie-break). A
/// singleton without a price is kept as-is: only duplicate price-less rows
/// are junk from re-scraped pages, a lone price-less row is real data.
/// Input order is preserved.
pub fn clean(records: Vec<ListingRecord>) -> (Vec<ListingRecord>, CleanStats) {
    let input = records.len();

    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut priced: HashMap<String, usize> = HashMap::new();
    for record in &records {
        *occurrences.entry(record.card_id.clone()).or_insert(0) += 1;
        if record.has_price() {
            *priced.entry(record.card_id.clone()).or_insert(0) += 1;
        }
    }

    let mut kept_fallback: HashSet<String> = HashSet::new();
    let mut cleaned = Vec::with_capacity(input);
    for record in records {
        let dupes = occurrences[&record.card_id];
        if dupes == 1 || record.has_price() {
            cleaned.push(record);
            continue;
        }
        // duplicate without a price: keep only if no sibling has one and
        // this is the first occurrence
        let priced_siblings = priced.get(&record.card_id).copied().unwrap_or(0);
        if priced_siblings == 0 && kept_fallback.insert(record.card_id.clone()) {
            cleaned.push(record);
        }
    }

    let stats = CleanStats {
        input,
        removed: input - cleaned.len(),
        retained: cleaned.len(),
    };
    (cleaned, stats)
}
