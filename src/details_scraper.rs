use crate::debug_println;
use crate::fetch::{polite_pause, PageFetcher};
use crate::models::{DetailRecord, ListingRecord};
use crate::parser;
use crate::pipeline::PipelineOptions;
use crate::storage;
use anyhow::Result;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::Path;

/// Per-district outcome of one detail-scraping run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailStats {
    pub total: usize,
    pub skipped: usize,
    pub fetched: usize,
    pub failed: usize,
    pub appended: usize,
}

/// Scrape detail pages for every card of a cleaned district table that is
/// not yet present in the district's detail file.
///
/// The covered id-set is computed once from the existing detail file, so a
/// restarted run skips straight past finished cards. Records are buffered
/// and appended every `save_interval` rows and once more at the end; an
/// interruption loses at most one unflushed buffer. A failed card is logged
/// and left uncovered, so the next run picks it up again.
pub fn fetch_district_details<F: PageFetcher>(
    fetcher: &F,
    listings: &[ListingRecord],
    detail_path: &Path,
    options: &PipelineOptions,
) -> Result<DetailStats> {
    let mut covered: HashSet<String> = if detail_path.exists() {
        storage::load_details(detail_path)?
            .into_iter()
            .map(|d| d.card_id)
            .collect()
    } else {
        HashSet::new()
    };

    let mut stats = DetailStats {
        total: listings.len(),
        ..DetailStats::default()
    };
    println!(
        "Found {} cards to process ({} already covered)",
        stats.total,
        covered.len()
    );

    let mut pending: Vec<DetailRecord> = Vec::new();
    for (idx, row) in listings.iter().enumerate() {
        if covered.contains(&row.card_id) {
            stats.skipped += 1;
            continue;
        }

        debug_println!("[{}/{}] Card {}", idx + 1, stats.total, row.card_id);
        match fetcher.fetch(&row.url) {
            Ok(html) => {
                pending.push(parse_detail_page(&html, &row.card_id));
                // covers duplicate ids later in the same cleaned file too
                covered.insert(row.card_id.clone());
                stats.fetched += 1;
            }
            Err(e) => {
                eprintln!("  Failed card {}: {}", row.card_id, e);
                stats.failed += 1;
            }
        }

        if pending.len() >= options.save_interval {
            stats.appended += storage::append_details(detail_path, &pending)?;
            pending.clear();
            debug_println!("  Progress saved ({} rows so far)", stats.appended);
        }

        if idx + 1 < stats.total {
            polite_pause(options.min_delay, options.max_delay);
        }
    }

    stats.appended += storage::append_details(detail_path, &pending)?;
    Ok(stats)
}

/// Pull the secondary attributes out of an ad detail page. Absent fields
/// stay null; the record itself is always produced for a fetched page.
pub fn parse_detail_page(html: &str, card_id: &str) -> DetailRecord {
    let document = Html::parse_document(html);
    let mut record = DetailRecord {
        card_id: card_id.to_string(),
        area: None,
        number_rooms: None,
        furniture: None,
        condition: None,
        date: None,
    };

    let container_selector = Selector::parse("div[data-testid='ad-parameters-container']").unwrap();
    let p_selector = Selector::parse("p").unwrap();
    if let Some(container) = document.select(&container_selector).next() {
        for p in container.select(&p_selector) {
            let text = p.text().collect::<Vec<_>>().join(" ").trim().to_string();
            if let Some(value) = text.strip_prefix("Количество комнат") {
                record.number_rooms = parser::parse_rooms(strip_label(value));
            } else if let Some(value) = text.strip_prefix("Общая площадь") {
                record.area = parser::parse_area(strip_label(value));
            } else if let Some(value) = text.strip_prefix("Меблирована") {
                record.furniture =
                    Some(strip_label(value).to_string()).filter(|v| !v.is_empty());
            } else if let Some(value) = text.strip_prefix("Ремонт") {
                record.condition =
                    Some(strip_label(value).to_string()).filter(|v| !v.is_empty());
            }
        }
    }

    let date_selector = Selector::parse("span[data-testid='ad-posted-at']").unwrap();
    if let Some(el) = document.select(&date_selector).next() {
        let text = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
        record.date = parser::parse_posted_at(&text);
    }

    record
}

fn strip_label(value: &str) -> &str {
    value.trim_start().trim_start_matches(':').trim()
}
