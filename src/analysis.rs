use crate::models::{DetailRecord, ListingRecord};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Approximate street rate used to bring dollar-quoted rents onto one
/// scale. Listing prices on OLX are either UZS ("сум") or USD ("у.е.").
pub const USD_TO_UZS: f64 = 13933.0;

/// One listing joined with its detail row, reduced to the fields the
/// price statistics need. Only rows with a positive price per square
/// meter make it in here.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedListing {
    pub card_id: String,
    pub district_name: String,
    pub condition: String,
    pub price_uzs: f64,
    pub area: f64,
    pub price_per_sq_meter: f64,
}

/// Mean price per square meter for one group (a district or a renovation
/// condition), serialized into the report tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub group: String,
    pub listings: usize,
    pub avg_price_per_sq_meter: f64,
}

/// Aggregated view over every joined row of the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    pub rows: usize,
    pub mean_price_per_sq_meter: f64,
    pub median_price_per_sq_meter: f64,
    /// Sorted by average, most expensive first.
    pub by_district: Vec<GroupAverage>,
    pub by_condition: Vec<GroupAverage>,
}

fn price_in_uzs(value: f64, currency: Option<&str>) -> f64 {
    match currency {
        Some("сум") => value,
        _ => value * USD_TO_UZS,
    }
}

/// Inner-join a district's cleaned listings with its detail rows on
/// `card_id` and derive the price per square meter. Rows without a price,
/// without an area, or with a non-positive ratio are dropped; a missing
/// renovation condition becomes "Not Specified".
pub fn join_district(listings: &[ListingRecord], details: &[DetailRecord]) -> Vec<PricedListing> {
    let by_id: HashMap<&str, &DetailRecord> =
        details.iter().map(|d| (d.card_id.as_str(), d)).collect();

    let mut rows = Vec::new();
    for listing in listings {
        let Some(detail) = by_id.get(listing.card_id.as_str()) else {
            continue;
        };
        let (Some(value), Some(area)) = (listing.price_value, detail.area) else {
            continue;
        };
        let price_uzs = price_in_uzs(value, listing.price_currency.as_deref());
        if area <= 0.0 {
            continue;
        }
        let price_per_sq_meter = price_uzs / area;
        if price_per_sq_meter <= 0.0 {
            continue;
        }
        rows.push(PricedListing {
            card_id: listing.card_id.clone(),
            district_name: listing.district_name.clone(),
            condition: detail
                .condition
                .clone()
                .unwrap_or_else(|| "Not Specified".to_string()),
            price_uzs,
            area,
            price_per_sq_meter,
        });
    }
    rows
}

fn group_averages(rows: &[PricedListing], key: fn(&PricedListing) -> &str) -> Vec<GroupAverage> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for row in rows {
        let entry = sums.entry(key(row)).or_insert((0.0, 0));
        entry.0 += row.price_per_sq_meter;
        entry.1 += 1;
    }
    let mut averages: Vec<GroupAverage> = sums
        .into_iter()
        .map(|(group, (sum, count))| GroupAverage {
            group: group.to_string(),
            listings: count,
            avg_price_per_sq_meter: sum / count as f64,
        })
        .collect();
    averages.sort_by(|a, b| {
        b.avg_price_per_sq_meter
            .total_cmp(&a.avg_price_per_sq_meter)
            .then_with(|| a.group.cmp(&b.group))
    });
    averages
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Summarize every joined row of the run: overall mean and median plus the
/// per-district and per-condition averages.
pub fn analyze(rows: &[PricedListing]) -> AnalysisReport {
    if rows.is_empty() {
        return AnalysisReport::default();
    }

    let mut values: Vec<f64> = rows.iter().map(|r| r.price_per_sq_meter).collect();
    values.sort_by(f64::total_cmp);
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    AnalysisReport {
        rows: rows.len(),
        mean_price_per_sq_meter: mean,
        median_price_per_sq_meter: median(&values),
        by_district: group_averages(rows, |r| &r.district_name),
        by_condition: group_averages(rows, |r| &r.condition),
    }
}

/// Overwrite one report table, e.g. `analysis/price_by_district.csv`.
pub fn save_averages(path: &Path, averages: &[GroupAverage]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    for row in averages {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(card_id: &str, district: &str, value: Option<f64>, currency: Option<&str>) -> ListingRecord {
        ListingRecord {
            card_id: card_id.to_string(),
            title: "Квартира".to_string(),
            url: format!("https://www.olx.uz/d/obyavlenie/-ID{}.html", card_id),
            price_raw: value.map(|v| format!("{} {}", v, currency.unwrap_or(""))),
            price_value: value,
            price_currency: currency.map(str::to_string),
            location_text: None,
            posted_date_raw: None,
            posted_date: None,
            time_raw: None,
            district_id: 26,
            district_name: district.to_string(),
        }
    }

    fn detail(card_id: &str, area: Option<f64>, condition: Option<&str>) -> DetailRecord {
        DetailRecord {
            card_id: card_id.to_string(),
            area,
            number_rooms: Some(2),
            furniture: Some("Да".to_string()),
            condition: condition.map(str::to_string),
            date: None,
        }
    }

    #[test]
    fn sum_prices_stay_usd_prices_convert() {
        let listings = vec![
            listing("a1", "yakkasarai", Some(5_000_000.0), Some("сум")),
            listing("b2", "yakkasarai", Some(400.0), Some("у.е.")),
        ];
        let details = vec![detail("a1", Some(50.0), None), detail("b2", Some(40.0), None)];

        let rows = join_district(&listings, &details);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].price_uzs, 5_000_000.0);
        assert_eq!(rows[1].price_uzs, 400.0 * USD_TO_UZS);
        assert_eq!(rows[0].price_per_sq_meter, 100_000.0);
    }

    #[test]
    fn join_drops_unmatched_priceless_and_arealess_rows() {
        let listings = vec![
            listing("a1", "yakkasarai", Some(5_000_000.0), Some("сум")),
            listing("b2", "yakkasarai", None, None),
            listing("c3", "yakkasarai", Some(300.0), Some("у.е.")),
            listing("d4", "yakkasarai", Some(300.0), Some("у.е.")),
        ];
        // b2 has no price, c3 has no area, d4 has no detail row at all
        let details = vec![
            detail("a1", Some(50.0), Some("Евроремонт")),
            detail("b2", Some(60.0), None),
            detail("c3", None, None),
        ];

        let rows = join_district(&listings, &details);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].card_id, "a1");
        assert_eq!(rows[0].condition, "Евроремонт");
    }

    #[test]
    fn missing_condition_becomes_not_specified() {
        let listings = vec![listing("a1", "yakkasarai", Some(100.0), Some("у.е."))];
        let details = vec![detail("a1", Some(25.0), None)];
        let rows = join_district(&listings, &details);
        assert_eq!(rows[0].condition, "Not Specified");
    }

    #[test]
    fn zero_area_row_is_dropped() {
        let listings = vec![listing("a1", "yakkasarai", Some(100.0), Some("сум"))];
        let details = vec![detail("a1", Some(0.0), None)];
        assert!(join_district(&listings, &details).is_empty());
    }

    #[test]
    fn report_groups_by_district_and_condition() {
        let listings = vec![
            listing("a1", "yakkasarai", Some(6_000_000.0), Some("сум")),
            listing("b2", "yakkasarai", Some(4_000_000.0), Some("сум")),
            listing("c3", "chilonzor", Some(2_000_000.0), Some("сум")),
        ];
        let details = vec![
            detail("a1", Some(50.0), Some("Евроремонт")),
            detail("b2", Some(50.0), Some("Евроремонт")),
            detail("c3", Some(50.0), None),
        ];

        let report = analyze(&join_district(&listings, &details));
        assert_eq!(report.rows, 3);
        // per-m² prices are 120k, 80k, 40k
        assert_eq!(report.mean_price_per_sq_meter, 80_000.0);
        assert_eq!(report.median_price_per_sq_meter, 80_000.0);

        assert_eq!(report.by_district.len(), 2);
        assert_eq!(report.by_district[0].group, "yakkasarai");
        assert_eq!(report.by_district[0].listings, 2);
        assert_eq!(report.by_district[0].avg_price_per_sq_meter, 100_000.0);
        assert_eq!(report.by_district[1].group, "chilonzor");

        assert_eq!(report.by_condition.len(), 2);
        assert_eq!(report.by_condition[0].group, "Евроремонт");
        assert_eq!(report.by_condition[1].group, "Not Specified");
        assert_eq!(report.by_condition[1].avg_price_per_sq_meter, 40_000.0);
    }

    #[test]
    fn median_of_even_row_count_averages_the_middle_pair() {
        let listings = vec![
            listing("a1", "yakkasarai", Some(1_000_000.0), Some("сум")),
            listing("b2", "yakkasarai", Some(2_000_000.0), Some("сум")),
            listing("c3", "yakkasarai", Some(3_000_000.0), Some("сум")),
            listing("d4", "yakkasarai", Some(8_000_000.0), Some("сум")),
        ];
        let details = vec![
            detail("a1", Some(10.0), None),
            detail("b2", Some(10.0), None),
            detail("c3", Some(10.0), None),
            detail("d4", Some(10.0), None),
        ];
        let report = analyze(&join_district(&listings, &details));
        assert_eq!(report.median_price_per_sq_meter, 250_000.0);
        assert_eq!(report.mean_price_per_sq_meter, 350_000.0);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = analyze(&[]);
        assert_eq!(report.rows, 0);
        assert!(report.by_district.is_empty());
        assert!(report.by_condition.is_empty());
    }

    #[test]
    fn averages_table_round_trips_through_csv() {
        let mut path = std::env::temp_dir();
        path.push("tashrent_analysis_averages.csv");
        let _ = std::fs::remove_file(&path);

        let averages = vec![GroupAverage {
            group: "yakkasarai".to_string(),
            listings: 2,
            avg_price_per_sq_meter: 100_000.0,
        }];
        save_averages(&path, &averages).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("group,listings,avg_price_per_sq_meter"));
        assert!(content.contains("yakkasarai,2,100000"));
        let _ = std::fs::remove_file(&path);
    }
}
