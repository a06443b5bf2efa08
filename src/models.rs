use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One scraped search-result card. Field order matches the CSV column order
/// of the listing tables, so `csv` + serde round-trips the files directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub card_id: String,
    pub title: String,
    pub url: String,
    pub price_raw: Option<String>,
    pub price_value: Option<f64>,
    pub price_currency: Option<String>,
    pub location_text: Option<String>,
    pub posted_date_raw: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub time_raw: Option<String>,
    pub district_id: u32,
    pub district_name: String,
}

impl ListingRecord {
    /// A row counts as priced when either the raw price text or the parsed
    /// value survived scraping. The cleaner only drops duplicate rows where
    /// both are missing.
    pub fn has_price(&self) -> bool {
        self.price_raw.is_some() || self.price_value.is_some()
    }
}

/// Secondary attributes scraped from a single ad detail page.
/// At most one row per card_id within a district's detail table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub card_id: String,
    pub area: Option<f64>,
    pub number_rooms: Option<u32>,
    pub furniture: Option<String>,
    pub condition: Option<String>,
    pub date: Option<NaiveDate>,
}
