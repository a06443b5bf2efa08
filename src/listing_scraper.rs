use crate::debug_println;
use crate::districts::District;
use crate::fetch::{polite_pause, PageFetcher};
use crate::models::ListingRecord;
use crate::parser;
use crate::pipeline::PipelineOptions;
use scraper::{ElementRef, Html, Selector};

const BASE_URL: &str = "https://www.olx.uz";

/// Search URL for one district result page. The long-term rental feed is
/// filtered by district id; the bracketed query key is percent-encoded.
pub fn district_page_url(district: District, page: usize) -> String {
    format!(
        "{}/nedvizhimost/kvartiry/arenda-dolgosrochnaya/tashkent/?currency=UZS&{}={}&page={}",
        BASE_URL,
        urlencoding::encode("search[district_id]"),
        district.id,
        page
    )
}

/// Crawl the paginated search results of a single district.
///
/// Pages are fetched in order up to `max_pages`. A page that fetches fine
/// but yields zero cards marks the end of the result set and stops the
/// district; a fetch error is logged and pagination moves on to the next
/// page, so one bad response does not cost the rest of the district.
pub fn fetch_district<F: PageFetcher>(
    fetcher: &F,
    district: District,
    options: &PipelineOptions,
) -> Vec<ListingRecord> {
    let mut records = Vec::new();

    for page in 1..=options.max_pages {
        let page_url = district_page_url(district, page);
        debug_println!("[{}] Fetching page {}: {}", district.name, page, page_url);

        let parsed = match fetcher.fetch(&page_url) {
            Ok(html) => parse_listing_page(&html, district),
            Err(e) => {
                eprintln!("[{}] Error fetching page {}: {}", district.name, page, e);
                // failed page counts as empty, the next page may still work
                polite_pause(options.min_delay, options.max_delay);
                continue;
            }
        };

        println!(
            "[{}] Parsed {} listings on page {}",
            district.name,
            parsed.len(),
            page
        );

        if parsed.is_empty() {
            // end of the result set, not an error
            break;
        }
        records.extend(parsed);

        if page < options.max_pages {
            polite_pause(options.min_delay, options.max_delay);
        }
    }

    records
}

/// Parse all listing cards out of one search-result page.
pub fn parse_listing_page(html: &str, district: District) -> Vec<ListingRecord> {
    let document = Html::parse_document(html);

    // Cards are usually anchors inside the listing grid; climb from each
    // anchor to its card container. Fallback to the alternate card wrapper
    // class when the grid markup changes.
    let anchor_selector = Selector::parse("div[data-testid='listing-grid'] a.css-1tqlkj0").unwrap();
    let mut cards: Vec<ElementRef> = document.select(&anchor_selector).map(card_root).collect();
    if cards.is_empty() {
        let wrapper_selector = Selector::parse("div.css-1sw7q4x").unwrap();
        cards = document.select(&wrapper_selector).collect();
    }

    let mut records = Vec::new();
    for card in cards {
        if let Some(record) = parse_card(card, district) {
            records.push(record);
        }
    }
    records
}

/// Climb from a card anchor to the nearest block element that holds the
/// whole card. Never climbs into the grid container itself: an anchor that
/// sits directly under the grid is its own card.
fn card_root(anchor: ElementRef) -> ElementRef {
    let mut current = anchor;
    for _ in 0..4 {
        if matches!(current.value().name(), "article" | "div" | "li") {
            break;
        }
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) if parent.value().attr("data-testid") != Some("listing-grid") => {
                current = parent
            }
            _ => break,
        }
    }
    current
}

/// Extract one `ListingRecord` from a card element. Cards without a URL or
/// without an id token in the URL are dropped; a missing or unparsable
/// price is kept as nulls.
fn parse_card(card: ElementRef, district: District) -> Option<ListingRecord> {
    let anchor_selector = Selector::parse("a.css-1tqlkj0").unwrap();
    let anchor = card
        .select(&anchor_selector)
        .next()
        .or_else(|| (card.value().name() == "a").then_some(card))?;

    let href = anchor.value().attr("href")?;
    let url = if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", BASE_URL, href)
    };
    let card_id = parser::extract_card_id(&url)?;

    let h4_selector = Selector::parse("h4").unwrap();
    let title = anchor
        .select(&h4_selector)
        .next()
        .map(|h| h.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| anchor.text().collect::<Vec<_>>().join(" ").trim().to_string());

    let price_selector = Selector::parse("p[data-testid='ad-price']").unwrap();
    let price_raw = card
        .select(&price_selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|t| !t.is_empty());
    let (price_value, price_currency) = match price_raw.as_deref() {
        Some(raw) => parser::parse_price(raw),
        None => (None, None),
    };

    let loc_selector = Selector::parse("p[data-testid='location-date']").unwrap();
    let loc_text = card
        .select(&loc_selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string());
    let loc = loc_text
        .as_deref()
        .map(parser::parse_location_date)
        .unwrap_or_default();

    Some(ListingRecord {
        card_id,
        title,
        url,
        price_raw,
        price_value,
        price_currency,
        location_text: loc.location_text,
        posted_date_raw: loc.posted_date_raw,
        posted_date: loc.posted_date,
        time_raw: loc.time_raw,
        district_id: district.id,
        district_name: district.name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::cell::RefCell;

    fn card_html(id: &str, title: &str, price: Option<&str>) -> String {
        let price_block = match price {
            Some(p) => format!("<p data-testid=\"ad-price\">{}</p>", p),
            None => String::new(),
        };
        format!(
            "<div class=\"css-1sw7q4x\">\
               <a class=\"css-1tqlkj0\" href=\"/d/obyavlenie/-ID{id}.html\"><h4>{title}</h4></a>\
               {price_block}\
               <p data-testid=\"location-date\">Ташкент, Яккасарайский район - Сегодня в 10:47</p>\
             </div>"
        )
    }

    fn page_html(cards: &[String]) -> String {
        format!(
            "<html><body><div data-testid=\"listing-grid\">{}</div></body></html>",
            cards.join("")
        )
    }

    /// Serves canned pages in order and counts requests.
    struct FakeFetcher {
        pages: Vec<String>,
        requests: RefCell<usize>,
    }

    impl PageFetcher for FakeFetcher {
        fn fetch(&self, _url: &str) -> Result<String> {
            let mut count = self.requests.borrow_mut();
            let page = self.pages.get(*count).cloned().unwrap_or_else(|| page_html(&[]));
            *count += 1;
            Ok(page)
        }
    }

    fn district() -> District {
        District::by_id(26).unwrap()
    }

    fn quick_options(max_pages: usize) -> PipelineOptions {
        PipelineOptions {
            max_pages,
            min_delay: 0.0,
            max_delay: 0.0,
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn parses_cards_with_and_without_price() {
        let html = page_html(&[
            card_html("aaa1", "Квартира у метро", Some("1 200 у.е.")),
            card_html("bbb2", "Квартира без цены", None),
        ]);
        let records = parse_listing_page(&html, district());
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].card_id, "aaa1");
        assert_eq!(records[0].title, "Квартира у метро");
        assert_eq!(records[0].url, "https://www.olx.uz/d/obyavlenie/-IDaaa1.html");
        assert_eq!(records[0].price_value, Some(1200.0));
        assert_eq!(records[0].district_id, 26);
        assert_eq!(records[0].district_name, "yakkasarai");

        // unparsable/missing price keeps the record with null price fields
        assert_eq!(records[1].card_id, "bbb2");
        assert_eq!(records[1].price_raw, None);
        assert_eq!(records[1].price_value, None);
        assert_eq!(records[1].price_currency, None);
    }

    #[test]
    fn anchors_directly_under_grid_parse_as_separate_cards() {
        // no wrapper div per card: the anchors sit straight in the grid
        let html = "<html><body><div data-testid=\"listing-grid\">\
               <a class=\"css-1tqlkj0\" href=\"/d/obyavlenie/-IDqq1.html\"><h4>Первая</h4></a>\
               <a class=\"css-1tqlkj0\" href=\"/d/obyavlenie/-IDqq2.html\"><h4>Вторая</h4></a>\
               <a class=\"css-1tqlkj0\" href=\"/d/obyavlenie/-IDqq3.html\"><h4>Третья</h4></a>\
             </div></body></html>";
        let records = parse_listing_page(html, district());
        assert_eq!(records.len(), 3);
        let ids: Vec<&str> = records.iter().map(|r| r.card_id.as_str()).collect();
        assert_eq!(ids, vec!["qq1", "qq2", "qq3"]);
        assert_eq!(records[1].title, "Вторая");
    }

    #[test]
    fn card_without_id_token_is_dropped() {
        let html = page_html(&[
            "<div class=\"css-1sw7q4x\">\
               <a class=\"css-1tqlkj0\" href=\"/d/obyavlenie/no-id-here.html\"><h4>x</h4></a>\
             </div>"
                .to_string(),
        ]);
        assert!(parse_listing_page(&html, district()).is_empty());
    }

    #[test]
    fn pagination_stops_at_first_empty_page() {
        let fetcher = FakeFetcher {
            pages: vec![
                page_html(&[card_html("a1", "p1 c1", Some("300 у.е.")), card_html("a2", "p1 c2", Some("310 у.е."))]),
                page_html(&[card_html("b1", "p2 c1", Some("320 у.е."))]),
                page_html(&[card_html("c1", "p3 c1", Some("330 у.е."))]),
                page_html(&[]),
            ],
            requests: RefCell::new(0),
        };

        let records = fetch_district(&fetcher, district(), &quick_options(10));
        assert_eq!(records.len(), 4);
        // page 4 came back empty, so pages 5..10 were never requested
        assert_eq!(*fetcher.requests.borrow(), 4);
    }

    #[test]
    fn max_pages_caps_requests() {
        let pages: Vec<String> = (0..5)
            .map(|i| page_html(&[card_html(&format!("x{}", i), "t", Some("100 у.е."))]))
            .collect();
        let fetcher = FakeFetcher { pages, requests: RefCell::new(0) };

        let records = fetch_district(&fetcher, district(), &quick_options(2));
        assert_eq!(records.len(), 2);
        assert_eq!(*fetcher.requests.borrow(), 2);
    }

    #[test]
    fn district_url_shape() {
        let url = district_page_url(district(), 3);
        assert!(url.starts_with("https://www.olx.uz/nedvizhimost/kvartiry/arenda-dolgosrochnaya/tashkent/"));
        assert!(url.contains("search%5Bdistrict_id%5D=26"));
        assert!(url.ends_with("&page=3"));
    }
}
