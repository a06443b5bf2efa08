use chrono::{Datelike, Duration, Local, NaiveDate};
use regex::Regex;

/// Card id token embedded in every OLX ad URL, e.g.
/// `.../otlichnaya-kvartira-ID1a2b3.html` -> `1a2b3`.
pub fn extract_card_id(url: &str) -> Option<String> {
    let re = Regex::new(r"ID([A-Za-z0-9]+)").unwrap();
    re.captures(url)
        .map(|caps| caps.get(1).unwrap().as_str().to_string())
}

/// Parse a card price label like "1 200 у.е. Договорная" into a numeric
/// value and a currency token. Either side may be missing; unparsable text
/// yields (None, None) and the listing is kept anyway.
pub fn parse_price(raw: &str) -> (Option<f64>, Option<String>) {
    // OLX pads prices with non-breaking spaces
    let s = raw.replace('\u{a0}', " ");

    let num_re = Regex::new(r"([\d][\d\s,.]*)").unwrap();
    let price_value = num_re.captures(&s).and_then(|caps| {
        let num = caps.get(1).unwrap().as_str().replace(' ', "").replace(',', ".");
        num.parse::<f64>().ok()
    });

    let cur_re = Regex::new(r"[\d][\d\s,.]*\s*([^\d\s,\.]+(?:\.[^\d\s,\.]+)?)").unwrap();
    let currency = cur_re
        .captures(&s)
        .map(|caps| caps.get(1).unwrap().as_str().trim().to_string())
        .filter(|c| !c.is_empty());

    (price_value, currency)
}

fn month_number(name: &str) -> Option<u32> {
    // Genitive forms as they appear in "21 ноября в 13:20"
    match name {
        "января" => Some(1),
        "февраля" => Some(2),
        "марта" => Some(3),
        "апреля" => Some(4),
        "мая" => Some(5),
        "июня" => Some(6),
        "июля" => Some(7),
        "августа" => Some(8),
        "сентября" => Some(9),
        "октября" => Some(10),
        "ноября" => Some(11),
        "декабря" => Some(12),
        _ => None,
    }
}

/// Split of a card's "location - posted" line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationDate {
    pub location_text: Option<String>,
    pub posted_date_raw: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub time_raw: Option<String>,
}

/// Parse the combined location/date line of a listing card, e.g.
/// "Ташкент, Шайхантахурский район - Сегодня в 10:47" or
/// "Ташкент, Чиланзар - 01.11.2025".
pub fn parse_location_date(text: &str) -> LocationDate {
    let s = text.trim();
    if s.is_empty() {
        return LocationDate::default();
    }

    let (loc, dt) = match s.split_once(" - ") {
        Some((loc, dt)) => (loc.trim(), dt.trim()),
        // occasionally the separator is just a run of spaces
        None => match s.split_once("  ") {
            Some((loc, dt)) => (loc.trim(), dt.trim()),
            None => (s, ""),
        },
    };

    let today = Local::now().date_naive();
    let mut posted_date = None;
    let mut time_raw = None;

    if dt.contains("Сегодня") {
        let re = Regex::new(r"Сегодня\s*в\s*([0-2]?\d:[0-5]\d)").unwrap();
        time_raw = re
            .captures(dt)
            .map(|caps| caps.get(1).unwrap().as_str().to_string());
        posted_date = Some(today);
    } else if dt.contains("Вчера") {
        let re = Regex::new(r"Вчера\s*в\s*([0-2]?\d:[0-5]\d)").unwrap();
        time_raw = re
            .captures(dt)
            .map(|caps| caps.get(1).unwrap().as_str().to_string());
        posted_date = Some(today - Duration::days(1));
    } else {
        // "21 ноября в 13:20", "21 ноября" or "01.11.2025"
        let named = Regex::new(r"(\d{1,2})\s+([а-яё]+)\s*(?:в\s*([0-2]?\d:[0-5]\d))?").unwrap();
        if let Some(caps) = named.captures(dt) {
            let day: u32 = caps.get(1).unwrap().as_str().parse().unwrap_or(0);
            if let Some(month) = month_number(caps.get(2).unwrap().as_str()) {
                // cards never show a year; a month later than now means last year
                let mut year = today.year();
                if month > today.month() {
                    year -= 1;
                }
                posted_date = NaiveDate::from_ymd_opt(year, month, day);
                time_raw = caps.get(3).map(|m| m.as_str().to_string());
            }
        } else {
            let dotted = Regex::new(r"(\d{1,2})\.(\d{1,2})(?:\.(\d{2,4}))?").unwrap();
            if let Some(caps) = dotted.captures(dt) {
                let day: u32 = caps.get(1).unwrap().as_str().parse().unwrap_or(0);
                let month: u32 = caps.get(2).unwrap().as_str().parse().unwrap_or(0);
                let mut year: i32 = caps
                    .get(3)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or_else(|| today.year());
                if year < 100 {
                    year += 2000;
                }
                posted_date = NaiveDate::from_ymd_opt(year, month, day);
            }
        }
    }

    LocationDate {
        location_text: Some(loc.to_string()).filter(|l| !l.is_empty()),
        posted_date_raw: Some(dt.to_string()).filter(|d| !d.is_empty()),
        posted_date,
        time_raw,
    }
}

/// Parse the "posted at" stamp of a detail page: "Сегодня в 10:47",
/// "Вчера в 18:03" or "12 мая 2025 г.".
pub fn parse_posted_at(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    let today = Local::now().date_naive();

    if s.starts_with("Сегодня") {
        return Some(today);
    }
    if s.starts_with("Вчера") {
        return Some(today - Duration::days(1));
    }

    let cleaned = s.replace(" г.", "");
    let mut parts = cleaned.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = month_number(parts.next()?)?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Numeric value of an area label like "42 м²" or "41.5 м²".
pub fn parse_area(text: &str) -> Option<f64> {
    let re = Regex::new(r"(\d+(?:[.,]\d+)?)").unwrap();
    re.captures(text)
        .and_then(|caps| caps.get(1).unwrap().as_str().replace(',', ".").parse().ok())
}

/// Integer room count from a label like "3" or "3 комнаты".
pub fn parse_rooms(text: &str) -> Option<u32> {
    let re = Regex::new(r"(\d+)").unwrap();
    re.captures(text)
        .and_then(|caps| caps.get(1).unwrap().as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn card_id_from_url() {
        assert_eq!(
            extract_card_id("https://www.olx.uz/d/obyavlenie/kvartira-ID1a2B3.html"),
            Some("1a2B3".to_string())
        );
        assert_eq!(extract_card_id("https://www.olx.uz/d/obyavlenie/kvartira.html"), None);
    }

    #[test]
    fn price_with_currency() {
        let (value, currency) = parse_price("1 200 у.е. Договорная");
        assert_eq!(value, Some(1200.0));
        assert_eq!(currency.as_deref(), Some("у.е"));
    }

    #[test]
    fn price_with_nbsp_and_sum() {
        let (value, currency) = parse_price("4\u{a0}500\u{a0}000 сум");
        assert_eq!(value, Some(4500000.0));
        assert_eq!(currency.as_deref(), Some("сум"));
    }

    #[test]
    fn unparsable_price_yields_none() {
        let (value, currency) = parse_price("Договорная");
        assert_eq!(value, None);
        assert_eq!(currency, None);
    }

    #[test]
    fn digitless_price_text_yields_no_currency_either() {
        // the word after the space must not be mistaken for a currency
        let (value, currency) = parse_price("Договорная цена");
        assert_eq!(value, None);
        assert_eq!(currency, None);
    }

    #[test]
    fn location_date_today() {
        let parsed = parse_location_date("Ташкент, Шайхантахурский район - Сегодня в 10:47");
        assert_eq!(parsed.location_text.as_deref(), Some("Ташкент, Шайхантахурский район"));
        assert_eq!(parsed.posted_date, Some(Local::now().date_naive()));
        assert_eq!(parsed.time_raw.as_deref(), Some("10:47"));
    }

    #[test]
    fn location_date_yesterday() {
        let parsed = parse_location_date("Ташкент, Юнусабадский район - Вчера в 18:03");
        assert_eq!(parsed.posted_date, Some(Local::now().date_naive() - Duration::days(1)));
        assert_eq!(parsed.time_raw.as_deref(), Some("18:03"));
    }

    #[test]
    fn location_date_month_name() {
        let parsed = parse_location_date("Ташкент, Мирзо-Улугбекский район - 21 ноября в 13:20");
        let date = parsed.posted_date.expect("date parsed");
        assert_eq!((date.day(), date.month()), (21, 11));
        assert_eq!(parsed.time_raw.as_deref(), Some("13:20"));
    }

    #[test]
    fn location_date_dotted() {
        let parsed = parse_location_date("Ташкент, Чиланзар - 01.11.2025");
        assert_eq!(parsed.posted_date, NaiveDate::from_ymd_opt(2025, 11, 1));
        assert_eq!(parsed.time_raw, None);
    }

    #[test]
    fn location_only() {
        let parsed = parse_location_date("Ташкент, Сергели");
        assert_eq!(parsed.location_text.as_deref(), Some("Ташкент, Сергели"));
        assert_eq!(parsed.posted_date_raw, None);
        assert_eq!(parsed.posted_date, None);
    }

    #[test]
    fn posted_at_absolute() {
        assert_eq!(
            parse_posted_at("12 мая 2025 г."),
            NaiveDate::from_ymd_opt(2025, 5, 12)
        );
    }

    #[test]
    fn posted_at_relative() {
        assert_eq!(parse_posted_at("Сегодня в 09:15"), Some(Local::now().date_naive()));
    }

    #[test]
    fn area_and_rooms() {
        assert_eq!(parse_area("42 м²"), Some(42.0));
        assert_eq!(parse_area("41,5 м²"), Some(41.5));
        assert_eq!(parse_area("нет"), None);
        assert_eq!(parse_rooms("3 комнаты"), Some(3));
        assert_eq!(parse_rooms(""), None);
    }
}
