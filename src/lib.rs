pub mod analysis;
pub mod cleaner;
pub mod debug;
pub mod details_scraper;
pub mod districts;
pub mod fetch;
pub mod listing_scraper;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod storage;
