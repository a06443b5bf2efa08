use crate::analysis::{self, AnalysisReport};
use crate::cleaner;
use crate::details_scraper::{self, DetailStats};
use crate::districts::{District, DISTRICTS};
use crate::fetch::PageFetcher;
use crate::listing_scraper;
use crate::storage;
use std::path::PathBuf;

/// Everything one invocation needs: district subset, page cap, delay and
/// timeout bounds, flush interval, output layout. Built once in `main` and
/// passed by reference into each stage.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub data_dir: PathBuf,
    pub districts: Vec<District>,
    pub max_pages: usize,
    /// Delay bounds between consecutive requests, in seconds.
    pub min_delay: f64,
    pub max_delay: f64,
    pub timeout_secs: u64,
    /// Flush pending detail rows every this many records.
    pub save_interval: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            districts: DISTRICTS.to_vec(),
            max_pages: 10,
            min_delay: 1.0,
            max_delay: 2.5,
            timeout_secs: 10,
            save_interval: 50,
        }
    }
}

impl PipelineOptions {
    pub fn listing_path(&self, district: District) -> PathBuf {
        self.data_dir
            .join("listings")
            .join(format!("{}.csv", district.slug()))
    }

    pub fn cleaned_path(&self, district: District) -> PathBuf {
        self.data_dir
            .join("listings_cleaned")
            .join(format!("{}_cleaned.csv", district.slug()))
    }

    pub fn details_path(&self, district: District) -> PathBuf {
        self.data_dir
            .join("card_details")
            .join(format!("{}_details.csv", district.slug()))
    }

    pub fn analysis_path(&self, table: &str) -> PathBuf {
        self.data_dir.join("analysis").join(format!("{}.csv", table))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchSummary {
    pub districts: usize,
    pub rows: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanSummary {
    pub files: usize,
    pub rows_removed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetailsSummary {
    pub districts: usize,
    pub appended: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisSummary {
    pub districts: usize,
    pub skipped: usize,
    pub report: AnalysisReport,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub fetch: FetchSummary,
    pub clean: CleanSummary,
    pub details: DetailsSummary,
    pub analysis: AnalysisSummary,
}

/// Stage 1: crawl search pages per district and overwrite the raw listing
/// tables. A district that fails to save is reported and skipped.
pub fn run_fetch<F: PageFetcher>(fetcher: &F, options: &PipelineOptions) -> FetchSummary {
    let mut summary = FetchSummary::default();
    for &district in &options.districts {
        let records = listing_scraper::fetch_district(fetcher, district, options);
        let path = options.listing_path(district);
        match storage::save_listings(&path, &records) {
            Ok(()) => {
                println!("[{}] Saved {} rows to {}", district.name, records.len(), path.display());
                summary.districts += 1;
                summary.rows += records.len();
            }
            Err(e) => {
                eprintln!("[{}] Error saving listings: {}", district.name, e);
                summary.errors += 1;
            }
        }
    }
    summary
}

/// Stage 2: rewrite each district's cleaned table from its raw table.
/// Missing or unreadable inputs are per-district skips, never fatal.
pub fn run_clean(options: &PipelineOptions) -> CleanSummary {
    let mut summary = CleanSummary::default();
    for &district in &options.districts {
        let input = options.listing_path(district);
        if !input.exists() {
            println!("[{}] No listing file at {}, skipping", district.name, input.display());
            summary.skipped += 1;
            continue;
        }

        let records = match storage::load_listings(&input) {
            Ok(records) => records,
            Err(e) => {
                eprintln!("[{}] Error reading listings: {}", district.name, e);
                summary.skipped += 1;
                continue;
            }
        };

        let (cleaned, stats) = cleaner::clean(records);
        let output = options.cleaned_path(district);
        match storage::save_listings(&output, &cleaned) {
            Ok(()) => {
                println!(
                    "[{}] {} rows removed, {} kept, saved to {}",
                    district.name,
                    stats.removed,
                    stats.retained,
                    output.display()
                );
                summary.files += 1;
                summary.rows_removed += stats.removed;
            }
            Err(e) => {
                eprintln!("[{}] Error saving cleaned listings: {}", district.name, e);
                summary.skipped += 1;
            }
        }
    }
    summary
}

/// Stage 3: scrape detail pages for every uncovered card of each cleaned
/// table, appending to the per-district detail files.
pub fn run_details<F: PageFetcher>(fetcher: &F, options: &PipelineOptions) -> DetailsSummary {
    let mut summary = DetailsSummary::default();
    for &district in &options.districts {
        let input = options.cleaned_path(district);
        if !input.exists() {
            println!("[{}] No cleaned file at {}, skipping", district.name, input.display());
            summary.skipped += 1;
            continue;
        }

        println!("{}", "-".repeat(60));
        println!("District: {}", district.name);

        let listings = match storage::load_listings(&input) {
            Ok(listings) => listings,
            Err(e) => {
                eprintln!("[{}] Error reading cleaned listings: {}", district.name, e);
                summary.skipped += 1;
                continue;
            }
        };

        let detail_path = options.details_path(district);
        match details_scraper::fetch_district_details(fetcher, &listings, &detail_path, options) {
            Ok(stats) => {
                print_detail_stats(district, &stats);
                summary.districts += 1;
                summary.appended += stats.appended;
                summary.failed += stats.failed;
            }
            Err(e) => {
                eprintln!("[{}] Error scraping details: {}", district.name, e);
                summary.skipped += 1;
            }
        }
    }
    summary
}

/// Stage 4: join each district's cleaned table with its detail table and
/// report price-per-square-meter statistics. Districts missing either
/// table are skipped; the report tables are rewritten on every run.
pub fn run_analysis(options: &PipelineOptions) -> AnalysisSummary {
    let mut summary = AnalysisSummary::default();
    let mut rows = Vec::new();

    for &district in &options.districts {
        let cleaned = options.cleaned_path(district);
        let details = options.details_path(district);
        if !cleaned.exists() || !details.exists() {
            println!("[{}] Missing cleaned or detail table, skipping", district.name);
            summary.skipped += 1;
            continue;
        }

        let listings = match storage::load_listings(&cleaned) {
            Ok(listings) => listings,
            Err(e) => {
                eprintln!("[{}] Error reading cleaned listings: {}", district.name, e);
                summary.skipped += 1;
                continue;
            }
        };
        let detail_rows = match storage::load_details(&details) {
            Ok(rows) => rows,
            Err(e) => {
                eprintln!("[{}] Error reading details: {}", district.name, e);
                summary.skipped += 1;
                continue;
            }
        };

        let joined = analysis::join_district(&listings, &detail_rows);
        println!("[{}] {} priced listings joined", district.name, joined.len());
        summary.districts += 1;
        rows.extend(joined);
    }

    let report = analysis::analyze(&rows);
    print_analysis_report(&report);

    for (table, averages) in [
        ("price_by_district", &report.by_district),
        ("price_by_condition", &report.by_condition),
    ] {
        let path = options.analysis_path(table);
        if let Err(e) = analysis::save_averages(&path, averages) {
            eprintln!("Error saving report table {}: {}", path.display(), e);
        } else {
            println!("Saved {}", path.display());
        }
    }

    summary.report = report;
    summary
}

fn print_analysis_report(report: &AnalysisReport) {
    if report.rows == 0 {
        println!("No priced listings to analyze");
        return;
    }
    println!(
        "{} listings, price per m²: mean {:.0} UZS, median {:.0} UZS",
        report.rows, report.mean_price_per_sq_meter, report.median_price_per_sq_meter
    );
    println!("By district:");
    for avg in &report.by_district {
        println!(
            "  {:<16} {:>12.0} UZS/m² ({} listings)",
            avg.group, avg.avg_price_per_sq_meter, avg.listings
        );
    }
    println!("By condition:");
    for avg in &report.by_condition {
        println!(
            "  {:<16} {:>12.0} UZS/m² ({} listings)",
            avg.group, avg.avg_price_per_sq_meter, avg.listings
        );
    }
}

fn print_detail_stats(district: District, stats: &DetailStats) {
    println!(
        "[{}] {} cards total: {} skipped, {} fetched, {} failed, {} appended",
        district.name, stats.total, stats.skipped, stats.fetched, stats.failed, stats.appended
    );
}

/// Full pipeline: fetch, clean, details, analysis, in order. Stages run
/// unconditionally; a weak earlier stage is reported and its partial data
/// simply flows forward.
pub fn run_full<F: PageFetcher>(fetcher: &F, options: &PipelineOptions) -> PipelineReport {
    print_step(1, "Fetching raw listings");
    let fetch = run_fetch(fetcher, options);
    if fetch.districts == 0 {
        println!("Warning: no districts fetched");
    }

    print_step(2, "Cleaning listing tables");
    let clean = run_clean(options);
    if clean.files == 0 {
        println!("Warning: no files cleaned");
    }

    print_step(3, "Fetching card details");
    let details = run_details(fetcher, options);
    if details.districts == 0 {
        println!("Warning: no districts processed for details");
    }

    print_step(4, "Analyzing prices");
    let analysis = run_analysis(options);

    PipelineReport { fetch, clean, details, analysis }
}

fn print_step(number: usize, name: &str) {
    println!("\n{}", "=".repeat(60));
    println!("Step {}: {}", number, name);
    println!("{}", "=".repeat(60));
}
