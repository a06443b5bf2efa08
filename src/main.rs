use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tashrent::districts::{District, DISTRICTS};
use tashrent::fetch::HttpFetcher;
use tashrent::pipeline::{self, PipelineOptions};
use tashrent::debug;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Tashrent - OLX Tashkent rental listings pipeline")]
struct Args {
    /// Only run the listing fetch stage
    #[clap(long, conflicts_with_all = ["clean_only", "details_only", "analyze_only"])]
    fetch_only: bool,

    /// Only run the cleaning stage
    #[clap(long, conflicts_with_all = ["details_only", "analyze_only"])]
    clean_only: bool,

    /// Only run the detail fetch stage
    #[clap(long, conflicts_with = "analyze_only")]
    details_only: bool,

    /// Only run the price analysis stage
    #[clap(long)]
    analyze_only: bool,

    /// Maximum pages to fetch per district
    #[clap(short, long, default_value = "10")]
    max_pages: usize,

    /// Comma-separated district ids to process (default: all 11)
    #[clap(short, long)]
    districts: Option<String>,

    /// Root directory for stage output files
    #[clap(long, default_value = "data")]
    data_dir: PathBuf,

    /// Flush pending detail rows every N records
    #[clap(long, default_value = "50")]
    save_interval: usize,

    /// Minimum delay between requests, in seconds
    #[clap(long, default_value = "1.0")]
    min_delay: f64,

    /// Maximum delay between requests, in seconds
    #[clap(long, default_value = "2.5")]
    max_delay: f64,

    /// Per-request timeout, in seconds
    #[clap(long, default_value = "10")]
    timeout: u64,

    /// Enable debug output
    #[clap(long)]
    debug: bool,
}

fn parse_districts(arg: &str) -> Result<Vec<District>> {
    let mut districts = Vec::new();
    for part in arg.split(',') {
        let part = part.trim();
        let id: u32 = part
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid district id: {}", part))?;
        match District::by_id(id) {
            Some(district) => districts.push(district),
            None => bail!("Unknown district id: {}", id),
        }
    }
    Ok(districts)
}

fn main() -> Result<()> {
    let args = Args::parse();
    debug::set_debug(args.debug);

    let districts = match &args.districts {
        Some(arg) => parse_districts(arg)?,
        None => DISTRICTS.to_vec(),
    };

    let options = PipelineOptions {
        data_dir: args.data_dir,
        districts,
        max_pages: args.max_pages,
        min_delay: args.min_delay,
        max_delay: args.max_delay,
        timeout_secs: args.timeout,
        save_interval: args.save_interval,
    };

    println!("Tashrent - OLX Tashkent Rental Listings Pipeline");
    println!("================================================");
    println!("Districts: {}", options.districts.len());
    println!("Max pages per district: {}", options.max_pages);

    let started = Instant::now();

    if args.clean_only {
        let summary = pipeline::run_clean(&options);
        println!("\nCleaned {} files ({} rows removed, {} skipped)", summary.files, summary.rows_removed, summary.skipped);
    } else if args.analyze_only {
        let summary = pipeline::run_analysis(&options);
        println!("\nAnalyzed {} districts, {} priced listings ({} skipped)", summary.districts, summary.report.rows, summary.skipped);
    } else {
        let fetcher = HttpFetcher::new(Duration::from_secs(options.timeout_secs))?;
        if args.fetch_only {
            let summary = pipeline::run_fetch(&fetcher, &options);
            println!("\nFetched {} districts, {} rows ({} errors)", summary.districts, summary.rows, summary.errors);
        } else if args.details_only {
            let summary = pipeline::run_details(&fetcher, &options);
            println!("\nProcessed {} districts, {} detail rows appended ({} failed, {} skipped)", summary.districts, summary.appended, summary.failed, summary.skipped);
        } else {
            let report = pipeline::run_full(&fetcher, &options);
            println!("\n=== Summary ===");
            println!("Fetched:  {} districts, {} rows", report.fetch.districts, report.fetch.rows);
            println!("Cleaned:  {} files, {} rows removed", report.clean.files, report.clean.rows_removed);
            println!("Details:  {} districts, {} rows appended, {} failed", report.details.districts, report.details.appended, report.details.failed);
            println!("Analysis: {} priced listings, median {:.0} UZS/m²", report.analysis.report.rows, report.analysis.report.median_price_per_sq_meter);
        }
    }

    let elapsed = started.elapsed();
    println!("Done in {}m {}s", elapsed.as_secs() / 60, elapsed.as_secs() % 60);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn district_arg_parses() {
        let districts = parse_districts("26, 25,12").unwrap();
        let ids: Vec<u32> = districts.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![26, 25, 12]);
    }

    #[test]
    fn district_arg_rejects_unknown_id() {
        assert!(parse_districts("26,99").is_err());
        assert!(parse_districts("abc").is_err());
        assert!(parse_districts("").is_err());
    }
}
