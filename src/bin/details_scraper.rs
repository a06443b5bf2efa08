use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tashrent::debug;
use tashrent::districts::{District, DISTRICTS};
use tashrent::fetch::HttpFetcher;
use tashrent::pipeline::{self, PipelineOptions};

/// Standalone stage-3 runner: scrape detail pages for every uncovered card
/// of the cleaned tables. Safe to stop and restart; finished cards are
/// skipped on resume.
#[derive(Parser, Debug)]
#[clap(author, version, about = "OLX Tashkent card-details scraper")]
struct Args {
    /// Comma-separated district ids to process (default: all 11)
    #[clap(short, long)]
    districts: Option<String>,

    /// Root directory for stage files
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

fn main() -> Result<()> {
    let args = Args::parse();
    debug::set_debug(args.debug);

    let districts = match &args.districts {
        Some(arg) => arg
            .split(',')
            .map(|part| {
                let id: u32 = part.trim().parse()?;
                District::by_id(id).ok_or_else(|| anyhow::anyhow!("Unknown district id: {}", id))
            })
            .collect::<Result<Vec<_>>>()?,
        None => DISTRICTS.to_vec(),
    };

    let options = PipelineOptions {
        data_dir: args.data_dir,
        districts,
        min_delay: args.min_delay,
        max_delay: args.max_delay,
        timeout_secs: args.timeout,
        save_interval: args.save_interval,
        ..PipelineOptions::default()
    };

    println!("Save interval: {} cards", options.save_interval);
    println!("Delay range: {}-{}s", options.min_delay, options.max_delay);

    let fetcher = HttpFetcher::new(Duration::from_secs(options.timeout_secs))?;
    let summary = pipeline::run_details(&fetcher, &options);
    println!(
        "\nProcessed {} districts, {} detail rows appended ({} failed, {} skipped)",
        summary.districts, summary.appended, summary.failed, summary.skipped
    );
    Ok(())
}
