use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tashrent::debug;
use tashrent::districts::{District, DISTRICTS};
use tashrent::fetch::HttpFetcher;
use tashrent::pipeline::{self, PipelineOptions};

/// Standalone stage-1 runner: crawl the district search feeds and write the
/// raw listing tables, nothing else.
#[derive(Parser, Debug)]
#[clap(author, version, about = "OLX Tashkent listing-page scraper")]
struct Args {
    /// Maximum pages to fetch per district
    #[clap(short, long, default_value = "10")]
    max_pages: usize,

    /// Comma-separated district ids to process (default: all 11)
    #[clap(short, long)]
    districts: Option<String>,

    /// Root directory for output files
    #[clap(long, default_value = "data")]
    data_dir: PathBuf,

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
        max_pages: args.max_pages,
        min_delay: args.min_delay,
        max_delay: args.max_delay,
        timeout_secs: args.timeout,
        ..PipelineOptions::default()
    };

    let fetcher = HttpFetcher::new(Duration::from_secs(options.timeout_secs))?;
    let summary = pipeline::run_fetch(&fetcher, &options);
    println!(
        "\nFetched {} districts, {} rows ({} errors)",
        summary.districts, summary.rows, summary.errors
    );
    Ok(())
}
