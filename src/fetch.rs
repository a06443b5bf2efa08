use anyhow::{bail, Context, Result};
use rand::Rng;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Seam between the pipeline and the network: URL in, page text out.
/// Stages only ever talk to this trait, which keeps them runnable against
/// canned HTML in tests.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking reqwest-backed fetcher with a per-request timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;
        if !response.status().is_success() {
            bail!("HTTP {} for {}", response.status(), url);
        }
        response
            .text()
            .with_context(|| format!("Failed to read response body from {}", url))
    }
}

/// Sleep a random duration within [min_delay, max_delay] seconds between
/// consecutive requests, to be respectful to the server. Zero bounds skip
/// the sleep, which is what the tests use.
pub fn polite_pause(min_delay: f64, max_delay: f64) {
    if max_delay <= 0.0 {
        return;
    }
    let min = min_delay.min(max_delay);
    let secs = rand::thread_rng().gen_range(min..=max_delay);
    std::thread::sleep(Duration::from_secs_f64(secs));
}
