pub mod config;
pub mod models;
pub mod normalize;
pub mod scraping;
pub mod utils;

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::ScrapeConfig;
use scraping::{base::HttpFetcher, Extractor};

/// Installs the fmt subscriber for the binaries. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reqwest=warn,html5ever=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Scrapes the configured venue and writes the canonical records to `output`.
pub fn run_scrape(config: ScrapeConfig, output: &Path) -> Result<usize> {
    let fetcher = HttpFetcher::new(&config.headers)?;
    let extractor = Extractor::new(fetcher, config);
    tracing::info!(venue = %extractor.venue().name, "starting event scraper");

    let events = extractor
        .run_batch()
        .context("unable to scrape event listing")?;
    scraping::persist(&events, output)?;
    Ok(events.len())
}
