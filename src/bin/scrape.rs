use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use fortune_scrape_lib::{config::ScrapeConfig, init_tracing, run_scrape, utils};

/// Scrape the venue's event pages into a JSON array of canonical records.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON file overriding the built-in venue profile and request settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the scraped events (defaults to beside the executable)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pause between page requests, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = ScrapeConfig::load(args.config.as_deref())?;
    if let Some(delay) = args.delay_ms {
        config.request_delay_ms = delay;
    }
    let output = args.output.unwrap_or_else(utils::default_events_path);

    match run_scrape(config, &output) {
        Ok(count) => {
            tracing::info!(count, "scrape finished");
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "scrape failed");
            Err(err)
        }
    }
}
