use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use fortune_scrape_lib::{init_tracing, normalize::Normalizer, utils};

/// Convert scraped events into the app database schema.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Scraper output to read (defaults to the scraper's default output)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the converted batch
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let input = args.input.unwrap_or_else(utils::default_events_path);
    let output = args.output.unwrap_or_else(utils::default_converted_path);

    let count = Normalizer::default()
        .convert_batch(&input, &output)
        .inspect_err(|err| tracing::error!(error = %err, "conversion failed"))
        .context("conversion failed")?;
    tracing::info!(count, path = %output.display(), "conversion finished");
    Ok(())
}
