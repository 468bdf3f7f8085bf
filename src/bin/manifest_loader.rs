//! manifest-loader: Fetch the current Destiny 2 manifest and write it as JSON
//!
//! Usage:
//!   # Download, convert, write to manifest.json
//!   manifest-loader <API_KEY> manifest.json
//!
//!   # Keep the downloaded database somewhere else, with reproducible fallback keys
//!   manifest-loader <API_KEY> manifest.json --work-dir ./cache --seed 7

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use destiny_manifest::{FetchConfig, ManifestConfig, ManifestFetcher, ManifestTransformer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "manifest-loader")]
#[command(about = "Fetch the Destiny 2 manifest and convert it to JSON", long_about = None)]
struct Args {
    /// Bungie.net API key
    #[arg(value_name = "API_KEY")]
    api_key: String,

    /// Where to write the JSON document
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Directory for the downloaded manifest database (default: current directory)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Seed for fallback keys, for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Draw fallback keys without collision checks (rows may overwrite each other)
    #[arg(long)]
    legacy_fallback_keys: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "destiny_manifest=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut fetch_config = FetchConfig::default();
    if let Some(work_dir) = args.work_dir {
        fetch_config.work_dir = work_dir;
    }
    let database = ManifestFetcher::new(fetch_config)
        .fetch(&args.api_key)
        .context("Failed to fetch manifest")?;

    let config = ManifestConfig {
        unique_fallback_keys: !args.legacy_fallback_keys,
        ..ManifestConfig::default()
    };
    let document = match args.seed {
        Some(seed) => ManifestTransformer::seeded(seed, config).transform(&database),
        None => ManifestTransformer::new(config).transform(&database),
    }
    .with_context(|| format!("Failed to transform {}", database.display()))?;

    // Only touch the output once the whole document is built
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    document
        .write_to(&mut writer)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    Ok(())
}
