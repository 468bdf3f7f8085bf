//! manifest-convert: Convert an already extracted manifest database to JSON
//!
//! Usage:
//!   manifest-convert world_sql_content.content manifest.json
//!
//!   # Reproducible fallback keys
//!   manifest-convert world_sql_content.content manifest.json --seed 7

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use destiny_manifest::{ManifestConfig, ManifestTransformer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "manifest-convert")]
#[command(about = "Convert a manifest database to JSON", long_about = None)]
struct Args {
    /// Manifest SQLite database
    #[arg(value_name = "DATABASE")]
    database: PathBuf,

    /// Where to write the JSON document
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Column holding each row's JSON payload
    #[arg(long, default_value = "json")]
    payload_column: String,

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

    let config = ManifestConfig {
        payload_column: args.payload_column,
        unique_fallback_keys: !args.legacy_fallback_keys,
        ..ManifestConfig::default()
    };
    let json = match args.seed {
        Some(seed) => ManifestTransformer::seeded(seed, config).transform_to_string(&args.database),
        None => ManifestTransformer::new(config).transform_to_string(&args.database),
    }
    .with_context(|| format!("Failed to transform {}", args.database.display()))?;

    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    Ok(())
}
