//! # destiny-manifest - Manifest database to JSON
//!
//! Converts the Destiny 2 content manifest (an SQLite database of JSON rows)
//! into a single JSON document keyed by table name and content hash.
//!
//! ## Modules
//!
//! - **manifest**: Read the database and assemble the document
//! - **fetch**: Resolve, download and unzip the current manifest
//!
//! ## Quick Start
//!
//! ```no_run
//! use destiny_manifest::{ManifestConfig, ManifestTransformer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut transformer = ManifestTransformer::new(ManifestConfig::default());
//! let document = transformer.transform("world_sql_content.content")?;
//!
//! // {"DestinyRaceDefinition":{"898834093":{...}, ...}, ...}
//! let json = document.to_json_string()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub mod fetch;
pub mod manifest;

// Re-export commonly used types for convenience
pub use fetch::{FetchConfig, ManifestFetcher, ManifestInfo};
pub use manifest::{
    Entry, EntryKeyer, ManifestConfig, ManifestDocument, ManifestError, ManifestResult,
    ManifestSource, ManifestTransformer, TableEntries,
};

/// Main entry point: turn a manifest database into its JSON document
pub fn transform_manifest<P: AsRef<Path>>(path: P) -> ManifestResult<String> {
    ManifestTransformer::new(ManifestConfig::default()).transform_to_string(path)
}
