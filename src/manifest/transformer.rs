use crate::manifest::document::{ManifestDocument, TableEntries};
use crate::manifest::error::ManifestResult;
use crate::manifest::keyer::EntryKeyer;
use crate::manifest::source::ManifestSource;
use crate::manifest::types::ManifestConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::{debug, info, warn};

/// Turns a manifest database into a `ManifestDocument` in one synchronous pass
pub struct ManifestTransformer<R = StdRng> {
    config: ManifestConfig,
    keyer: EntryKeyer<R>,
}

impl ManifestTransformer<StdRng> {
    /// Create a transformer whose fallback keys come from OS entropy
    pub fn new(config: ManifestConfig) -> Self {
        Self::with_rng(StdRng::from_entropy(), config)
    }

    /// Create a transformer whose fallback keys are reproducible
    pub fn seeded(seed: u64, config: ManifestConfig) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), config)
    }
}

impl<R: Rng> ManifestTransformer<R> {
    pub fn with_rng(rng: R, config: ManifestConfig) -> Self {
        let keyer = EntryKeyer::new(rng, &config);
        ManifestTransformer { config, keyer }
    }

    /// Open the database at `path` and build the full document.
    /// The connection is closed before this returns, whether or not it fails.
    pub fn transform<P: AsRef<Path>>(&mut self, path: P) -> ManifestResult<ManifestDocument> {
        let path = path.as_ref();
        info!(path = %path.display(), "Transforming manifest database");

        let source = ManifestSource::open(path, &self.config)?;
        self.transform_source(&source)
    }

    /// Build the document from an already open source
    pub fn transform_source(&mut self, source: &ManifestSource) -> ManifestResult<ManifestDocument> {
        let mut document = ManifestDocument::new();

        for name in source.table_names()? {
            let table = self.read_table(source, &name)?;
            document.push_table(table);
        }

        info!(
            tables = document.table_count(),
            entries = document.entry_count(),
            "Manifest transformed"
        );
        Ok(document)
    }

    /// Build the document and serialize it
    pub fn transform_to_string<P: AsRef<Path>>(&mut self, path: P) -> ManifestResult<String> {
        self.transform(path)?.to_json_string()
    }

    fn read_table(&mut self, source: &ManifestSource, name: &str) -> ManifestResult<TableEntries> {
        let mut table = TableEntries::new(name);
        let mut rows = source.rows(name)?;
        let mut replaced = 0usize;
        let mut fallback = 0usize;

        for payload in rows.payloads()? {
            let entry = self.keyer.key(payload?, &table)?;
            if entry.synthesized {
                fallback += 1;
            }
            if table.insert(entry).is_some() {
                replaced += 1;
            }
        }

        if replaced > 0 {
            warn!(table = %name, replaced, fallback, "Duplicate keys replaced earlier entries");
        }
        debug!(table = %name, entries = table.len(), fallback, "Keyed table");
        Ok(table)
    }
}
