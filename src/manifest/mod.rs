//! Manifest transformation - turn a manifest database into one JSON document
//!
//! Every table becomes a top-level key. Every row's JSON payload becomes an
//! entry in that table's object, keyed by the payload's own hash or by a
//! synthesized fallback key when it has none.

pub mod document;
pub mod error;
pub mod keyer;
pub mod source;
pub mod transformer;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use document::{ManifestDocument, TableEntries};
pub use error::{ManifestError, ManifestResult};
pub use keyer::{embedded_hash, EntryKeyer};
pub use source::{decode_payload, ManifestSource, TableRows};
pub use transformer::ManifestTransformer;
pub use types::{Entry, ManifestConfig};
