//! Document assembly
//!
//! Entries are collected into ordered maps and emitted through a
//! `serde_json` formatter, which owns every separator. Payload text is written
//! as a raw fragment, byte for byte.

use crate::manifest::error::{ManifestError, ManifestResult};
use crate::manifest::types::Entry;
use indexmap::IndexMap;
use serde_json::ser::{CompactFormatter, Formatter};
use std::io::{self, Write};

/// All entries read from one table, in row order
#[derive(Debug, Clone, Default)]
pub struct TableEntries {
    name: String,
    entries: IndexMap<String, String>,
}

impl TableEntries {
    pub fn new(name: impl Into<String>) -> Self {
        TableEntries {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an entry, returning the payload it replaced if the key was taken.
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, entry: Entry) -> Option<String> {
        self.entries.insert(entry.key, entry.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_object<W, F>(&self, writer: &mut W, formatter: &mut F) -> serde_json::Result<()>
    where
        W: Write,
        F: Formatter,
    {
        formatter.begin_object(writer).map_err(serde_json::Error::io)?;
        for (index, (key, payload)) in self.entries.iter().enumerate() {
            write_key(writer, formatter, index == 0, key)?;
            formatter
                .write_raw_fragment(writer, payload)
                .map_err(serde_json::Error::io)?;
            formatter.end_object_value(writer).map_err(serde_json::Error::io)?;
        }
        formatter.end_object(writer).map_err(serde_json::Error::io)
    }
}

/// The aggregated manifest: table name -> entry key -> payload
#[derive(Debug, Clone, Default)]
pub struct ManifestDocument {
    tables: IndexMap<String, TableEntries>,
}

impl ManifestDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table. Tables keep the order they were added in.
    pub fn push_table(&mut self, table: TableEntries) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&TableEntries> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableEntries> {
        self.tables.values()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Total number of entries across all tables
    pub fn entry_count(&self) -> usize {
        self.tables.values().map(TableEntries::len).sum()
    }

    /// Serialize the document into a compact JSON string
    pub fn to_json_string(&self) -> ManifestResult<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            ManifestError::Serialize(serde_json::Error::io(io::Error::new(
                io::ErrorKind::InvalidData,
                e,
            )))
        })
    }

    /// Stream the document as compact JSON into a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> ManifestResult<()> {
        self.write_object(&mut writer, &mut CompactFormatter)
            .map_err(ManifestError::Serialize)
    }

    fn write_object<W, F>(&self, writer: &mut W, formatter: &mut F) -> serde_json::Result<()>
    where
        W: Write,
        F: Formatter,
    {
        formatter.begin_object(writer).map_err(serde_json::Error::io)?;
        for (index, (name, table)) in self.tables.iter().enumerate() {
            write_key(writer, formatter, index == 0, name)?;
            table.write_object(writer, formatter)?;
            formatter.end_object_value(writer).map_err(serde_json::Error::io)?;
        }
        formatter.end_object(writer).map_err(serde_json::Error::io)
    }
}

/// Emit an escaped object key and open its value
fn write_key<W, F>(writer: &mut W, formatter: &mut F, first: bool, key: &str) -> serde_json::Result<()>
where
    W: Write,
    F: Formatter,
{
    formatter
        .begin_object_key(writer, first)
        .map_err(serde_json::Error::io)?;
    serde_json::to_writer(&mut *writer, key)?;
    formatter.end_object_key(writer).map_err(serde_json::Error::io)?;
    formatter.begin_object_value(writer).map_err(serde_json::Error::io)
}
