//! Read access to a manifest database
//!
//! The database is opened read-only. Tables are listed from the schema
//! catalog and each table's payload column is streamed one row at a time.

use crate::manifest::error::{ManifestError, ManifestResult};
use crate::manifest::types::ManifestConfig;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Statement};
use std::path::Path;

/// An open manifest database. The connection closes when this is dropped.
pub struct ManifestSource {
    conn: Connection,
    payload_column: String,
}

impl ManifestSource {
    /// Open an existing database file without write access
    pub fn open<P: AsRef<Path>>(path: P, config: &ManifestConfig) -> ManifestResult<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn, config))
    }

    pub fn from_connection(conn: Connection, config: &ManifestConfig) -> Self {
        ManifestSource {
            conn,
            payload_column: config.payload_column.clone(),
        }
    }

    /// List every table in catalog order, internal tables included
    pub fn table_names(&self) -> ManifestResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Prepare a read of one table's payload column.
    /// Fails if the table or the column does not exist.
    pub fn rows(&self, table: &str) -> ManifestResult<TableRows<'_>> {
        let sql = format!(
            "SELECT {} FROM {}",
            quote_identifier(&self.payload_column),
            quote_identifier(table)
        );
        let statement = self.conn.prepare(&sql)?;
        Ok(TableRows {
            table: table.to_string(),
            statement,
        })
    }
}

/// A prepared read over one table's payloads
pub struct TableRows<'conn> {
    table: String,
    statement: Statement<'conn>,
}

impl<'conn> TableRows<'conn> {
    /// Stream every payload as decoded text. Rows are fetched lazily and the
    /// sequence can be consumed once per call.
    pub fn payloads(
        &mut self,
    ) -> ManifestResult<impl Iterator<Item = ManifestResult<String>> + '_> {
        let table = self.table.as_str();
        let rows = self.statement.query_map([], |row| {
            Ok(match row.get_ref(0)? {
                ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(bytes.to_vec()),
                ValueRef::Null => Err("NULL"),
                ValueRef::Integer(_) => Err("an integer"),
                ValueRef::Real(_) => Err("a real"),
            })
        })?;

        Ok(rows.map(move |row| -> ManifestResult<String> {
            let bytes = row?.map_err(|kind| ManifestError::Decode {
                table: table.to_string(),
                reason: format!("payload column holds {} instead of text", kind),
            })?;
            decode_payload(table, bytes)
        }))
    }
}

/// Decode payload bytes as 7-bit ASCII. Any byte above 0x7F is rejected
/// rather than read as part of a multi-byte sequence.
pub fn decode_payload(table: &str, bytes: Vec<u8>) -> ManifestResult<String> {
    if let Some(offset) = bytes.iter().position(|b| !b.is_ascii()) {
        return Err(ManifestError::Decode {
            table: table.to_string(),
            reason: format!(
                "byte 0x{:02x} at offset {} is outside 7-bit ASCII",
                bytes[offset], offset
            ),
        });
    }

    String::from_utf8(bytes).map_err(|e| ManifestError::Decode {
        table: table.to_string(),
        reason: e.to_string(),
    })
}

/// Grave accents, unlike double quotes, never fall back to a string literal
/// when no such column exists.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
