//! Fixture databases for tests

use rusqlite::{params, Connection};
use std::path::PathBuf;
use tempfile::TempDir;

/// A manifest database on disk, removed when dropped
pub struct Fixture {
    _dir: TempDir,
    pub path: PathBuf,
}

/// Build a database with one `(id, json)` table per entry, in order
pub fn manifest_db(tables: &[(&str, &[&str])]) -> Fixture {
    let rows: Vec<(&str, Vec<&[u8]>)> = tables
        .iter()
        .map(|(name, payloads)| (*name, payloads.iter().map(|p| p.as_bytes()).collect()))
        .collect();
    let borrowed: Vec<(&str, &[&[u8]])> = rows.iter().map(|(n, p)| (*n, p.as_slice())).collect();
    manifest_db_bytes(&borrowed)
}

/// Same as `manifest_db`, with payloads stored as raw blobs
pub fn manifest_db_bytes(tables: &[(&str, &[&[u8]])]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world_sql_content.content");
    let conn = Connection::open(&path).unwrap();

    for (name, payloads) in tables {
        let quoted = format!("\"{}\"", name.replace('"', "\"\""));
        conn.execute(
            &format!("CREATE TABLE {} (id INTEGER PRIMARY KEY, json BLOB)", quoted),
            [],
        )
        .unwrap();
        for &payload in payloads.iter() {
            conn.execute(&format!("INSERT INTO {} (json) VALUES (?1)", quoted), params![payload])
                .unwrap();
        }
    }

    Fixture { _dir: dir, path }
}

/// Open a fixture for extra setup that the helpers don't cover
pub fn connect(fixture: &Fixture) -> Connection {
    Connection::open(&fixture.path).unwrap()
}
