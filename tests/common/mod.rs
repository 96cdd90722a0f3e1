//! File-backed wait store for integration tests.

use park_crowd_index::store::DataSource;
use rusqlite::{Connection, params};
use std::path::PathBuf;
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE entities (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        park TEXT NOT NULL
    );
    CREATE TABLE queue_status (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_id TEXT NOT NULL,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
        status TEXT,
        wait_minutes INTEGER
    );
";

pub struct TestDb {
    dir: TempDir,
    path: PathBuf,
    conn: Connection,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("live.db");
        let conn = Connection::open(&path).expect("create test db");
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .expect("enable WAL");
        conn.execute_batch(SCHEMA).expect("create schema");
        Self { dir, path, conn }
    }

    pub fn attraction(&self, id: &str, name: &str, park: &str) -> &Self {
        self.conn
            .execute(
                "INSERT INTO entities (id, name, type, park) VALUES (?1, ?2, 'ATTRACTION', ?3)",
                params![id, name, park],
            )
            .expect("insert attraction");
        self
    }

    pub fn sample(&self, entity_id: &str, timestamp: &str, status: &str, wait: Option<i64>) -> &Self {
        self.conn
            .execute(
                "INSERT INTO queue_status (entity_id, timestamp, status, wait_minutes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entity_id, timestamp, status, wait],
            )
            .expect("insert sample");
        self
    }

    pub fn source(&self) -> DataSource {
        DataSource::new(&self.path)
    }

    /// A path in the same temp dir that does not exist yet.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
