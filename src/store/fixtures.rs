//! In-memory stores for unit tests.

use super::SqliteStore;
use crate::profile::{EngineConfig, EngineParams, ParkProfile, ParkProfiles, TemporalAdjustments};
use crate::timestamp::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

pub(crate) const SCHEMA: &str = "
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

pub(crate) const TEST_PARK: &str = "Test Park";

pub(crate) fn ts(raw: &str) -> DateTime<Utc> {
    parse_timestamp(raw).expect("fixture timestamp")
}

/// One park with baseline 40, a single key attraction pattern, and neutral
/// temporal tables so expected scores are easy to derive by hand.
pub(crate) fn test_config() -> EngineConfig {
    EngineConfig {
        parks: ParkProfiles::new(vec![ParkProfile {
            name: TEST_PARK.to_string(),
            weight_factor: 1.0,
            key_attractions: vec!["Coaster".to_string()],
            baseline_wait_minutes: 40.0,
            peak_multiplier: 4.0,
            capacity_factor: 1.0,
        }]),
        temporal: TemporalAdjustments::neutral(),
        params: EngineParams::default(),
    }
}

pub(crate) struct StoreBuilder {
    conn: Connection,
}

impl StoreBuilder {
    pub(crate) fn new() -> Self {
        let builder = Self::without_schema();
        builder
            .conn
            .execute_batch(SCHEMA)
            .expect("create fixture schema");
        builder
    }

    pub(crate) fn without_schema() -> Self {
        Self {
            conn: Connection::open_in_memory().expect("open in-memory db"),
        }
    }

    pub(crate) fn attraction(self, id: &str, name: &str, park: &str) -> Self {
        self.entity(id, name, "ATTRACTION", park)
    }

    pub(crate) fn restaurant(self, id: &str, name: &str, park: &str) -> Self {
        self.entity(id, name, "RESTAURANT", park)
    }

    fn entity(self, id: &str, name: &str, kind: &str, park: &str) -> Self {
        self.conn
            .execute(
                "INSERT INTO entities (id, name, type, park) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, kind, park],
            )
            .expect("insert entity");
        self
    }

    pub(crate) fn sample(self, entity_id: &str, timestamp: &str, status: &str, wait: Option<i64>) -> Self {
        self.conn
            .execute(
                "INSERT INTO queue_status (entity_id, timestamp, status, wait_minutes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entity_id, timestamp, status, wait],
            )
            .expect("insert sample");
        self
    }

    pub(crate) fn sample_at(
        self,
        entity_id: &str,
        at: DateTime<Utc>,
        status: &str,
        wait: Option<i64>,
    ) -> Self {
        let raw = format_timestamp(&at);
        self.sample(entity_id, &raw, status, wait)
    }

    pub(crate) fn build(self) -> SqliteStore {
        SqliteStore::from_connection(self.conn)
    }
}
