use super::{DataSource, StoreError, WaitStore};
use crate::sample::{Attraction, QueueStatus, WaitSample, WaitStats};
use crate::timestamp::{TimeWindow, parse_timestamp};
use chrono::Weekday;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use tracing::debug;

/// [`WaitStore`] over the live SQLite database (`entities` + `queue_status`).
///
/// Timestamps are compared through `julianday()` so that `Z`, `+HH:MM` and
/// zone-less values written by different fetcher versions order correctly.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens an existing database. A missing file is an error, never created.
    ///
    /// The connection waits up to `busy_timeout` on locks held by the
    /// ingestion jobs and switches the database to WAL so readers and the
    /// writer do not block each other.
    pub fn open(source: &DataSource) -> Result<Self, StoreError> {
        let open_err = |source_err| StoreError::Open {
            path: source.path.clone(),
            source: source_err,
        };

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&source.path, flags).map_err(open_err)?;
        conn.busy_timeout(source.busy_timeout).map_err(open_err)?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(open_err)?;

        debug!(path = %source.path.display(), journal_mode = %mode, "Opened wait store");
        Ok(Self { conn })
    }

    /// Wraps an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl WaitStore for SqliteStore {
    fn latest_timestamp(&self) -> Result<Option<String>, StoreError> {
        let latest = self
            .conn
            .query_row(
                "SELECT timestamp FROM queue_status
                 WHERE timestamp IS NOT NULL
                 ORDER BY julianday(timestamp) DESC NULLS LAST
                 LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(latest)
    }

    fn samples_in_window(
        &self,
        park: &str,
        window: &TimeWindow,
        max_wait: i64,
    ) -> Result<Vec<WaitSample>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT e.id, e.name, e.park, qs.timestamp, qs.status, qs.wait_minutes
             FROM queue_status qs
             JOIN entities e ON qs.entity_id = e.id
             WHERE e.park = ?1
               AND e.type = 'ATTRACTION'
               AND qs.status = 'OPERATING'
               AND qs.wait_minutes IS NOT NULL
               AND qs.wait_minutes BETWEEN 0 AND ?4
               AND julianday(qs.timestamp) BETWEEN julianday(?2) AND julianday(?3)
             ORDER BY julianday(qs.timestamp) DESC",
        )?;

        let rows = stmt
            .query_map(
                params![park, window.start_str(), window.end_str(), max_wait],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut samples = Vec::with_capacity(rows.len());
        for (id, name, park, raw_ts, status, wait) in rows {
            let timestamp = match parse_timestamp(&raw_ts) {
                Ok(ts) => ts,
                Err(e) => {
                    debug!(attraction_id = %id, error = %e, "Skipping sample with unparseable timestamp");
                    continue;
                }
            };
            samples.push(WaitSample {
                attraction_id: id,
                attraction_name: name,
                park,
                timestamp,
                status: QueueStatus::parse(&status),
                wait_minutes: wait,
            });
        }

        debug!(park, count = samples.len(), "Loaded window samples");
        Ok(samples)
    }

    fn attraction_count(&self, park: &str) -> Result<u32, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE park = ?1 AND type = 'ATTRACTION'",
            [park],
            |row| row.get(0),
        )?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn attractions(&self, park: &str) -> Result<Vec<Attraction>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, name, park FROM entities
             WHERE park = ?1 AND type = 'ATTRACTION'
             ORDER BY name",
        )?;
        let attractions = stmt
            .query_map([park], |row| {
                Ok(Attraction {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    park: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attractions)
    }

    fn wait_stats_matching(
        &self,
        park: &str,
        name_pattern: &str,
        window: &TimeWindow,
    ) -> Result<WaitStats, StoreError> {
        let (avg_wait, count): (Option<f64>, i64) = self.conn.query_row(
            "SELECT AVG(qs.wait_minutes), COUNT(*)
             FROM queue_status qs
             JOIN entities e ON qs.entity_id = e.id
             WHERE e.park = ?1
               AND instr(e.name, ?2) > 0
               AND e.type = 'ATTRACTION'
               AND qs.status = 'OPERATING'
               AND qs.wait_minutes > 0
               AND julianday(qs.timestamp) >= julianday(?3)
               AND julianday(qs.timestamp) < julianday(?4)",
            params![park, name_pattern, window.start_str(), window.end_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(WaitStats {
            avg_wait,
            data_points: u32::try_from(count).unwrap_or(u32::MAX),
        })
    }

    fn average_wait_by_attraction(
        &self,
        park: &str,
        window: &TimeWindow,
    ) -> Result<HashMap<String, f64>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT e.id, AVG(qs.wait_minutes)
             FROM queue_status qs
             JOIN entities e ON qs.entity_id = e.id
             WHERE e.park = ?1
               AND e.type = 'ATTRACTION'
               AND qs.wait_minutes > 0
               AND julianday(qs.timestamp) >= julianday(?2)
               AND julianday(qs.timestamp) < julianday(?3)
             GROUP BY e.id",
        )?;
        let averages = stmt
            .query_map(params![park, window.start_str(), window.end_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(averages)
    }

    fn average_wait_for_slot(
        &self,
        park: &str,
        hours: RangeInclusive<i64>,
        weekday: Weekday,
        window: &TimeWindow,
        max_wait: i64,
    ) -> Result<Option<f64>, StoreError> {
        // strftime('%w') counts from Sunday; shift so Monday = 0 like chrono.
        let avg: Option<f64> = self.conn.query_row(
            "SELECT AVG(qs.wait_minutes)
             FROM queue_status qs
             JOIN entities e ON qs.entity_id = e.id
             WHERE e.park = ?1
               AND e.type = 'ATTRACTION'
               AND qs.status = 'OPERATING'
               AND qs.wait_minutes > 0
               AND qs.wait_minutes <= ?7
               AND CAST(strftime('%H', qs.timestamp) AS INTEGER) BETWEEN ?2 AND ?3
               AND (CAST(strftime('%w', qs.timestamp) AS INTEGER) + 6) % 7 = ?4
               AND julianday(qs.timestamp) >= julianday(?5)
               AND julianday(qs.timestamp) < julianday(?6)",
            params![
                park,
                hours.start(),
                hours.end(),
                weekday.num_days_from_monday(),
                window.start_str(),
                window.end_str(),
                max_wait,
            ],
            |row| row.get(0),
        )?;
        Ok(avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{StoreBuilder, ts};
    use chrono::Duration;

    #[test]
    fn test_latest_timestamp_empty_and_populated() {
        let store = StoreBuilder::new().build();
        assert_eq!(store.latest_timestamp().unwrap(), None);

        let store = StoreBuilder::new()
            .attraction("a", "Test Track", "Epcot")
            .sample("a", "2025-07-02T13:00:00Z", "OPERATING", Some(20))
            .sample("a", "2025-07-02T14:00:00Z", "OPERATING", Some(25))
            .sample("a", "2025-07-02T10:30:00-04:00", "OPERATING", Some(30))
            .build();
        // 10:30-04:00 is 14:30Z, later than the Z-suffixed rows.
        assert_eq!(
            store.latest_timestamp().unwrap().as_deref(),
            Some("2025-07-02T10:30:00-04:00")
        );
    }

    #[test]
    fn test_samples_in_window_filters_status_range_and_time() {
        let store = StoreBuilder::new()
            .attraction("a", "Test Track", "Epcot")
            .attraction("b", "Soarin'", "Epcot")
            .attraction("c", "Space Mountain", "Magic Kingdom")
            .sample("a", "2025-07-02T14:00:00Z", "OPERATING", Some(40))
            .sample("a", "2025-07-02T13:55:00+00:00", "DOWN", Some(0))
            .sample("b", "2025-07-02T10:05:00-04:00", "OPERATING", Some(500))
            .sample("b", "2025-07-02T14:09:00", "OPERATING", Some(30))
            .sample("b", "2025-07-02T15:00:00Z", "OPERATING", Some(35))
            .sample("c", "2025-07-02T14:00:00Z", "OPERATING", Some(60))
            .build();

        let window = TimeWindow::around(ts("2025-07-02T14:00:00Z"), 10).unwrap();
        let samples = store.samples_in_window("Epcot", &window, 300).unwrap();

        let waits: Vec<(String, Option<i64>)> = samples
            .iter()
            .map(|s| (s.attraction_id.clone(), s.wait_minutes))
            .collect();
        assert_eq!(
            waits,
            vec![("b".to_string(), Some(30)), ("a".to_string(), Some(40))]
        );
        assert!(samples.iter().all(|s| s.status == QueueStatus::Operating));
    }

    #[test]
    fn test_mixed_zone_formats_compare_as_instants() {
        let store = StoreBuilder::new()
            .attraction("a", "Test Track", "Epcot")
            .sample("a", "2025-07-02T10:05:00-04:00", "OPERATING", Some(15))
            .build();

        let window = TimeWindow::around(ts("2025-07-02T14:00:00Z"), 10).unwrap();
        let samples = store.samples_in_window("Epcot", &window, 300).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp, ts("2025-07-02T14:05:00Z"));
    }

    #[test]
    fn test_attraction_count_and_catalog() {
        let store = StoreBuilder::new()
            .attraction("a", "Test Track", "Epcot")
            .attraction("b", "Soarin'", "Epcot")
            .restaurant("r", "Space 220", "Epcot")
            .build();

        assert_eq!(store.attraction_count("Epcot").unwrap(), 2);
        assert_eq!(store.attraction_count("Nowhere").unwrap(), 0);
        let names: Vec<String> = store
            .attractions("Epcot")
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Soarin'", "Test Track"]);
    }

    #[test]
    fn test_wait_stats_matching_is_case_sensitive_substring() {
        let at = ts("2025-07-02T14:00:00Z");
        let store = StoreBuilder::new()
            .attraction("a", "Test Track Presented by Chevrolet", "Epcot")
            .sample_at("a", at - Duration::days(1), "OPERATING", Some(30))
            .sample_at("a", at - Duration::days(2), "OPERATING", Some(50))
            .sample_at("a", at - Duration::days(3), "OPERATING", Some(0))
            .sample_at("a", at - Duration::days(9), "OPERATING", Some(90))
            .build();

        let window = TimeWindow::trailing(at, 7, at).unwrap();
        let stats = store.wait_stats_matching("Epcot", "Test Track", &window).unwrap();
        assert_eq!(stats.data_points, 2);
        assert_eq!(stats.avg_wait, Some(40.0));

        let none = store.wait_stats_matching("Epcot", "test track", &window).unwrap();
        assert_eq!(none.data_points, 0);
        assert_eq!(none.avg_wait, None);
    }

    #[test]
    fn test_slot_average_uses_monday_first_weekdays() {
        // 2025-06-30 is a Monday.
        let store = StoreBuilder::new()
            .attraction("a", "Test Track", "Epcot")
            .sample("a", "2025-06-30T14:00:00Z", "OPERATING", Some(20))
            .sample("a", "2025-06-30T15:30:00Z", "OPERATING", Some(40))
            .sample("a", "2025-06-30T17:00:00Z", "OPERATING", Some(90))
            .sample("a", "2025-06-29T14:00:00Z", "OPERATING", Some(70))
            .build();

        let at = ts("2025-07-14T14:00:00Z");
        let window = TimeWindow::trailing(at, 28, at - Duration::days(1)).unwrap();
        let avg = store
            .average_wait_for_slot("Epcot", 13..=15, Weekday::Mon, &window, 300)
            .unwrap();
        assert_eq!(avg, Some(30.0));

        let sunday = store
            .average_wait_for_slot("Epcot", 13..=15, Weekday::Sun, &window, 300)
            .unwrap();
        assert_eq!(sunday, Some(70.0));
    }

    #[test]
    fn test_queries_fail_without_schema() {
        let store = StoreBuilder::without_schema().build();
        assert!(matches!(store.latest_timestamp(), Err(StoreError::Query(_))));
    }

    #[test]
    fn test_open_missing_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource::new(dir.path().join("absent.db"));
        assert!(matches!(
            SqliteStore::open(&source),
            Err(StoreError::Open { .. })
        ));
        assert!(!dir.path().join("absent.db").exists());
    }
}
