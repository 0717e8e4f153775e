//! Durable key-value store backing the schedule engine: one SQLite table
//! standing in for the embedded KV bucket named `ytfeed` in the original.

use crate::error::ScheduleError;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub struct ScheduleStore {
    conn: Mutex<Connection>,
}

impl ScheduleStore {
    pub fn open(path: &Path) -> Result<Self, ScheduleError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(1))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch("PRAGMA integrity_check;")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schedule (
                key BLOB PRIMARY KEY,
                run_at TEXT NOT NULL,
                data TEXT NOT NULL
            )",
            [],
        )?;
        Ok(ScheduleStore { conn: Mutex::new(conn) })
    }

    pub fn put(&self, key: &[u8], run_at: &str, data: &str) -> Result<(), ScheduleError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO schedule (key, run_at, data) VALUES (?1, ?2, ?3)",
            params![key, run_at, data],
        )?;
        Ok(())
    }

    pub fn scan(&self) -> Result<Vec<(Vec<u8>, String, String)>, ScheduleError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key, run_at, data FROM schedule")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Vec<u8>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_many(&self, keys: &[Vec<u8>]) -> Result<(), ScheduleError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM schedule WHERE key = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_scan_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::open(&dir.path().join("schedule.sqlite3")).unwrap();

        store.put(b"url-a", "2024-01-01T00:00:00Z", "{}").unwrap();
        let rows = store.scan().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, b"url-a");

        store.delete_many(&[b"url-a".to_vec()]).unwrap();
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn put_overwrites_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::open(&dir.path().join("schedule.sqlite3")).unwrap();

        store.put(b"url-a", "2024-01-01T00:00:00Z", "{\"n\":1}").unwrap();
        store.put(b"url-a", "2024-01-02T00:00:00Z", "{\"n\":2}").unwrap();

        let rows = store.scan().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, "2024-01-02T00:00:00Z");
    }
}
