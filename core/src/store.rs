//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine calls store methods; subsystems never see the store.

use rusqlite::{Connection, OptionalExtension, params};
use crate::{
    error::SimResult,
    event::EventLogEntry,
    metrics::SimReport,
    types::Minute,
};

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the simulation database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. The default for one-shot runs and tests.
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, config_json: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, config_json, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                seed as i64,
                env!("CARGO_PKG_VERSION"),
                config_json,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Seed recorded for a run, if the run exists.
    pub fn run_seed(&self, run_id: &str) -> SimResult<Option<u64>> {
        let seed = self
            .conn
            .query_row("SELECT seed FROM run WHERE run_id = ?1", params![run_id], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(seed.map(|s| s as u64))
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, tick, subsystem, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.tick as i64,
                entry.subsystem,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, run_id: &str, tick: Minute) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, tick, subsystem, event_type, payload
             FROM event_log WHERE run_id = ?1 AND tick = ?2
             ORDER BY id ASC"
        )?;
        let entries = stmt.query_map(params![run_id, tick as i64], |row| {
            Ok(EventLogEntry {
                id:         Some(row.get(0)?),
                run_id:     row.get(1)?,
                tick:       row.get::<_, i64>(2)? as u64,
                subsystem:  row.get(3)?,
                event_type: row.get(4)?,
                payload:    row.get(5)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str, event_type: &str) -> SimResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, run_id: &str, tick: Minute, state_json: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO snapshot (run_id, tick, state_json) VALUES (?1, ?2, ?3)",
            params![run_id, tick as i64, state_json],
        )?;
        Ok(())
    }

    // ── Report ─────────────────────────────────────────────────

    pub fn save_report(&self, run_id: &str, report: &SimReport) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO report (run_id, report_json, finished_at) VALUES (?1, ?2, ?3)",
            params![run_id, serde_json::to_string(report)?, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_report(&self, run_id: &str) -> SimResult<Option<SimReport>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT report_json FROM report WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SimStore {
        let store = SimStore::in_memory().unwrap();
        store.migrate().unwrap();
        store.insert_run("run-a", 7, "{}").unwrap();
        store
    }

    #[test]
    fn events_come_back_in_insertion_order() {
        let store = store();
        for (i, kind) in ["step_started", "aircraft_entered", "step_completed"].iter().enumerate() {
            store.append_event(&EventLogEntry {
                id:         None,
                run_id:     "run-a".into(),
                tick:       4,
                subsystem:  "engine".into(),
                event_type: kind.to_string(),
                payload:    format!("{{\"n\":{i}}}"),
            }).unwrap();
        }
        let events = store.events_for_tick("run-a", 4).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].event_type, "aircraft_entered");
        assert!(store.events_for_tick("run-a", 5).unwrap().is_empty());
        assert_eq!(store.event_count("run-a", "step_started").unwrap(), 1);
        assert_eq!(store.run_seed("run-a").unwrap(), Some(7));
    }

    #[test]
    fn snapshots_are_unique_per_tick_and_need_a_run() {
        let store = store();
        store.save_snapshot("run-a", 15, "a").unwrap();
        store.save_snapshot("run-a", 30, "b").unwrap();
        assert!(store.save_snapshot("run-a", 15, "again").is_err());
        assert!(store.save_snapshot("unknown-run", 45, "c").is_err());
    }

    #[test]
    fn report_round_trips() {
        let store = store();
        assert!(store.load_report("run-a").unwrap().is_none());
        let report = SimReport { total_arrivals: 3, ..SimReport::default() };
        store.save_report("run-a", &report).unwrap();
        assert_eq!(store.load_report("run-a").unwrap(), Some(report));
    }
}
