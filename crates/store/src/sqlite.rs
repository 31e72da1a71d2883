// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed store.
//!
//! Both tables live in one database file and share one connection. Each
//! committed batch runs inside its own SQLite transaction, so a commit is
//! atomic per table but not across the two.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex};

use pt_core::{DeferredRequest, RecoverySinglePackResponse, Registry, SequenceClock};

use crate::error::{StoreError, StoreResult};
use crate::table::Change;
use crate::{Record, Store, Table};

/// SQL schema for the store-and-forward tables.
pub const SCHEMA: &str = r#"
-- Deferred outbound calls, oldest first
CREATE TABLE IF NOT EXISTS requests (
    timestamp INTEGER PRIMARY KEY,
    data TEXT NOT NULL
);

-- Recovered results awaiting collection by the application
CREATE TABLE IF NOT EXISTS responses (
    timestamp INTEGER PRIMARY KEY,
    data TEXT NOT NULL
);
"#;

type Shared = Arc<Mutex<Connection>>;

/// One table of a [`SqliteStore`], rows stored as JSON.
pub struct SqliteTable<R> {
    conn: Shared,
    table: &'static str,
    clock: Arc<SequenceClock>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record + Serialize + DeserializeOwned> SqliteTable<R> {
    fn new(conn: Shared, table: &'static str, clock: Arc<SequenceClock>) -> Self {
        SqliteTable {
            conn,
            table,
            clock,
            _record: PhantomData,
        }
    }

    fn max_timestamp(&self) -> StoreResult<Option<i64>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let max = conn.query_row(
            &format!("SELECT MAX(timestamp) FROM {}", self.table),
            [],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    }

    /// Rewrites committed records in one transaction. Fails without writing
    /// anything if any timestamp is absent.
    fn update_each(&self, timestamps: &[i64], f: impl Fn(&mut R)) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        for &timestamp in timestamps {
            let data: Option<String> = tx
                .query_row(
                    &format!("SELECT data FROM {} WHERE timestamp = ?1", self.table),
                    params![timestamp],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(data) = data else {
                return Err(StoreError::RecordNotFound(timestamp));
            };
            let mut record: R = serde_json::from_str(&data)?;
            f(&mut record);
            tx.execute(
                &format!("UPDATE {} SET data = ?1 WHERE timestamp = ?2", self.table),
                params![serde_json::to_string(&record)?, timestamp],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl<R: Record + Serialize + DeserializeOwned> Table<R> for SqliteTable<R> {
    fn list(&self) -> StoreResult<Vec<R>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(&format!(
            "SELECT data FROM {} ORDER BY timestamp",
            self.table
        ))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(StoreError::from))
            .collect()
    }

    fn current_timestamp(&self) -> StoreResult<i64> {
        Ok(self.clock.next())
    }

    fn commit(&self, changes: &[Change<R>]) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        // Dropping the transaction on an early return rolls it back.
        let tx = conn.transaction()?;
        for change in changes {
            match change {
                Change::Add(record) => {
                    let inserted = tx.execute(
                        &format!(
                            "INSERT OR IGNORE INTO {} (timestamp, data) VALUES (?1, ?2)",
                            self.table
                        ),
                        params![record.timestamp(), serde_json::to_string(record)?],
                    )?;
                    if inserted == 0 {
                        return Err(StoreError::DuplicateTimestamp(record.timestamp()));
                    }
                }
                Change::Remove(timestamp) => {
                    let deleted = tx.execute(
                        &format!("DELETE FROM {} WHERE timestamp = ?1", self.table),
                        params![timestamp],
                    )?;
                    if deleted == 0 {
                        return Err(StoreError::RecordNotFound(*timestamp));
                    }
                }
            }
        }
        tx.commit()?;
        tracing::debug!(table = self.table, changes = changes.len(), "committed");
        Ok(())
    }
}

/// A store persisted in a SQLite database file.
pub struct SqliteStore {
    name: String,
    per_instance: bool,
    requests: SqliteTable<DeferredRequest>,
    responses: SqliteTable<RecoverySinglePackResponse>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// Clients opening the same file should pass the same `name` and
    /// registry so they share one sequence clock and one drain leader.
    pub fn open(path: &Path, name: impl Into<String>, registry: &Registry) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        let name = name.into();
        let clock = registry.clock(&name);
        Self::build(conn, name, false, clock)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::build(
            conn,
            "sqlite-memory".to_string(),
            true,
            Arc::new(SequenceClock::new()),
        )
    }

    fn build(
        conn: Connection,
        name: String,
        per_instance: bool,
        clock: Arc<SequenceClock>,
    ) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        let conn = Arc::new(Mutex::new(conn));
        let store = SqliteStore {
            name,
            per_instance,
            requests: SqliteTable::new(Arc::clone(&conn), "requests", Arc::clone(&clock)),
            responses: SqliteTable::new(conn, "responses", Arc::clone(&clock)),
        };

        // Resume above anything written by an earlier process.
        for max in [
            store.requests.max_timestamp()?,
            store.responses.max_timestamp()?,
        ]
        .into_iter()
        .flatten()
        {
            clock.observe(max);
        }
        Ok(store)
    }
}

impl Store for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn per_instance(&self) -> bool {
        self.per_instance
    }

    fn requests(&self) -> &dyn Table<DeferredRequest> {
        &self.requests
    }

    fn responses(&self) -> &dyn Table<RecoverySinglePackResponse> {
        &self.responses
    }

    fn acknowledge_requests(&self, requests: &[DeferredRequest]) -> StoreResult<()> {
        let stamps: Vec<i64> = requests.iter().map(|r| r.timestamp).collect();
        self.requests.update_each(&stamps, |r| r.acknowledged = true)
    }

    fn release_requests(&self, requests: &[DeferredRequest]) -> StoreResult<()> {
        let stamps: Vec<i64> = requests.iter().map(|r| r.timestamp).collect();
        self.requests.update_each(&stamps, |r| r.acknowledged = false)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
