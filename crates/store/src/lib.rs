// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pt-store: store-and-forward tables for the packtrace client.
//!
//! Two logical tables are kept per store: *Requests* (deferred outbound
//! calls) and *Responses* (authoritative results of calls that were
//! deferred and later recovered). Both implement the narrow [`Table`]
//! contract. Writers stage changes in a [`Transaction`] of their own,
//! started with `table.begin()`; the table applies a committed batch all
//! or nothing, so callers sharing a store never see or discard each
//! other's staged changes.
//!
//! A store spanning both tables is only best-effort transactional: each
//! table commits on its own, so a failure between the two commits leaves
//! the first one applied. Callers must report that case rather than hide it.

mod error;
pub mod memory;
pub mod sqlite;
pub mod table;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use table::{Change, MemoryTable, Transaction};

use pt_core::{DeferredRequest, RecoverySinglePackResponse};

/// A record keyed and ordered by a unique timestamp.
pub trait Record: Clone + Send + Sync + 'static {
    fn timestamp(&self) -> i64;
}

impl Record for DeferredRequest {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl Record for RecoverySinglePackResponse {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// A transactional table of records.
pub trait Table<R: Record>: Send + Sync {
    /// Returns committed records in ascending timestamp order.
    fn list(&self) -> StoreResult<Vec<R>>;

    /// Returns a fresh timestamp, strictly greater than any handed out before.
    fn current_timestamp(&self) -> StoreResult<i64>;

    /// Applies a batch of changes in order, all or nothing.
    fn commit(&self, changes: &[Change<R>]) -> StoreResult<()>;

    /// Abandons a batch that will not be committed.
    ///
    /// Nothing reaches the built-in tables before commit, so they have
    /// nothing to undo.
    fn rollback(&self, _changes: &[Change<R>]) -> StoreResult<()> {
        Ok(())
    }
}

impl<'t, R: Record> dyn Table<R> + 't {
    /// Starts a transaction owned by the caller.
    pub fn begin(&self) -> Transaction<'_, R> {
        Transaction::new(self)
    }
}

/// The pair of tables backing store-and-forward for one client.
pub trait Store: Send + Sync {
    /// Name shared by every instance using the same backing data.
    fn name(&self) -> &str;

    /// True when no other client instance can see this store's data, in
    /// which case its owner is always the drain leader.
    fn per_instance(&self) -> bool;

    fn requests(&self) -> &dyn Table<DeferredRequest>;

    fn responses(&self) -> &dyn Table<RecoverySinglePackResponse>;

    /// Marks requests as accepted by the remote as part of a recovery batch.
    fn acknowledge_requests(&self, requests: &[DeferredRequest]) -> StoreResult<()>;

    /// Clears the acknowledged flag so the requests are drained again.
    fn release_requests(&self, requests: &[DeferredRequest]) -> StoreResult<()>;
}
