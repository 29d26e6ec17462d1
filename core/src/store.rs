//! Ports onto the persistence and cache collaborators.
//!
//! The reconciliation core never talks to a concrete database; it consumes
//! these traits. The in-memory reference adapter lives in
//! `spawn-warden-world`. A transaction must be finished explicitly with
//! [`SpawnTransaction::commit`] or [`SpawnTransaction::rollback`]; dropping
//! one without committing must behave like a rollback.
//!
//! Concurrent reconciliation over overlapping bounds is an operational
//! single-writer discipline: [`SpawnStore::begin`] takes `&mut self`, so two
//! in-process runs cannot interleave on one store handle, but no cross-process
//! lease is provided here.

use thiserror::Error;

use crate::{
    grid::WorldBox,
    ident::SpawnId,
    record::{ShardId, SpawnRecord},
};

/// Persistence collaborator capable of opening transactions.
pub trait SpawnStore {
    /// Begins a transaction covering all reads and writes of one
    /// reconciliation invocation.
    fn begin(&mut self) -> Result<Box<dyn SpawnTransaction + '_>, StoreError>;
}

/// One open transaction against the persisted spawn records.
pub trait SpawnTransaction {
    /// Fetches every record of a shard whose position lies inside the box.
    fn records_in_box(&self, shard: &ShardId, area: &WorldBox)
        -> Result<Vec<SpawnRecord>, StoreError>;

    /// Fetches the records of a shard carrying any of the given identifiers.
    fn records_by_ids(
        &self,
        shard: &ShardId,
        ids: &[SpawnId],
    ) -> Result<Vec<SpawnRecord>, StoreError>;

    /// Inserts a new record; fails if the identifier already exists.
    fn insert(&mut self, record: SpawnRecord) -> Result<(), StoreError>;

    /// Overwrites an existing record; fails if the identifier is absent.
    fn update(&mut self, record: SpawnRecord) -> Result<(), StoreError>;

    /// Deletes the records carrying the given identifiers, returning how many
    /// rows were removed.
    fn delete(&mut self, shard: &ShardId, ids: &[SpawnId]) -> Result<usize, StoreError>;

    /// Makes every buffered mutation durable.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards every buffered mutation.
    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Read-through cache collaborator invalidated after successful commits.
pub trait SpawnCache {
    /// Drops every cached spawn record.
    fn invalidate(&mut self);
}

/// Failures surfaced by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert collided with an existing identifier.
    #[error("record already exists: {0}")]
    DuplicateId(SpawnId),
    /// An update targeted an identifier that is not persisted.
    #[error("record not found: {0}")]
    MissingRecord(SpawnId),
    /// The backend failed; the batch was rolled back.
    #[error("storage backend failure: {0}")]
    Backend(String),
}
