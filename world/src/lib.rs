#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory reference implementation of the spawn store and cache ports.
//!
//! The world keeps every shard as an ordered identifier map. Transactions
//! clone the shard maps on begin, mutate the working copy, and swap it back
//! on commit; rollback simply drops the copy, so a dry run can stage a full
//! mutation batch with zero observable side effects. Audit stamps are
//! monotonic store revisions rather than wall-clock times, which keeps
//! replays deterministic.

use std::collections::BTreeMap;

use spawn_warden_core::store::{SpawnCache, SpawnStore, SpawnTransaction, StoreError};
use spawn_warden_core::{ShardId, SpawnId, SpawnRecord, WorldBox};

type ShardMap = BTreeMap<String, BTreeMap<String, SpawnRecord>>;

/// Authoritative in-memory spawn record store.
#[derive(Clone, Debug, Default)]
pub struct SpawnWorld {
    shards: ShardMap,
    revision: u64,
}

impl SpawnWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a world from previously exported records, preserving their
    /// audit stamps and advancing the revision counter past the largest one.
    #[must_use]
    pub fn from_records(records: Vec<SpawnRecord>) -> Self {
        let mut world = Self::new();
        for record in records {
            world.revision = world.revision.max(record.updated_rev);
            let shard = world
                .shards
                .entry(record.shard.as_str().to_owned())
                .or_default();
            let _ = shard.insert(record.id.as_str().to_owned(), record);
        }
        world
    }

    /// Inserts a record directly, stamping it with the next revision.
    ///
    /// Intended for test fixtures and snapshot loading; reconciliation goes
    /// through transactions instead.
    pub fn seed_record(&mut self, mut record: SpawnRecord) {
        self.revision += 1;
        record.created_rev = self.revision;
        record.updated_rev = self.revision;
        let shard = self
            .shards
            .entry(record.shard.as_str().to_owned())
            .or_default();
        let _ = shard.insert(record.id.as_str().to_owned(), record);
    }

    /// Snapshot of every record in one shard, in identifier order.
    #[must_use]
    pub fn records(&self, shard: &ShardId) -> Vec<SpawnRecord> {
        self.shards
            .get(shard.as_str())
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every record across all shards, in shard then identifier
    /// order.
    #[must_use]
    pub fn all_records(&self) -> Vec<SpawnRecord> {
        self.shards
            .values()
            .flat_map(|records| records.values().cloned())
            .collect()
    }

    /// Looks up one record by shard and identifier.
    #[must_use]
    pub fn record(&self, shard: &ShardId, id: &SpawnId) -> Option<&SpawnRecord> {
        self.shards
            .get(shard.as_str())
            .and_then(|records| records.get(id.as_str()))
    }

    /// Current store revision; every committed mutation advances it.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}

impl SpawnStore for SpawnWorld {
    fn begin(&mut self) -> Result<Box<dyn SpawnTransaction + '_>, StoreError> {
        let working = self.shards.clone();
        let revision = self.revision;
        Ok(Box::new(MemoryTransaction {
            world: self,
            working,
            revision,
        }))
    }
}

/// Clone-on-begin transaction over [`SpawnWorld`].
struct MemoryTransaction<'a> {
    world: &'a mut SpawnWorld,
    working: ShardMap,
    revision: u64,
}

impl SpawnTransaction for MemoryTransaction<'_> {
    fn records_in_box(
        &self,
        shard: &ShardId,
        area: &WorldBox,
    ) -> Result<Vec<SpawnRecord>, StoreError> {
        Ok(self
            .working
            .get(shard.as_str())
            .map(|records| {
                records
                    .values()
                    .filter(|record| area.contains(record.position.x, record.position.z))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn records_by_ids(
        &self,
        shard: &ShardId,
        ids: &[SpawnId],
    ) -> Result<Vec<SpawnRecord>, StoreError> {
        let Some(records) = self.working.get(shard.as_str()) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id.as_str()).cloned())
            .collect())
    }

    fn insert(&mut self, mut record: SpawnRecord) -> Result<(), StoreError> {
        let shard = self
            .working
            .entry(record.shard.as_str().to_owned())
            .or_default();
        if shard.contains_key(record.id.as_str()) {
            return Err(StoreError::DuplicateId(record.id));
        }
        self.revision += 1;
        record.created_rev = self.revision;
        record.updated_rev = self.revision;
        let _ = shard.insert(record.id.as_str().to_owned(), record);
        Ok(())
    }

    fn update(&mut self, mut record: SpawnRecord) -> Result<(), StoreError> {
        let Some(existing) = self
            .working
            .get_mut(record.shard.as_str())
            .and_then(|records| records.get_mut(record.id.as_str()))
        else {
            return Err(StoreError::MissingRecord(record.id));
        };
        self.revision += 1;
        record.created_rev = existing.created_rev;
        record.updated_rev = self.revision;
        *existing = record;
        Ok(())
    }

    fn delete(&mut self, shard: &ShardId, ids: &[SpawnId]) -> Result<usize, StoreError> {
        let Some(records) = self.working.get_mut(shard.as_str()) else {
            return Ok(0);
        };
        let mut removed = 0;
        for id in ids {
            if records.remove(id.as_str()).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.revision += 1;
        }
        Ok(removed)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.world.shards = self.working;
        self.world.revision = self.revision;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Cache collaborator that records how often it was invalidated.
///
/// Stands in for the read-through spawn cache during tests; production
/// deployments inject their own [`SpawnCache`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CountingCache {
    invalidations: u32,
}

impl CountingCache {
    /// Creates a cache with zero recorded invalidations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invalidation signals received.
    #[must_use]
    pub const fn invalidations(&self) -> u32 {
        self.invalidations
    }
}

impl SpawnCache for CountingCache {
    fn invalidate(&mut self) {
        self.invalidations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{CountingCache, SpawnWorld};
    use spawn_warden_core::store::{SpawnCache, SpawnStore, StoreError};
    use spawn_warden_core::{OwnerKind, Position, ShardId, SpawnId, SpawnRecord, WorldBox};

    fn record(id: &str, x: f64, z: f64) -> SpawnRecord {
        SpawnRecord {
            id: SpawnId::new(id),
            shard: ShardId::new("shard-a"),
            kind: "creature".to_owned(),
            archetype: "mob".to_owned(),
            prototype: "goblin_grunt".to_owned(),
            variant: None,
            position: Position::flat(x, z),
            region: None,
            tier: None,
            owner: OwnerKind::Brain,
            locked: false,
            created_rev: 0,
            updated_rev: 0,
        }
    }

    #[test]
    fn committed_inserts_become_visible() {
        let mut world = SpawnWorld::new();
        let shard = ShardId::new("shard-a");

        let mut txn = world.begin().expect("begin");
        txn.insert(record("a", 1.0, 1.0)).expect("insert");
        txn.insert(record("b", 2.0, 2.0)).expect("insert");
        txn.commit().expect("commit");

        assert_eq!(world.records(&shard).len(), 2);
        assert!(world.record(&shard, &SpawnId::new("a")).is_some());
    }

    #[test]
    fn rolled_back_mutations_leave_no_trace() {
        let mut world = SpawnWorld::new();
        world.seed_record(record("a", 1.0, 1.0));
        let shard = ShardId::new("shard-a");
        let before = world.records(&shard);

        let mut txn = world.begin().expect("begin");
        txn.insert(record("b", 2.0, 2.0)).expect("insert");
        let _ = txn.delete(&shard, &[SpawnId::new("a")]).expect("delete");
        txn.rollback().expect("rollback");

        assert_eq!(world.records(&shard), before);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut world = SpawnWorld::new();
        world.seed_record(record("a", 1.0, 1.0));

        let mut txn = world.begin().expect("begin");
        assert!(matches!(
            txn.insert(record("a", 5.0, 5.0)),
            Err(StoreError::DuplicateId(_))
        ));
    }

    #[test]
    fn update_preserves_creation_stamp() {
        let mut world = SpawnWorld::new();
        world.seed_record(record("a", 1.0, 1.0));
        let shard = ShardId::new("shard-a");
        let created = world
            .record(&shard, &SpawnId::new("a"))
            .expect("record")
            .created_rev;

        let mut txn = world.begin().expect("begin");
        txn.update(record("a", 9.0, 9.0)).expect("update");
        txn.commit().expect("commit");

        let updated = world.record(&shard, &SpawnId::new("a")).expect("record");
        assert_eq!(updated.created_rev, created);
        assert!(updated.updated_rev > created);
        assert_eq!(updated.position.x, 9.0);
    }

    #[test]
    fn missing_update_is_rejected() {
        let mut world = SpawnWorld::new();
        let mut txn = world.begin().expect("begin");
        assert!(matches!(
            txn.update(record("ghost", 0.0, 0.0)),
            Err(StoreError::MissingRecord(_))
        ));
    }

    #[test]
    fn box_query_filters_by_position() {
        let mut world = SpawnWorld::new();
        world.seed_record(record("near", 10.0, 10.0));
        world.seed_record(record("far", 500.0, 500.0));
        let shard = ShardId::new("shard-a");

        let txn = world.begin().expect("begin");
        let area = WorldBox {
            min_x: 0.0,
            min_z: 0.0,
            max_x: 100.0,
            max_z: 100.0,
        };
        let inside = txn.records_in_box(&shard, &area).expect("query");
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].id.as_str(), "near");
    }

    #[test]
    fn delete_reports_removed_row_count() {
        let mut world = SpawnWorld::new();
        world.seed_record(record("a", 1.0, 1.0));
        world.seed_record(record("b", 2.0, 2.0));
        let shard = ShardId::new("shard-a");

        let mut txn = world.begin().expect("begin");
        let removed = txn
            .delete(&shard, &[SpawnId::new("a"), SpawnId::new("ghost")])
            .expect("delete");
        assert_eq!(removed, 1);
        txn.commit().expect("commit");
        assert_eq!(world.records(&shard).len(), 1);
    }

    #[test]
    fn counting_cache_tracks_invalidations() {
        let mut cache = CountingCache::new();
        assert_eq!(cache.invalidations(), 0);
        cache.invalidate();
        cache.invalidate();
        assert_eq!(cache.invalidations(), 2);
    }

    #[test]
    fn from_records_resumes_revision_counter() {
        let mut exported = record("a", 1.0, 1.0);
        exported.created_rev = 3;
        exported.updated_rev = 7;
        let mut world = SpawnWorld::from_records(vec![exported]);
        world.seed_record(record("b", 2.0, 2.0));
        let shard = ShardId::new("shard-a");
        let fresh = world.record(&shard, &SpawnId::new("b")).expect("record");
        assert_eq!(fresh.created_rev, 8);
    }
}
