#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Transactional reconciliation orchestrator.
//!
//! One invocation moves through a fixed lifecycle: plan the wave, observe the
//! selection box, budget, filter, classify, and either report the staged diff
//! (dry run) or check the confirm token and apply the mutations. Every read
//! and write of an invocation happens inside a single store transaction; a
//! dry run always rolls that transaction back, so it has zero observable
//! persisted side effects even though it staged everything a commit would.
//!
//! Dry runs and commits return distinct types ([`ReconcilePlan`] versus
//! [`ReconcileApplied`]) so callers cannot mistake a staged report for an
//! applied one.

mod confirm;

pub use confirm::ConfirmToken;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use spawn_warden_core::store::{SpawnCache, SpawnStore, SpawnTransaction, StoreError};
use spawn_warden_core::{
    ApplyDiff, BudgetReport, CapSet, CellBounds, Epoch, OwnerKind, PlacementIntent, Position,
    ShardId, SpawnId, SpawnRecord, ThemeTable, WipeSelection,
};
use spawn_warden_system_budget as budget;
use spawn_warden_system_classifier::{classify, ClassifyInput};
use spawn_warden_system_planner as planner;
use spawn_warden_system_wipe as wipe;

pub use planner::{PlanError, PlanParams};

/// Maximum number of identifiers surfaced in a protected-records preview.
pub const PROTECTED_PREVIEW_LIMIT: usize = 75;

/// Parameters of one reconciliation invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// Shard the wave reconciles against.
    pub shard: ShardId,
    /// World seed string the planner derives its stream from.
    pub seed: String,
    /// Epoch counter of the wave.
    pub epoch: Epoch,
    /// Theme governing the prototype pool.
    pub theme: String,
    /// Cell-grid region the wave places into.
    pub bounds: CellBounds,
    /// Side length of one grid cell in world units.
    pub cell_size: f64,
    /// Interior shrink applied to each cell before sampling positions.
    pub border_inset: f64,
    /// Outward padding of the selection box in world units.
    pub margin: f64,
    /// Desired number of placements.
    pub count: u32,
    /// Preserve existing records (append) or delete them first (replace).
    pub append: bool,
    /// Overwrite records whose identifier a new intent reproduces.
    pub update_existing: bool,
    /// Allow mutation of locked or operator-owned records.
    pub override_protected: bool,
    /// Ceilings bounding this run.
    pub caps: CapSet,
    /// Kind tag stamped onto materialized records and used to scope the
    /// selection box.
    pub kind: String,
    /// Archetype tag stamped onto materialized records.
    pub archetype: String,
    /// Optional region reference stamped onto materialized records.
    pub region: Option<String>,
    /// Optional tier stamped onto materialized records.
    pub tier: Option<u32>,
}

/// Parameters of one wipe invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WipeRequest {
    /// Shard the wipe selects from.
    pub shard: ShardId,
    /// Cell-grid region confining the selection.
    pub bounds: CellBounds,
    /// Side length of one grid cell in world units.
    pub cell_size: f64,
    /// Outward padding of the selection box in world units.
    pub margin: f64,
    /// Optional theme criterion.
    pub theme: Option<String>,
    /// Optional epoch criterion.
    pub epoch: Option<Epoch>,
    /// Allow deletion of locked records.
    pub override_protected: bool,
}

/// Size-limited preview of records excluded by ownership or lock protection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedPreview {
    /// Total number of protected exclusions.
    pub count: u32,
    /// Leading excluded identifiers, capped at [`PROTECTED_PREVIEW_LIMIT`].
    pub preview: Vec<SpawnId>,
    /// Whether the preview was cut short.
    pub truncated: bool,
}

impl ProtectedPreview {
    fn from_ids(mut ids: Vec<SpawnId>) -> Self {
        let count = ids.len() as u32;
        let truncated = ids.len() > PROTECTED_PREVIEW_LIMIT;
        ids.truncate(PROTECTED_PREVIEW_LIMIT);
        Self {
            count,
            preview: ids,
            truncated,
        }
    }
}

/// Staged diff of a reconciliation dry run. Nothing has been persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    /// Existing in-box records a replace-mode commit would delete.
    pub would_delete: u32,
    /// New records a commit would insert.
    pub would_insert: u32,
    /// Existing records a commit would overwrite.
    pub would_update: u32,
    /// Intents left untouched because their record exists and updates are
    /// disabled.
    pub would_skip: u32,
    /// Intents dropped as duplicates within the wave.
    pub duplicates: u32,
    /// New intents dropped because the insertion budget ran out.
    pub dropped_over_budget: u32,
    /// Budget accounting behind the insertion allowance.
    pub budget: BudgetReport,
    /// Protected records excluded from mutation.
    pub protected: ProtectedPreview,
    /// Token required to commit; present when the commit would delete.
    pub confirm: Option<ConfirmToken>,
}

/// Counts of the mutations a committed reconciliation actually applied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileApplied {
    /// Records deleted.
    pub deleted: u32,
    /// Records inserted.
    pub inserted: u32,
    /// Records overwritten.
    pub updated: u32,
    /// Intents skipped because their record exists and updates are disabled.
    pub skipped: u32,
    /// Protected records excluded from mutation.
    pub protected: ProtectedPreview,
}

/// Staged wipe selection. Nothing has been persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WipePlan {
    /// Identifiers matching the wipe criteria.
    pub selection: WipeSelection,
    /// Matching records excluded by protection.
    pub protected: ProtectedPreview,
    /// Token required to commit; present when the wipe would delete.
    pub confirm: Option<ConfirmToken>,
}

/// Counts of a committed wipe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeApplied {
    /// Records deleted.
    pub deleted: u32,
    /// Matching records excluded by protection.
    pub protected: ProtectedPreview,
}

/// Failures surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The planner rejected the request before any I/O happened.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// The persistence collaborator failed; the batch was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A destructive commit arrived without a confirm token.
    #[error("destructive commit requires confirm token {expected}")]
    ConfirmRequired {
        /// Token the caller must echo to proceed.
        expected: ConfirmToken,
    },
    /// A destructive commit arrived with the wrong confirm token.
    #[error("confirm token mismatch: expected {expected}, got {supplied:?}")]
    ConfirmMismatch {
        /// Token the caller must echo to proceed.
        expected: ConfirmToken,
        /// Token the caller supplied instead.
        supplied: String,
    },
}

/// Orchestrates reconciliation runs against injected collaborators.
///
/// The store and cache handles are passed in explicitly; there is no ambient
/// singleton. A reconciler is cheap to construct per invocation.
pub struct Reconciler<'a, S: SpawnStore, C: SpawnCache> {
    store: &'a mut S,
    cache: &'a mut C,
    themes: &'a ThemeTable,
}

impl<'a, S: SpawnStore, C: SpawnCache> Reconciler<'a, S, C> {
    /// Creates a reconciler over the provided collaborators.
    pub fn new(store: &'a mut S, cache: &'a mut C, themes: &'a ThemeTable) -> Self {
        Self {
            store,
            cache,
            themes,
        }
    }

    /// Produces the wave's placement intents without touching the store.
    pub fn plan_wave(
        &self,
        request: &ReconcileRequest,
    ) -> Result<Vec<PlacementIntent>, ReconcileError> {
        Ok(planner::plan(&plan_params(request), self.themes)?)
    }

    /// Stages a full reconciliation and reports the diff without persisting
    /// anything.
    pub fn dry_run(&mut self, request: &ReconcileRequest) -> Result<ReconcilePlan, ReconcileError> {
        let intents = planner::plan(&plan_params(request), self.themes)?;
        let txn = self.store.begin()?;
        let staged = match stage_wave(&*txn, request, intents, self.themes) {
            Ok(staged) => staged,
            Err(err) => {
                txn.rollback()?;
                return Err(err.into());
            }
        };
        txn.rollback()?;
        debug!(
            shard = %request.shard,
            theme = %request.theme,
            epoch = %request.epoch,
            would_insert = staged.diff.would_insert,
            would_delete = staged.diff.would_delete,
            "reconcile dry-run staged"
        );
        Ok(plan_report(request, staged))
    }

    /// Applies a reconciliation inside one transaction.
    ///
    /// A commit that would delete at least one record demands the matching
    /// confirm token; on mismatch or absence nothing is mutated. The cache is
    /// invalidated exactly once after a successful commit.
    pub fn commit(
        &mut self,
        request: &ReconcileRequest,
        confirm: Option<&str>,
    ) -> Result<ReconcileApplied, ReconcileError> {
        let intents = planner::plan(&plan_params(request), self.themes)?;
        let mut txn = self.store.begin()?;
        let staged = match stage_wave(&*txn, request, intents, self.themes) {
            Ok(staged) => staged,
            Err(err) => {
                txn.rollback()?;
                return Err(err.into());
            }
        };

        if staged.diff.would_delete > 0 {
            let expected = wave_token(request);
            match confirm {
                Some(supplied) if expected.matches(supplied) => {}
                Some(supplied) => {
                    txn.rollback()?;
                    warn!(shard = %request.shard, "destructive commit rejected: token mismatch");
                    return Err(ReconcileError::ConfirmMismatch {
                        expected,
                        supplied: supplied.to_owned(),
                    });
                }
                None => {
                    txn.rollback()?;
                    warn!(shard = %request.shard, "destructive commit rejected: token missing");
                    return Err(ReconcileError::ConfirmRequired { expected });
                }
            }
        }

        match apply_wave_mutations(txn.as_mut(), request, &staged) {
            Ok((deleted, inserted, updated)) => {
                txn.commit()?;
                self.cache.invalidate();
                info!(
                    shard = %request.shard,
                    theme = %request.theme,
                    deleted,
                    inserted,
                    updated,
                    "reconcile committed"
                );
                Ok(ReconcileApplied {
                    deleted,
                    inserted,
                    updated,
                    skipped: staged.diff.would_skip + staged.skipped_existing,
                    protected: ProtectedPreview::from_ids(staged.protected.into_iter().collect()),
                })
            }
            Err(err) => {
                txn.rollback()?;
                warn!(shard = %request.shard, error = %err, "reconcile rolled back");
                Err(err.into())
            }
        }
    }

    /// Stages a wipe and reports the selection without persisting anything.
    pub fn wipe_dry_run(&mut self, request: &WipeRequest) -> Result<WipePlan, ReconcileError> {
        let txn = self.store.begin()?;
        let staged = match stage_wipe(&*txn, request, self.themes) {
            Ok(staged) => staged,
            Err(err) => {
                txn.rollback()?;
                return Err(err.into());
            }
        };
        txn.rollback()?;
        debug!(
            shard = %request.shard,
            selected = staged.selection.count,
            "wipe dry-run staged"
        );
        Ok(wipe_report(request, staged))
    }

    /// Deletes the wipe selection inside one transaction, under the same
    /// confirm-token discipline as a reconciliation commit.
    pub fn wipe_commit(
        &mut self,
        request: &WipeRequest,
        confirm: Option<&str>,
    ) -> Result<WipeApplied, ReconcileError> {
        let mut txn = self.store.begin()?;
        let staged = match stage_wipe(&*txn, request, self.themes) {
            Ok(staged) => staged,
            Err(err) => {
                txn.rollback()?;
                return Err(err.into());
            }
        };

        // An empty selection has nothing to make durable; finish without
        // committing so the cache stays warm.
        if staged.delete_ids.is_empty() {
            txn.rollback()?;
            return Ok(WipeApplied {
                deleted: 0,
                protected: ProtectedPreview::from_ids(staged.protected),
            });
        }

        let expected = wipe_token(request);
        match confirm {
            Some(supplied) if expected.matches(supplied) => {}
            Some(supplied) => {
                txn.rollback()?;
                return Err(ReconcileError::ConfirmMismatch {
                    expected,
                    supplied: supplied.to_owned(),
                });
            }
            None => {
                txn.rollback()?;
                return Err(ReconcileError::ConfirmRequired { expected });
            }
        }

        match txn.delete(&request.shard, &staged.delete_ids) {
            Ok(deleted) => {
                txn.commit()?;
                self.cache.invalidate();
                info!(shard = %request.shard, deleted, "wipe committed");
                Ok(WipeApplied {
                    deleted: deleted as u32,
                    protected: ProtectedPreview::from_ids(staged.protected),
                })
            }
            Err(err) => {
                txn.rollback()?;
                Err(err.into())
            }
        }
    }
}

struct Staged {
    kept: Vec<PlacementIntent>,
    existing: BTreeSet<SpawnId>,
    delete_ids: Vec<SpawnId>,
    protected: BTreeSet<SpawnId>,
    duplicates: u32,
    skipped_existing: u32,
    dropped_over_budget: u32,
    budget: BudgetReport,
    diff: ApplyDiff,
}

fn stage_wave(
    txn: &dyn SpawnTransaction,
    request: &ReconcileRequest,
    intents: Vec<PlacementIntent>,
    themes: &ThemeTable,
) -> Result<Staged, StoreError> {
    let area = request.bounds.to_world(request.cell_size, request.margin);
    let in_box: Vec<SpawnRecord> = txn
        .records_in_box(&request.shard, &area)?
        .into_iter()
        .filter(|record| record.kind == request.kind)
        .collect();

    let intent_ids: Vec<SpawnId> = intents.iter().map(|intent| intent.id.clone()).collect();
    let mut existing_records: BTreeMap<SpawnId, SpawnRecord> = BTreeMap::new();
    for record in in_box.iter().cloned() {
        let _ = existing_records.insert(record.id.clone(), record);
    }
    for record in txn.records_by_ids(&request.shard, &intent_ids)? {
        let _ = existing_records.insert(record.id.clone(), record);
    }

    let in_box_ids: Vec<SpawnId> = in_box.iter().map(|record| record.id.clone()).collect();
    let observed = budget::observe_counts(&in_box_ids, &request.theme, request.epoch, themes);
    let budget_report = budget::allowance(observed, request.append, &request.caps);

    // Replace mode deletes the whole in-box population up front, except the
    // records protection carves out. A carved-out record can also be the
    // target of a kept intent below; the set keeps each id counted once.
    let mut delete_ids: Vec<SpawnId> = Vec::new();
    let mut protected: BTreeSet<SpawnId> = BTreeSet::new();
    if !request.append {
        for record in &in_box {
            if record.is_protected() && !request.override_protected {
                let _ = protected.insert(record.id.clone());
            } else {
                delete_ids.push(record.id.clone());
            }
        }
    }

    // Records slated for deletion are gone by the time inserts run, so they
    // no longer count as existing for classification.
    let mut existing: BTreeSet<SpawnId> = existing_records.keys().cloned().collect();
    for id in &delete_ids {
        let _ = existing.remove(id);
    }

    let outcome = budget::filter_plan(
        intents,
        &existing,
        request.update_existing,
        budget_report.allowance,
    );

    let mut kept = Vec::with_capacity(outcome.kept.len());
    for intent in outcome.kept {
        let target_protected = existing.contains(&intent.id)
            && existing_records
                .get(&intent.id)
                .map_or(false, SpawnRecord::is_protected);
        if target_protected && !request.override_protected {
            let _ = protected.insert(intent.id);
        } else {
            kept.push(intent);
        }
    }

    let diff = classify(ClassifyInput {
        intents: &kept,
        existing: &existing,
        existing_in_box: delete_ids.len() as u32,
        append: request.append,
        update_existing: request.update_existing,
    });

    Ok(Staged {
        kept,
        existing,
        delete_ids,
        protected,
        duplicates: outcome.duplicates,
        skipped_existing: outcome.skipped_existing,
        dropped_over_budget: outcome.dropped_over_budget,
        budget: budget_report,
        diff,
    })
}

struct WipeStaged {
    selection: WipeSelection,
    delete_ids: Vec<SpawnId>,
    protected: Vec<SpawnId>,
}

fn stage_wipe(
    txn: &dyn SpawnTransaction,
    request: &WipeRequest,
    themes: &ThemeTable,
) -> Result<WipeStaged, StoreError> {
    let area = request.bounds.to_world(request.cell_size, request.margin);
    let brain: Vec<SpawnRecord> = txn
        .records_in_box(&request.shard, &area)?
        .into_iter()
        .filter(|record| record.owner == OwnerKind::Brain)
        .collect();

    let ids: Vec<SpawnId> = brain.iter().map(|record| record.id.clone()).collect();
    let selection = wipe::select(
        &ids,
        request.theme.as_deref(),
        request.epoch,
        themes,
    );

    let mut by_id: BTreeMap<&str, &SpawnRecord> = BTreeMap::new();
    for record in &brain {
        let _ = by_id.insert(record.id.as_str(), record);
    }

    let mut delete_ids = Vec::new();
    let mut protected = Vec::new();
    for id in &selection.selected {
        let record_protected = by_id
            .get(id.as_str())
            .map_or(false, |record| record.is_protected());
        if record_protected && !request.override_protected {
            protected.push(id.clone());
        } else {
            delete_ids.push(id.clone());
        }
    }

    Ok(WipeStaged {
        selection,
        delete_ids,
        protected,
    })
}

fn apply_wave_mutations(
    txn: &mut dyn SpawnTransaction,
    request: &ReconcileRequest,
    staged: &Staged,
) -> Result<(u32, u32, u32), StoreError> {
    let deleted = txn.delete(&request.shard, &staged.delete_ids)? as u32;
    let mut inserted = 0;
    let mut updated = 0;
    for intent in &staged.kept {
        let record = record_from_intent(request, intent);
        if staged.existing.contains(&intent.id) {
            txn.update(record)?;
            updated += 1;
        } else {
            txn.insert(record)?;
            inserted += 1;
        }
    }
    Ok((deleted, inserted, updated))
}

fn record_from_intent(request: &ReconcileRequest, intent: &PlacementIntent) -> SpawnRecord {
    SpawnRecord {
        id: intent.id.clone(),
        shard: request.shard.clone(),
        kind: request.kind.clone(),
        archetype: request.archetype.clone(),
        prototype: intent.prototype.clone(),
        variant: None,
        position: Position::new(intent.position.x, intent.position.y, intent.position.z),
        region: request.region.clone(),
        tier: request.tier,
        owner: OwnerKind::Brain,
        locked: false,
        created_rev: 0,
        updated_rev: 0,
    }
}

fn plan_params(request: &ReconcileRequest) -> PlanParams {
    PlanParams {
        seed: request.seed.clone(),
        epoch: request.epoch,
        theme: request.theme.clone(),
        bounds: request.bounds,
        cell_size: request.cell_size,
        border_inset: request.border_inset,
        count: request.count,
    }
}

fn plan_report(request: &ReconcileRequest, staged: Staged) -> ReconcilePlan {
    let confirm = (staged.diff.would_delete > 0).then(|| wave_token(request));
    ReconcilePlan {
        would_delete: staged.diff.would_delete,
        would_insert: staged.diff.would_insert,
        would_update: staged.diff.would_update,
        would_skip: staged.diff.would_skip + staged.skipped_existing,
        duplicates: staged.duplicates,
        dropped_over_budget: staged.dropped_over_budget,
        budget: staged.budget,
        protected: ProtectedPreview::from_ids(staged.protected.into_iter().collect()),
        confirm,
    }
}

fn wipe_report(request: &WipeRequest, staged: WipeStaged) -> WipePlan {
    let confirm = (!staged.delete_ids.is_empty()).then(|| wipe_token(request));
    WipePlan {
        selection: staged.selection,
        protected: ProtectedPreview::from_ids(staged.protected),
        confirm,
    }
}

fn wave_token(request: &ReconcileRequest) -> ConfirmToken {
    let description = format!(
        "replace:{}:{}:{}",
        request.kind, request.theme, request.epoch
    );
    confirm::token_for_scope(&request.shard, &request.bounds, &request.caps, &description)
}

fn wipe_token(request: &WipeRequest) -> ConfirmToken {
    let description = format!(
        "wipe:{}:{}",
        request.theme.as_deref().unwrap_or("*"),
        request
            .epoch
            .map_or_else(|| "*".to_owned(), |epoch| epoch.to_string()),
    );
    confirm::token_for_scope(
        &request.shard,
        &request.bounds,
        &CapSet::unbounded(),
        &description,
    )
}
