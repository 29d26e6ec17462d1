use serde::{Deserialize, Serialize};

use crate::{
    caps::CapKind,
    grid::{CellCoord, Position},
    ident::{Epoch, SpawnId},
};

/// Proposed spawn placement produced by the planner.
///
/// Intents are ephemeral: they describe a record the wave would like to
/// materialize before it is known whether the identifier already exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementIntent {
    /// Identifier the materialized record would carry.
    pub id: SpawnId,
    /// Grid cell that hosts the placement.
    pub cell: CellCoord,
    /// Sampled world-space position inside the cell interior.
    pub position: Position,
    /// Prototype drawn from the theme's pool.
    pub prototype: String,
    /// Theme of the wave that produced the intent.
    pub theme: String,
    /// Epoch of the wave that produced the intent.
    pub epoch: Epoch,
    /// Index of the intent in planner iteration order.
    pub index: u32,
}

/// Record counts observed inside the selection box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedCounts {
    /// All records of the reconciled kind.
    pub total: u32,
    /// Records matching the wave's theme.
    pub theme: u32,
    /// Records matching both the wave's epoch and theme.
    pub epoch_theme: u32,
}

/// Outcome of evaluating a [`crate::CapSet`] against observed counts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetReport {
    /// Counts observed inside the selection box.
    pub observed: ObservedCounts,
    /// Counts after mode adjustment: zeroed in replace mode because the
    /// existing records die before insertion.
    pub effective: ObservedCounts,
    /// Headroom under the total cap, when that cap is set.
    pub headroom_total: Option<u32>,
    /// Headroom under the theme cap, when that cap is set.
    pub headroom_theme: Option<u32>,
    /// Headroom under the epoch-theme cap, when that cap is set.
    pub headroom_epoch_theme: Option<u32>,
    /// Headroom under the new-per-run cap, when that cap is set.
    pub headroom_new: Option<u32>,
    /// Minimum headroom across all set caps; `None` means unconstrained.
    pub allowance: Option<u32>,
    /// Caps simultaneously binding at the allowance, for operator-facing
    /// explanation only.
    pub binding: Vec<CapKind>,
}

/// Result of the ordered budget pass over planner intents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOutcome {
    /// Intents that survived the pass, in original iteration order.
    pub kept: Vec<PlacementIntent>,
    /// Intents dropped because their identifier repeated within the pass.
    pub duplicates: u32,
    /// Intents dropped because the identifier is persisted and updates are
    /// disabled.
    pub skipped_existing: u32,
    /// New intents dropped because the insertion budget ran out.
    pub dropped_over_budget: u32,
}

/// Dry-run diff of a filtered plan against persisted state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyDiff {
    /// Existing in-box records slated for deletion (replace mode only).
    pub would_delete: u32,
    /// Intents that would insert a new record.
    pub would_insert: u32,
    /// Intents that would update an existing record.
    pub would_update: u32,
    /// Intents targeting an existing record with updates disabled.
    pub would_skip: u32,
    /// Identifiers classified as inserts, in iteration order.
    pub inserts: Vec<SpawnId>,
    /// Identifiers classified as updates, in iteration order.
    pub updates: Vec<SpawnId>,
    /// Identifiers classified as skips, in iteration order.
    pub skips: Vec<SpawnId>,
}

/// Deletion candidates selected by the wipe selector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeSelection {
    /// Identifiers matching the wipe criteria, in input order.
    pub selected: Vec<SpawnId>,
    /// Number of selected identifiers.
    pub count: u32,
}
