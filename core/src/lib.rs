#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Spawn Warden engine.
//!
//! This crate defines the data surface that connects the pure placement
//! systems, the reconciliation orchestrator, and the persistence adapters.
//! Systems consume immutable inputs and produce report values; the
//! orchestrator threads those reports through the [`store`] ports. Nothing in
//! this crate performs I/O.

mod caps;
mod grid;
mod ident;
mod record;
mod report;
pub mod store;
mod theme;

pub use caps::{CapKind, CapSet};
pub use grid::{BoundsParseError, CellBounds, CellCoord, Position, WorldBox};
pub use ident::{Epoch, ParsedSpawnId, SpawnId, BRAIN_SCHEME};
pub use record::{OwnerKind, ShardId, SpawnRecord};
pub use report::{
    ApplyDiff, BudgetReport, FilterOutcome, ObservedCounts, PlacementIntent, WipeSelection,
};
pub use theme::ThemeTable;
