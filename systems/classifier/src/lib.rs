#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Apply-plan classifier.
//!
//! Cross-references filtered placement intents against the set of persisted
//! identifiers to produce the insert/update/skip/delete diff of a dry run.
//! The classifier is pure and idempotent: with unchanged inputs it always
//! yields the same counts, and feeding its own insert list back in as
//! "existing" turns every former insert into a skip (or an update when
//! updates are enabled).

use std::collections::BTreeSet;

use spawn_warden_core::{ApplyDiff, PlacementIntent, SpawnId};

/// Inputs of one classification pass.
#[derive(Clone, Copy, Debug)]
pub struct ClassifyInput<'a> {
    /// Filtered intents, in planner iteration order.
    pub intents: &'a [PlacementIntent],
    /// Identifiers already persisted in the shard.
    pub existing: &'a BTreeSet<SpawnId>,
    /// Number of existing in-box records that replace mode would delete.
    pub existing_in_box: u32,
    /// Whether the run preserves existing records (append) or deletes them
    /// first (replace).
    pub append: bool,
    /// Whether intents targeting persisted identifiers overwrite them.
    pub update_existing: bool,
}

/// Classifies filtered intents into the dry-run diff.
///
/// Deletion accounting depends only on the mode: append deletes nothing,
/// replace deletes the whole in-box count regardless of what the intents
/// propose.
#[must_use]
pub fn classify(input: ClassifyInput<'_>) -> ApplyDiff {
    let mut diff = ApplyDiff {
        would_delete: if input.append {
            0
        } else {
            input.existing_in_box
        },
        ..ApplyDiff::default()
    };

    for intent in input.intents {
        if input.existing.contains(&intent.id) {
            if input.update_existing {
                diff.would_update += 1;
                diff.updates.push(intent.id.clone());
            } else {
                diff.would_skip += 1;
                diff.skips.push(intent.id.clone());
            }
        } else {
            diff.would_insert += 1;
            diff.inserts.push(intent.id.clone());
        }
    }

    diff
}
