#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Budget accounting and the ordered plan filter.
//!
//! The accountant turns observed record counts and a cap set into a single
//! insertion allowance; the filter spends that allowance over planner intents
//! in one stable pass. Both are side-effect-free: budget exhaustion,
//! duplicates, and skipped records are counted outcomes, never errors.

use std::collections::BTreeSet;

use spawn_warden_core::{
    BudgetReport, CapKind, CapSet, Epoch, FilterOutcome, ObservedCounts, ParsedSpawnId,
    PlacementIntent, SpawnId, ThemeTable,
};

/// Counts the records observed inside the selection box.
///
/// Each identifier goes through the tolerant parser; theme and epoch matches
/// use the structured fields with raw-token fallback.
#[must_use]
pub fn observe_counts<'a, I>(ids: I, theme: &str, epoch: Epoch, themes: &ThemeTable) -> ObservedCounts
where
    I: IntoIterator<Item = &'a SpawnId>,
{
    let mut counts = ObservedCounts::default();
    for id in ids {
        counts.total += 1;
        let parsed = ParsedSpawnId::parse(id.as_str(), themes);
        if parsed.matches_theme(theme) {
            counts.theme += 1;
            if parsed.matches_epoch(epoch) {
                counts.epoch_theme += 1;
            }
        }
    }
    counts
}

/// Evaluates the cap set against observed counts.
///
/// In replace mode the effective counts are zero: the existing records are
/// deleted before insertion, so they no longer occupy cap room. The new-per-
/// run cap bounds insertions directly and is unaffected by existing counts.
#[must_use]
pub fn allowance(observed: ObservedCounts, append: bool, caps: &CapSet) -> BudgetReport {
    let effective = if append {
        observed
    } else {
        ObservedCounts::default()
    };

    let headroom_total = caps.max_total().map(|cap| cap.saturating_sub(effective.total));
    let headroom_theme = caps.max_theme().map(|cap| cap.saturating_sub(effective.theme));
    let headroom_epoch_theme = caps
        .max_epoch_theme()
        .map(|cap| cap.saturating_sub(effective.epoch_theme));
    let headroom_new = caps.max_new();

    let headrooms = [
        (CapKind::Total, headroom_total),
        (CapKind::Theme, headroom_theme),
        (CapKind::EpochTheme, headroom_epoch_theme),
        (CapKind::NewPerRun, headroom_new),
    ];
    let allowance = headrooms
        .iter()
        .filter_map(|(_, headroom)| *headroom)
        .min();
    let binding = match allowance {
        Some(minimum) => headrooms
            .iter()
            .filter(|(_, headroom)| *headroom == Some(minimum))
            .map(|(kind, _)| *kind)
            .collect(),
        None => Vec::new(),
    };

    BudgetReport {
        observed,
        effective,
        headroom_total,
        headroom_theme,
        headroom_epoch_theme,
        headroom_new,
        allowance,
        binding,
    }
}

/// Spends the insertion allowance over planner intents in one ordered pass.
///
/// The pass walks intents in planner order with a seen-set: duplicates drop,
/// persisted identifiers drop (updates off) or keep unconditionally (updates
/// on — updates never consume budget), and new identifiers keep while budget
/// remains. First-seen-wins is a contract: with a smaller allowance the kept
/// new intents form a strict prefix of what a larger allowance would keep,
/// which makes repeated dry-runs over unchanged planner output stable.
#[must_use]
pub fn filter_plan(
    intents: Vec<PlacementIntent>,
    existing: &BTreeSet<SpawnId>,
    update_existing: bool,
    allowance: Option<u32>,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let mut seen: BTreeSet<SpawnId> = BTreeSet::new();
    let mut remaining = allowance;

    for intent in intents {
        if !seen.insert(intent.id.clone()) {
            outcome.duplicates += 1;
            continue;
        }

        if existing.contains(&intent.id) {
            if update_existing {
                outcome.kept.push(intent);
            } else {
                outcome.skipped_existing += 1;
            }
            continue;
        }

        match remaining {
            None => outcome.kept.push(intent),
            Some(0) => outcome.dropped_over_budget += 1,
            Some(budget) => {
                remaining = Some(budget - 1);
                outcome.kept.push(intent);
            }
        }
    }

    outcome
}
