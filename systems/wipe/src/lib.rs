#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wipe selector.
//!
//! Filters an existing identifier set by loosely-parsed theme and epoch
//! criteria to produce a deletion candidate list. Selection only: actual
//! deletion is the transactional applier's job.

use spawn_warden_core::{Epoch, ParsedSpawnId, SpawnId, ThemeTable, WipeSelection};

/// Selects the identifiers matching both optional filters.
///
/// Matching uses the tolerant parser with raw-token fallback, so identifiers
/// lacking a structured theme or epoch field still match when their token
/// list contains the filter value. Supplying no filter selects everything.
#[must_use]
pub fn select<'a, I>(
    ids: I,
    theme: Option<&str>,
    epoch: Option<Epoch>,
    themes: &ThemeTable,
) -> WipeSelection
where
    I: IntoIterator<Item = &'a SpawnId>,
{
    let mut selection = WipeSelection::default();
    for id in ids {
        let parsed = ParsedSpawnId::parse(id.as_str(), themes);
        let theme_ok = theme.map_or(true, |filter| parsed.matches_theme(filter));
        let epoch_ok = epoch.map_or(true, |filter| parsed.matches_epoch(filter));
        if theme_ok && epoch_ok {
            selection.selected.push(id.clone());
            selection.count += 1;
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::select;
    use spawn_warden_core::{Epoch, SpawnId, ThemeTable};

    fn ids(raw: &[&str]) -> Vec<SpawnId> {
        raw.iter().map(|id| SpawnId::new(*id)).collect()
    }

    fn as_strs(selection: &spawn_warden_core::WipeSelection) -> Vec<&str> {
        selection.selected.iter().map(SpawnId::as_str).collect()
    }

    #[test]
    fn filters_by_theme_and_epoch() {
        let themes = ThemeTable::builtin();
        let ids = ids(&[
            "brain:0:goblins:a",
            "brain:1:goblins:b",
            "brain:0:bandits:c",
        ]);
        let selection = select(&ids, Some("goblins"), Some(Epoch::new(0)), &themes);
        assert_eq!(as_strs(&selection), vec!["brain:0:goblins:a"]);
        assert_eq!(selection.count, 1);
    }

    #[test]
    fn no_filters_select_everything() {
        let themes = ThemeTable::builtin();
        let ids = ids(&["brain:0:goblins:a", "brain:3:wolves:b", "odd-one-out"]);
        let selection = select(&ids, None, None, &themes);
        assert_eq!(selection.count, 3);
    }

    #[test]
    fn theme_only_filter_spans_epochs() {
        let themes = ThemeTable::builtin();
        let ids = ids(&[
            "brain:0:goblins:a",
            "brain:1:goblins:b",
            "brain:0:bandits:c",
        ]);
        let selection = select(&ids, Some("goblins"), None, &themes);
        assert_eq!(
            as_strs(&selection),
            vec!["brain:0:goblins:a", "brain:1:goblins:b"]
        );
    }

    #[test]
    fn token_membership_fallback_matches_legacy_ids() {
        let themes = ThemeTable::builtin();
        let ids = ids(&["legacy-goblins-cluster:west", "brain:0:bandits:c"]);
        let selection = select(&ids, Some("goblins"), None, &themes);
        assert_eq!(as_strs(&selection), vec!["legacy-goblins-cluster:west"]);
    }

    #[test]
    fn swapped_fields_still_match() {
        let themes = ThemeTable::builtin();
        let ids = ids(&["brain:goblins:2:0_0:0:grunt"]);
        let selection = select(&ids, Some("goblins"), Some(Epoch::new(2)), &themes);
        assert_eq!(selection.count, 1);
    }
}
