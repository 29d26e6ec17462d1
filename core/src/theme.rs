use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Known theme vocabulary and the prototype pool attached to each theme.
///
/// The vocabulary drives tolerant identifier parsing; the pools drive
/// prototype selection during planning. Iteration order is stable so that
/// fallback matching stays deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeTable {
    themes: BTreeMap<String, Vec<String>>,
}

impl ThemeTable {
    /// Creates an empty theme table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the built-in table used by tests and as config fallback.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(
            "goblins",
            ["goblin_grunt", "goblin_archer", "goblin_shaman"],
        );
        table.insert("bandits", ["bandit_scout", "bandit_raider"]);
        table.insert("wolves", ["wolf", "dire_wolf"]);
        table
    }

    /// Registers a theme with its prototype pool, replacing any prior pool.
    pub fn insert<I, S>(&mut self, theme: &str, prototypes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool = prototypes.into_iter().map(Into::into).collect();
        let _ = self.themes.insert(theme.to_owned(), pool);
    }

    /// Reports whether the token exactly matches a known theme.
    #[must_use]
    pub fn is_known(&self, token: &str) -> bool {
        self.themes.contains_key(token)
    }

    /// Retrieves the prototype pool of a theme, if known.
    #[must_use]
    pub fn prototypes(&self, theme: &str) -> Option<&[String]> {
        self.themes.get(theme).map(Vec::as_slice)
    }

    /// Iterates the known theme names in stable order.
    pub fn known(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::ThemeTable;

    #[test]
    fn builtin_table_knows_goblins() {
        let table = ThemeTable::builtin();
        assert!(table.is_known("goblins"));
        assert!(!table.is_known("dragons"));
        let pool = table.prototypes("goblins").expect("pool");
        assert!(pool.contains(&"goblin_grunt".to_owned()));
    }

    #[test]
    fn insert_replaces_existing_pool() {
        let mut table = ThemeTable::new();
        table.insert("goblins", ["a"]);
        table.insert("goblins", ["b", "c"]);
        assert_eq!(table.prototypes("goblins"), Some(&["b".to_owned(), "c".to_owned()][..]));
    }
}
