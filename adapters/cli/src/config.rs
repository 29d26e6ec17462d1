use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use spawn_warden_core::{CapSet, ThemeTable};

/// Operator configuration loaded from a TOML file.
///
/// Every field has a default so a missing or sparse file still yields a
/// usable setup; themes listed in the file extend (and can override) the
/// built-in vocabulary.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    /// Side length of one grid cell in world units.
    pub cell_size: f64,
    /// Interior shrink applied to each cell before sampling positions.
    pub border_inset: f64,
    /// Outward padding of the selection box in world units.
    pub margin: f64,
    /// Kind tag stamped onto materialized records.
    pub kind: String,
    /// Archetype tag stamped onto materialized records.
    pub archetype: String,
    /// Raw cap ceilings; absent or non-positive values disable a cap.
    pub caps: RawCaps,
    /// Theme vocabulary extensions, theme name to prototype pool.
    pub themes: BTreeMap<String, Vec<String>>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            cell_size: 24.0,
            border_inset: 2.0,
            margin: 0.0,
            kind: "creature".to_owned(),
            archetype: "mob".to_owned(),
            caps: RawCaps::default(),
            themes: BTreeMap::new(),
        }
    }
}

/// Cap ceilings as written by operators, before sanitization.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawCaps {
    /// Ceiling on total records within bounds.
    pub max_total: Option<i64>,
    /// Ceiling on records of the wave's theme within bounds.
    pub max_theme: Option<i64>,
    /// Ceiling on records of the wave's (epoch, theme) pair.
    pub max_epoch_theme: Option<i64>,
    /// Ceiling on new insertions per run.
    pub max_new: Option<i64>,
}

impl CliConfig {
    /// Loads configuration from `path`, or returns defaults when no path is
    /// given.
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Builds the effective theme vocabulary: built-ins plus the configured
    /// extensions.
    pub(crate) fn theme_table(&self) -> ThemeTable {
        let mut table = ThemeTable::builtin();
        for (theme, pool) in &self.themes {
            table.insert(theme, pool.iter().cloned());
        }
        table
    }

    /// Sanitized cap set for a run.
    pub(crate) fn cap_set(&self) -> CapSet {
        CapSet::from_raw(
            self.caps.max_total,
            self.caps.max_theme,
            self.caps.max_epoch_theme,
            self.caps.max_new,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::CliConfig;

    #[test]
    fn sparse_file_falls_back_to_defaults() {
        let config: CliConfig = toml::from_str("cell_size = 32.0").expect("parse");
        assert_eq!(config.cell_size, 32.0);
        assert_eq!(config.kind, "creature");
        assert!(config.cap_set().max_total().is_none());
    }

    #[test]
    fn configured_themes_extend_the_builtin_vocabulary() {
        let config: CliConfig = toml::from_str(
            r#"
            [themes]
            undead = ["skeleton", "zombie"]
            "#,
        )
        .expect("parse");
        let table = config.theme_table();
        assert!(table.is_known("undead"));
        assert!(table.is_known("goblins"));
    }

    #[test]
    fn non_positive_caps_are_disabled() {
        let config: CliConfig = toml::from_str(
            r#"
            [caps]
            max_total = 0
            max_new = 10
            "#,
        )
        .expect("parse");
        let caps = config.cap_set();
        assert!(caps.max_total().is_none());
        assert_eq!(caps.max_new(), Some(10));
    }
}
