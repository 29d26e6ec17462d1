use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{grid::CellCoord, theme::ThemeTable};

/// Scheme token that prefixes every system-generated spawn identifier.
pub const BRAIN_SCHEME: &str = "brain";

/// Epoch tokens are only searched within this many leading identifier tokens,
/// which keeps the per-cell index token from masquerading as an epoch.
const EPOCH_SEARCH_WINDOW: usize = 3;

/// Integer generation counter distinguishing successive waves of one theme.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Epoch(u32);

impl Epoch {
    /// Creates a new epoch counter.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric epoch value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a spawn record, unique within a shard.
///
/// System-generated identifiers follow the colon-delimited encoding
/// `brain:<epoch>:<theme>:<cellx>_<cellz>:<index>:<prototype>`. The encoding
/// is a durable contract: theme/epoch filtering of previously persisted
/// records depends on it remaining parseable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnId(String);

impl SpawnId {
    /// Wraps a raw identifier string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Encodes a canonical system-generated identifier.
    #[must_use]
    pub fn brain(epoch: Epoch, theme: &str, cell: CellCoord, index: u32, prototype: &str) -> Self {
        Self(format!(
            "{BRAIN_SCHEME}:{}:{theme}:{}_{}:{index}:{prototype}",
            epoch.get(),
            cell.x(),
            cell.z(),
        ))
    }

    /// Borrows the raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, yielding the raw string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SpawnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of tolerantly parsing a spawn identifier.
///
/// Older or malformed identifiers may carry epoch and theme in swapped
/// positions or lack one entirely; absent fields are `None`, never guessed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSpawnId {
    /// Epoch recovered from the identifier, if any token qualified.
    pub epoch: Option<u32>,
    /// Theme recovered from the identifier via the known vocabulary.
    pub theme: Option<String>,
    /// Raw colon-delimited tokens, preserved for fallback matching.
    pub tokens: Vec<String>,
}

impl ParsedSpawnId {
    /// Parses an identifier against the known theme vocabulary.
    ///
    /// Field recovery runs as ordered match attempts: the theme is the first
    /// token with an exact vocabulary match, else the first vocabulary word
    /// contained in any token; the epoch is the first integer among the
    /// leading tokens that precedes the theme token, else the first integer
    /// among the leading tokens at all.
    #[must_use]
    pub fn parse(raw: &str, themes: &ThemeTable) -> Self {
        let tokens: Vec<String> = raw.split(':').map(str::to_owned).collect();

        let theme_index = tokens.iter().position(|token| themes.is_known(token));
        let theme = theme_index.map(|index| tokens[index].clone()).or_else(|| {
            tokens.iter().find_map(|token| {
                themes
                    .known()
                    .find(|name| token.contains(*name))
                    .map(str::to_owned)
            })
        });

        let leading: Vec<(usize, u32)> = tokens
            .iter()
            .take(EPOCH_SEARCH_WINDOW)
            .enumerate()
            .filter_map(|(index, token)| token.parse::<u32>().ok().map(|value| (index, value)))
            .collect();
        let epoch = leading
            .iter()
            .find(|(index, _)| theme_index.map_or(true, |theme_index| *index < theme_index))
            .or_else(|| leading.first())
            .map(|(_, value)| *value);

        Self {
            epoch,
            theme,
            tokens,
        }
    }

    /// Reports whether the identifier matches a theme filter, falling back to
    /// raw token membership when no structured theme was recovered.
    #[must_use]
    pub fn matches_theme(&self, filter: &str) -> bool {
        match &self.theme {
            Some(theme) => theme == filter,
            None => self.tokens.iter().any(|token| token.contains(filter)),
        }
    }

    /// Reports whether the identifier matches an epoch filter, falling back
    /// to raw token membership when no structured epoch was recovered.
    #[must_use]
    pub fn matches_epoch(&self, filter: Epoch) -> bool {
        match self.epoch {
            Some(epoch) => epoch == filter.get(),
            None => {
                let needle = filter.get().to_string();
                self.tokens.iter().any(|token| token.contains(&needle))
            }
        }
    }
}
