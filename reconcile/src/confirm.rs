use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use spawn_warden_core::{CapSet, CellBounds, ShardId};

/// Number of leading digest bytes rendered into a token.
const TOKEN_BYTES: usize = 6;

/// Deterministic, non-secret digest of a destructive operation's scope.
///
/// The token exists purely to force a second explicit round-trip: a dry run
/// surfaces it, and the commit call must echo it verbatim before any
/// deletion is applied. It carries no authority beyond that.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmToken(String);

impl ConfirmToken {
    /// Borrows the rendered token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether a caller-supplied token echoes this one exactly.
    #[must_use]
    pub fn matches(&self, supplied: &str) -> bool {
        self.0 == supplied
    }
}

impl fmt::Display for ConfirmToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the confirm token for one destructive scope.
///
/// The scope string folds in the shard, the bounds notation, every cap, and
/// an explicit description of what would be deleted, so tokens from
/// different operations never collide by accident.
#[must_use]
pub(crate) fn token_for_scope(
    shard: &ShardId,
    bounds: &CellBounds,
    caps: &CapSet,
    description: &str,
) -> ConfirmToken {
    let scope = format!(
        "shard={shard}|bounds={}|caps={}/{}/{}/{}|scope={description}",
        bounds.notation(),
        render_cap(caps.max_total()),
        render_cap(caps.max_theme()),
        render_cap(caps.max_epoch_theme()),
        render_cap(caps.max_new()),
    );
    let mut hasher = Sha256::new();
    hasher.update(scope.as_bytes());
    let digest = hasher.finalize();
    ConfirmToken(hex::encode(&digest[..TOKEN_BYTES]))
}

fn render_cap(cap: Option<u32>) -> String {
    cap.map_or_else(|| "-".to_owned(), |value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::token_for_scope;
    use spawn_warden_core::{CapSet, CellBounds, ShardId};

    #[test]
    fn identical_scopes_yield_identical_tokens() {
        let shard = ShardId::new("shard-a");
        let bounds = CellBounds::new(0, 1, 0, 1);
        let caps = CapSet::unbounded();
        let first = token_for_scope(&shard, &bounds, &caps, "replace:creature:goblins:0");
        let second = token_for_scope(&shard, &bounds, &caps, "replace:creature:goblins:0");
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 12);
    }

    #[test]
    fn any_scope_component_changes_the_token() {
        let bounds = CellBounds::new(0, 1, 0, 1);
        let caps = CapSet::unbounded();
        let base = token_for_scope(&ShardId::new("a"), &bounds, &caps, "wipe:goblins:*");
        assert_ne!(
            base,
            token_for_scope(&ShardId::new("b"), &bounds, &caps, "wipe:goblins:*")
        );
        assert_ne!(
            base,
            token_for_scope(
                &ShardId::new("a"),
                &CellBounds::new(0, 2, 0, 1),
                &caps,
                "wipe:goblins:*"
            )
        );
        assert_ne!(
            base,
            token_for_scope(
                &ShardId::new("a"),
                &bounds,
                &CapSet::new(Some(5), None, None, None),
                "wipe:goblins:*"
            )
        );
        assert_ne!(
            base,
            token_for_scope(&ShardId::new("a"), &bounds, &caps, "wipe:bandits:*")
        );
    }

    #[test]
    fn matches_requires_verbatim_echo() {
        let token = token_for_scope(
            &ShardId::new("a"),
            &CellBounds::new(0, 0, 0, 0),
            &CapSet::unbounded(),
            "wipe:*:*",
        );
        assert!(token.matches(token.as_str()));
        assert!(!token.matches("deadbeef0000"));
        assert!(!token.matches(""));
    }
}
