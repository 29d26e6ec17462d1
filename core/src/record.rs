use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    grid::Position,
    ident::SpawnId,
};

/// Identifier of a world shard; spawn identifiers are unique per shard.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(String);

impl ShardId {
    /// Wraps a raw shard identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the raw shard identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ownership classification attached to every spawn record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// System-generated by a reconciliation wave.
    Brain,
    /// Baseline record seeded at world creation.
    Seeded,
    /// Placed or claimed by an operator; protected from automatic mutation.
    Editor,
    /// Ownership was never recorded.
    #[default]
    Unset,
}

/// Persisted placement of a world entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    /// Stable identifier, unique within the shard.
    pub id: SpawnId,
    /// Shard that owns the record.
    pub shard: ShardId,
    /// Kind tag of the placed entity (for example `creature`).
    pub kind: String,
    /// Archetype tag within the kind.
    pub archetype: String,
    /// Prototype the entity is instantiated from.
    pub prototype: String,
    /// Optional variant of the prototype.
    pub variant: Option<String>,
    /// World-space position of the placement.
    pub position: Position,
    /// Optional region the record belongs to.
    pub region: Option<String>,
    /// Optional difficulty tier.
    pub tier: Option<u32>,
    /// Ownership classification.
    pub owner: OwnerKind,
    /// Explicit lock flag excluding the record from automatic mutation.
    pub locked: bool,
    /// Store revision at which the record was created.
    pub created_rev: u64,
    /// Store revision of the most recent mutation.
    pub updated_rev: u64,
}

impl SpawnRecord {
    /// Reports whether the record is protected from automatic overwrite or
    /// deletion by reconciliation passes.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.locked || self.owner == OwnerKind::Editor
    }
}
