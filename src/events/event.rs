//! Change event emitted after a successful repository mutation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Mutation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete];

    /// Bus topic for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "CREATE",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

impl AsRef<str> for ChangeKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a committed mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: Uuid,
    pub kind: ChangeKind,
    /// Domain type of the originating repository
    pub entity_kind: String,
    pub entity_id: String,
    pub owner_id: String,
    /// Snapshot of the entity; usually absent for deletes
    pub payload: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(
        kind: ChangeKind,
        entity_kind: impl Into<String>,
        entity_id: impl Into<String>,
        owner_id: impl Into<String>,
        payload: Option<Value>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            entity_kind: entity_kind.into(),
            entity_id: entity_id.into(),
            owner_id: owner_id.into(),
            payload,
            occurred_at,
        }
    }
}
