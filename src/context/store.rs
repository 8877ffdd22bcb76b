//! Context store port and the in-memory implementation

use super::models::UnifiedContext;
use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Score threshold of the high-priority convenience query
pub const HIGH_PRIORITY_MIN_SCORE: u8 = 70;

/// Filters for owner queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ContextQuery {
    pub fn min_score(score: u8) -> Self {
        Self {
            min_score: Some(score),
            ..Self::default()
        }
    }

    pub fn with_entity_kind(mut self, kind: impl Into<String>) -> Self {
        self.entity_kind = Some(kind.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, context: &UnifiedContext) -> bool {
        self.min_score.map_or(true, |min| context.context_score >= min)
            && self
                .entity_kind
                .as_deref()
                .map_or(true, |kind| context.entity_kind == kind)
    }
}

/// Persistence port for unified contexts
///
/// Implementations must make `save` an atomic upsert keyed by entity id:
/// a new record gets version 1, an existing one is fully replaced with its
/// version incremented by exactly one.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Upsert and return the stored record
    async fn save(&self, context: UnifiedContext) -> Result<UnifiedContext>;

    async fn get(&self, entity_id: &str) -> Result<Option<UnifiedContext>>;

    /// Remove a record; returns whether one existed
    async fn delete(&self, entity_id: &str) -> Result<bool>;

    /// Contexts of one owner, highest score first
    async fn query_by_owner(
        &self,
        owner_id: &str,
        query: &ContextQuery,
    ) -> Result<Vec<UnifiedContext>>;

    /// Remove every record last updated before `cutoff`; returns the count removed
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    fn high_priority_threshold(&self) -> u8 {
        HIGH_PRIORITY_MIN_SCORE
    }

    /// Owner's contexts scoring at least the high-priority threshold
    async fn high_priority(&self, owner_id: &str) -> Result<Vec<UnifiedContext>> {
        let query = ContextQuery::min_score(self.high_priority_threshold());
        self.query_by_owner(owner_id, &query).await
    }
}

/// Concurrent in-memory store
pub struct InMemoryContextStore {
    contexts: DashMap<String, UnifiedContext>,
    clock: Arc<dyn Clock>,
    high_priority_min_score: u8,
}

impl InMemoryContextStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, &StoreConfig::default())
    }

    pub fn with_config(clock: Arc<dyn Clock>, config: &StoreConfig) -> Self {
        Self {
            contexts: DashMap::new(),
            clock,
            high_priority_min_score: config.high_priority_min_score,
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn save(&self, mut context: UnifiedContext) -> Result<UnifiedContext> {
        let now = self.clock.now();
        context.last_updated = now;

        // The entry guard holds the shard lock, so concurrent saves of one id serialize here
        let stored = match self.contexts.entry(context.entity_id.clone()) {
            Entry::Occupied(mut existing) => {
                context.version = existing.get().version + 1;
                context.created_at = existing.get().created_at;
                existing.insert(context.clone());
                context
            }
            Entry::Vacant(slot) => {
                context.version = 1;
                slot.insert(context.clone());
                context
            }
        };

        debug!(
            entity_id = %stored.entity_id,
            version = stored.version,
            score = stored.context_score,
            "Context saved"
        );

        Ok(stored)
    }

    async fn get(&self, entity_id: &str) -> Result<Option<UnifiedContext>> {
        Ok(self.contexts.get(entity_id).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, entity_id: &str) -> Result<bool> {
        let removed = self.contexts.remove(entity_id).is_some();
        debug!(entity_id, removed, "Context delete");
        Ok(removed)
    }

    async fn query_by_owner(
        &self,
        owner_id: &str,
        query: &ContextQuery,
    ) -> Result<Vec<UnifiedContext>> {
        let mut results: Vec<UnifiedContext> = self
            .contexts
            .iter()
            .filter(|entry| entry.owner_id == owner_id && query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        results.sort_by(|a, b| {
            b.context_score
                .cmp(&a.context_score)
                .then_with(|| b.last_updated.cmp(&a.last_updated))
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        debug!(owner_id, count = results.len(), "Owner query");
        Ok(results)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let stale: Vec<String> = self
            .contexts
            .iter()
            .filter(|entry| entry.last_updated < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        // Re-check under the lock so a record refreshed meanwhile survives
        let removed = stale
            .iter()
            .filter(|id| {
                self.contexts
                    .remove_if(id.as_str(), |_, ctx| ctx.last_updated < cutoff)
                    .is_some()
            })
            .count();

        if removed > 0 {
            info!("Purged {} contexts last updated before {}", removed, cutoff);
        }

        Ok(removed)
    }

    fn high_priority_threshold(&self) -> u8 {
        self.high_priority_min_score
    }
}
