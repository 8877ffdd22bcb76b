//! Context builder
//!
//! Orchestrates one build:
//! - Extract a base value per dimension (entity capability or default)
//! - Run the five analyzers concurrently
//! - Score the enriched dimensions
//! - Upsert the unified context and return the stored record
//!
//! An analyzer failure aborts the build before anything is written.

use super::analyzers::AnalyzerSet;
use super::entity::ContextEntity;
use super::models::{
    ContextDimensions, IntentionalContext, PriorityContext, RelationalContext, SpatialContext,
    TemporalContext, UnifiedContext,
};
use super::scoring::context_score;
use super::store::{ContextQuery, ContextStore};
use crate::clock::Clock;
use crate::error::Result;
use crate::metrics::METRICS;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Builds, reads and invalidates unified contexts
pub struct ContextBuilder {
    store: Arc<dyn ContextStore>,
    analyzers: AnalyzerSet,
    clock: Arc<dyn Clock>,
}

impl ContextBuilder {
    pub fn new(store: Arc<dyn ContextStore>, analyzers: AnalyzerSet, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            analyzers,
            clock,
        }
    }

    /// Builder with the default analyzer set
    pub fn with_defaults(store: Arc<dyn ContextStore>, clock: Arc<dyn Clock>) -> Self {
        let analyzers = AnalyzerSet::with_defaults(clock.clone());
        Self::new(store, analyzers, clock)
    }

    /// Base dimension values: extracted where the entity offers them, defaults otherwise
    pub fn extract_base(&self, entity: &dyn ContextEntity, now: DateTime<Utc>) -> ContextDimensions {
        ContextDimensions {
            temporal: entity
                .extract_temporal_context()
                .unwrap_or_else(|| TemporalContext::at(now)),
            spatial: entity.extract_spatial_context().unwrap_or_default(),
            priority: entity
                .extract_priority_context()
                .unwrap_or_else(|| PriorityContext::at(now)),
            relational: entity.extract_relational_context().unwrap_or_default(),
            intentional: entity.extract_intentional_context().unwrap_or_default(),
        }
    }

    /// Enrich every dimension; the analyzers have no data dependency on each other
    async fn enrich(
        &self,
        base: ContextDimensions,
        entity: &dyn ContextEntity,
    ) -> Result<ContextDimensions> {
        let (temporal, spatial, priority, relational, intentional) = tokio::try_join!(
            self.analyzers.temporal.analyze(base.temporal, entity),
            self.analyzers.spatial.analyze(base.spatial, entity),
            self.analyzers.priority.analyze(base.priority, entity),
            self.analyzers.relational.analyze(base.relational, entity),
            self.analyzers.intentional.analyze(base.intentional, entity),
        )?;

        Ok(ContextDimensions {
            temporal,
            spatial,
            priority: priority.normalized(),
            relational,
            intentional,
        })
    }

    /// Build, score and persist the context of an entity
    pub async fn build_context(&self, entity: &dyn ContextEntity) -> Result<UnifiedContext> {
        let start = Instant::now();

        match self.build_inner(entity).await {
            Ok(context) => {
                METRICS.record_build(true, start.elapsed().as_secs_f64());
                info!(
                    entity_id = %context.entity_id,
                    version = context.version,
                    score = context.context_score,
                    "Context built"
                );
                Ok(context)
            }
            Err(e) => {
                METRICS.record_build(false, start.elapsed().as_secs_f64());
                warn!(entity_id = entity.id(), error = %e, "Context build failed");
                Err(e)
            }
        }
    }

    async fn build_inner(&self, entity: &dyn ContextEntity) -> Result<UnifiedContext> {
        let now = self.clock.now();
        let base = self.extract_base(entity, now);
        let dimensions = self.enrich(base, entity).await?;

        // Deadline distance is measured at scoring time, after the analyzers have run
        let scored_at = self.clock.now();
        let context_score = context_score(&dimensions, scored_at);

        debug!(
            entity_id = entity.id(),
            score = context_score,
            "Scored enriched dimensions"
        );

        let context = UnifiedContext {
            entity_id: entity.id().to_string(),
            entity_kind: entity.entity_kind().to_string(),
            owner_id: entity.owner_id().to_string(),
            created_at: scored_at,
            dimensions,
            context_score,
            // authoritative version is assigned by the store's upsert
            version: 1,
            last_updated: scored_at,
        };

        self.store.save(context).await
    }

    /// Stored context of an entity, `None` if never built or invalidated
    pub async fn get(&self, entity_id: &str) -> Result<Option<UnifiedContext>> {
        self.store.get(entity_id).await
    }

    /// Delete the stored context; deleting a missing context is not an error
    pub async fn invalidate_context(&self, entity_id: &str) -> Result<()> {
        let removed = self.store.delete(entity_id).await?;
        if removed {
            METRICS.record_invalidation();
            info!(entity_id, "Context invalidated");
        } else {
            debug!(entity_id, "No context to invalidate");
        }
        Ok(())
    }

    pub async fn query_by_owner(
        &self,
        owner_id: &str,
        query: &ContextQuery,
    ) -> Result<Vec<UnifiedContext>> {
        self.store.query_by_owner(owner_id, query).await
    }

    pub async fn high_priority(&self, owner_id: &str) -> Result<Vec<UnifiedContext>> {
        self.store.high_priority(owner_id).await
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    pub fn analyzers(&self) -> &AnalyzerSet {
        &self.analyzers
    }
}
