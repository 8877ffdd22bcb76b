//! Dimension analyzers
//!
//! Each dimension is enriched by an analyzer that takes the base value and
//! the source entity and returns the enriched value. Analyzers never touch
//! the context store and never see each other's output, so the builder runs
//! them concurrently.
//!
//! [`NoopAnalyzer`] returns its input unchanged. It is the intended default
//! for dimensions with no enrichment logic, not a placeholder: callers must
//! not assume any dimension is non-trivially enriched.

pub mod priority;
pub mod temporal;

pub use priority::DeadlinePriorityAnalyzer;
pub use temporal::{days_until, hours_until, urgency_at, TemporalAnalyzer};

use super::entity::ContextEntity;
use super::models::{
    IntentionalContext, PriorityContext, RelationalContext, SpatialContext, TemporalContext,
};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Enriches one context dimension
#[async_trait]
pub trait DimensionAnalyzer<D>: Send + Sync
where
    D: Send + 'static,
{
    /// Analyzer name for logs
    fn name(&self) -> &'static str;

    /// Return the enriched dimension; must not mutate the entity
    async fn analyze(&self, base: D, entity: &dyn ContextEntity) -> Result<D>;
}

/// Identity analyzer, valid for every dimension
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalyzer;

#[async_trait]
impl<D> DimensionAnalyzer<D> for NoopAnalyzer
where
    D: Send + 'static,
{
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn analyze(&self, base: D, _entity: &dyn ContextEntity) -> Result<D> {
        Ok(base)
    }
}

/// The five analyzers used by a builder
#[derive(Clone)]
pub struct AnalyzerSet {
    pub temporal: Arc<dyn DimensionAnalyzer<TemporalContext>>,
    pub spatial: Arc<dyn DimensionAnalyzer<SpatialContext>>,
    pub priority: Arc<dyn DimensionAnalyzer<PriorityContext>>,
    pub relational: Arc<dyn DimensionAnalyzer<RelationalContext>>,
    pub intentional: Arc<dyn DimensionAnalyzer<IntentionalContext>>,
}

impl AnalyzerSet {
    /// Temporal enrichment plus no-op analyzers for the other four dimensions
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self {
            temporal: Arc::new(TemporalAnalyzer::new(clock)),
            spatial: Arc::new(NoopAnalyzer),
            priority: Arc::new(NoopAnalyzer),
            relational: Arc::new(NoopAnalyzer),
            intentional: Arc::new(NoopAnalyzer),
        }
    }

    /// Analyzer set described by the engine configuration
    pub fn from_config(config: &EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let temporal = TemporalAnalyzer::new(clock.clone())
            .with_offset_minutes(config.utc_offset_minutes)?
            .with_holidays(config.holiday_dates()?);

        let priority: Arc<dyn DimensionAnalyzer<PriorityContext>> = if config.deadline_priority {
            Arc::new(DeadlinePriorityAnalyzer::new(clock))
        } else {
            Arc::new(NoopAnalyzer)
        };

        Ok(Self {
            temporal: Arc::new(temporal),
            priority,
            ..Self::identity()
        })
    }

    /// Every dimension passes through unchanged
    pub fn identity() -> Self {
        Self {
            temporal: Arc::new(NoopAnalyzer),
            spatial: Arc::new(NoopAnalyzer),
            priority: Arc::new(NoopAnalyzer),
            relational: Arc::new(NoopAnalyzer),
            intentional: Arc::new(NoopAnalyzer),
        }
    }

    pub fn with_temporal(mut self, analyzer: Arc<dyn DimensionAnalyzer<TemporalContext>>) -> Self {
        self.temporal = analyzer;
        self
    }

    pub fn with_spatial(mut self, analyzer: Arc<dyn DimensionAnalyzer<SpatialContext>>) -> Self {
        self.spatial = analyzer;
        self
    }

    pub fn with_priority(mut self, analyzer: Arc<dyn DimensionAnalyzer<PriorityContext>>) -> Self {
        self.priority = analyzer;
        self
    }

    pub fn with_relational(
        mut self,
        analyzer: Arc<dyn DimensionAnalyzer<RelationalContext>>,
    ) -> Self {
        self.relational = analyzer;
        self
    }

    pub fn with_intentional(
        mut self,
        analyzer: Arc<dyn DimensionAnalyzer<IntentionalContext>>,
    ) -> Self {
        self.intentional = analyzer;
        self
    }
}
