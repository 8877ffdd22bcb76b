//! Deadline-aware priority analyzer
//!
//! Opt-in replacement for the no-op priority analyzer. It folds deadline
//! urgency and importance into the computed priority, weighted like the
//! relevance totals elsewhere in the crate.

use super::temporal::urgency_at;
use super::DimensionAnalyzer;
use crate::clock::Clock;
use crate::context::entity::ContextEntity;
use crate::context::models::PriorityContext;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Bonus added when the entity blocks other entities
const BLOCKING_BONUS: f64 = 10.0;

pub struct DeadlinePriorityAnalyzer {
    clock: Arc<dyn Clock>,
}

impl DeadlinePriorityAnalyzer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Weighted priority: with a deadline base 50%, urgency 30%, importance 20%;
    /// without one base 70%, importance 30%
    fn compute(&self, base: &PriorityContext, urgency: Option<u8>) -> u8 {
        let base_priority = base.base_priority as f64;
        let importance = base.factors.importance as f64;

        let mut total = match urgency {
            Some(urgency) => base_priority * 0.5 + urgency as f64 * 0.3 + importance * 0.2,
            None => base_priority * 0.7 + importance * 0.3,
        };

        if base.factors.blocking_others {
            total += BLOCKING_BONUS;
        }

        total.round().clamp(0.0, 100.0) as u8
    }
}

#[async_trait]
impl DimensionAnalyzer<PriorityContext> for DeadlinePriorityAnalyzer {
    fn name(&self) -> &'static str {
        "deadline_priority"
    }

    async fn analyze(
        &self,
        base: PriorityContext,
        entity: &dyn ContextEntity,
    ) -> Result<PriorityContext> {
        let now = self.clock.now();
        let base = base.normalized();
        let urgency = base.factors.deadline.map(|deadline| urgency_at(deadline, now));

        let mut enriched = base.clone();
        enriched.computed_priority = self.compute(&base, urgency);
        if let Some(urgency) = urgency {
            enriched.factors.urgency = urgency;
        }
        enriched.priority_decay.last_recalculated = now;

        debug!(
            entity_id = entity.id(),
            base = enriched.base_priority,
            computed = enriched.computed_priority,
            "Priority recomputed"
        );

        Ok(enriched)
    }
}
