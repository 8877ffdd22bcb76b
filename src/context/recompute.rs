//! Bus subscriber that keeps contexts in step with repository mutations

use super::builder::ContextBuilder;
use super::entity::EntityRegistry;
use crate::events::{ChangeBus, ChangeEvent, ChangeHandler, ChangeKind, SubscriptionId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rebuilds on create/update, invalidates on delete
///
/// Failures are returned to the bus, which logs and drops them; the next
/// mutation of the entity triggers a fresh attempt.
pub struct ContextRecomputeHandler {
    builder: Arc<ContextBuilder>,
    registry: Arc<EntityRegistry>,
}

impl ContextRecomputeHandler {
    pub fn new(builder: Arc<ContextBuilder>, registry: Arc<EntityRegistry>) -> Self {
        Self { builder, registry }
    }

    /// Subscribe a handler to all three change kinds
    pub fn register(self: Arc<Self>, bus: &ChangeBus) -> Vec<SubscriptionId> {
        ChangeKind::ALL
            .iter()
            .map(|kind| bus.subscribe(kind, self.clone() as Arc<dyn ChangeHandler>))
            .collect()
    }
}

#[async_trait]
impl ChangeHandler for ContextRecomputeHandler {
    fn name(&self) -> &str {
        "context_recompute"
    }

    async fn handle(&self, event: &ChangeEvent) -> anyhow::Result<()> {
        match event.kind {
            ChangeKind::Delete => {
                self.builder.invalidate_context(&event.entity_id).await?;
            }
            ChangeKind::Create | ChangeKind::Update => {
                let Some(payload) = event.payload.as_ref() else {
                    warn!(
                        event_id = %event.id,
                        entity_id = %event.entity_id,
                        "Change event without payload, skipping recompute"
                    );
                    return Ok(());
                };

                if !self.registry.contains(&event.entity_kind) {
                    debug!(
                        entity_kind = %event.entity_kind,
                        "No decoder for entity kind, skipping recompute"
                    );
                    return Ok(());
                }

                let entity = self.registry.decode(&event.entity_kind, payload)?;
                self.builder.build_context(entity.as_ref()).await?;
            }
        }

        Ok(())
    }
}
