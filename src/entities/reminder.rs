//! Reminder entity

use crate::context::models::{
    PriorityContext, PriorityDecay, PriorityFactors, Recurrence, RelationalContext, Relationships,
    TemporalContext,
};
use crate::context::ContextEntity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REMINDER_KIND: &str = "reminder";

/// A timed nudge, optionally attached to another entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub owner_id: String,
    pub message: String,
    pub remind_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// Entity this reminder is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl Reminder {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        message: impl Into<String>,
        remind_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            message: message.into(),
            remind_at,
            recurrence: None,
            target_id: None,
        }
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn for_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }
}

impl ContextEntity for Reminder {
    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn entity_kind(&self) -> &str {
        REMINDER_KIND
    }

    fn extract_temporal_context(&self) -> Option<TemporalContext> {
        Some(TemporalContext {
            recurrence: self.recurrence.clone(),
            ..TemporalContext::at(self.remind_at)
        })
    }

    // The reminder time doubles as its deadline
    fn extract_priority_context(&self) -> Option<PriorityContext> {
        Some(PriorityContext {
            base_priority: 50,
            computed_priority: 50,
            factors: PriorityFactors {
                deadline: Some(self.remind_at),
                ..PriorityFactors::default()
            },
            priority_decay: PriorityDecay {
                decay_rate: 0.0,
                last_recalculated: self.remind_at,
            },
        })
    }

    fn extract_relational_context(&self) -> Option<RelationalContext> {
        let target = self.target_id.as_ref()?;
        Some(RelationalContext {
            relationships: Relationships {
                related_entity_ids: vec![target.clone()],
                ..Relationships::default()
            },
            ..RelationalContext::default()
        })
    }
}
