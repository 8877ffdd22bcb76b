//! Task entity

use crate::context::models::{
    ActionType, Dependencies, GeoLocation, IntentionalContext, PriorityContext, PriorityDecay,
    PriorityFactors, RelationalContext, Relationships, SpatialContext, TemporalContext, UserIntent,
};
use crate::context::ContextEntity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TASK_KIND: &str = "task";

/// Importance level chosen by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Level on the 0-100 priority scale
    pub fn level(&self) -> u8 {
        match self {
            TaskPriority::Low => 25,
            TaskPriority::Medium => 50,
            TaskPriority::High => 75,
            TaskPriority::Urgent => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

/// A to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Tasks that must finish before this one
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Tasks waiting on this one
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: None,
            due_date: None,
            priority: TaskPriority::default(),
            status: TaskStatus::default(),
            parent_id: None,
            depends_on: Vec::new(),
            blocks: Vec::new(),
            location: None,
            updated_at,
        }
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn depending_on(mut self, ids: Vec<String>) -> Self {
        self.depends_on = ids;
        self
    }

    pub fn blocking(mut self, ids: Vec<String>) -> Self {
        self.blocks = ids;
        self
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl ContextEntity for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn entity_kind(&self) -> &str {
        TASK_KIND
    }

    // Undated tasks fall back to the "now" default
    fn extract_temporal_context(&self) -> Option<TemporalContext> {
        self.due_date.map(TemporalContext::at)
    }

    fn extract_spatial_context(&self) -> Option<SpatialContext> {
        self.location.as_ref().map(|location| SpatialContext {
            location: Some(location.clone()),
            ..SpatialContext::default()
        })
    }

    fn extract_priority_context(&self) -> Option<PriorityContext> {
        let level = self.priority.level();
        Some(PriorityContext {
            base_priority: level,
            computed_priority: level,
            factors: PriorityFactors {
                urgency: 0,
                importance: level,
                deadline: self.due_date,
                dependency_ids: self.depends_on.clone(),
                blocking_others: !self.blocks.is_empty(),
            },
            priority_decay: PriorityDecay {
                decay_rate: 0.0,
                last_recalculated: self.updated_at,
            },
        })
    }

    fn extract_relational_context(&self) -> Option<RelationalContext> {
        Some(RelationalContext {
            relationships: Relationships {
                parent_id: self.parent_id.clone(),
                ..Relationships::default()
            },
            dependencies: Dependencies {
                blocked_by_ids: self.depends_on.clone(),
                blocks_ids: self.blocks.clone(),
                prerequisite_for_ids: Vec::new(),
            },
            ..RelationalContext::default()
        })
    }

    fn extract_intentional_context(&self) -> Option<IntentionalContext> {
        let action_type = match self.status {
            TaskStatus::Todo => ActionType::Create,
            TaskStatus::InProgress => ActionType::Update,
            TaskStatus::Done => ActionType::Complete,
        };
        Some(IntentionalContext {
            user_intent: UserIntent {
                primary_goal: self.title.clone(),
                secondary_goals: Vec::new(),
                action_type,
            },
            ..IntentionalContext::default()
        })
    }
}
