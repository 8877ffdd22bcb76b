//! Data models for the five context dimensions and the unified context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse part of the day a timestamp falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Bucket an hour of day: [0,12) morning, [12,18) afternoon, [18,21) evening, [21,24) night
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            18..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// Position of a timestamp relative to "now"
///
/// `is_current` compares calendar days while `is_past`/`is_future` compare
/// instants, so a timestamp earlier today is both past and current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeTime {
    pub is_past: bool,
    pub is_current: bool,
    pub is_future: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_until: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub pattern: String,
    pub interval: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

/// Temporal dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalContext {
    pub timestamp: DateTime<Utc>,
    pub time_of_day: TimeOfDay,
    /// 0 = Sunday
    pub day_of_week: u8,
    pub is_workday: bool,
    pub is_holiday: bool,
    pub relative_time: RelativeTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl TemporalContext {
    /// Default temporal base: now, morning, workday, current
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            time_of_day: TimeOfDay::Morning,
            day_of_week: 1,
            is_workday: true,
            is_holiday: false,
            relative_time: RelativeTime {
                is_past: false,
                is_current: true,
                is_future: false,
                hours_until: None,
                days_until: None,
            },
            recurrence: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proximity {
    pub nearby_entity_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_from_home: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_from_work: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mobility {
    pub requires_travel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_travel_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_mode: Option<String>,
}

/// Spatial dimension; the default is an empty proximity and no location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    pub proximity: Proximity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobility: Option<Mobility>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityFactors {
    pub urgency: u8,
    pub importance: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub dependency_ids: Vec<String>,
    pub blocking_others: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityDecay {
    pub decay_rate: f64,
    pub last_recalculated: DateTime<Utc>,
}

/// Priority dimension; both priorities live in [0,100]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityContext {
    pub base_priority: u8,
    pub computed_priority: u8,
    pub factors: PriorityFactors,
    pub priority_decay: PriorityDecay,
}

impl PriorityContext {
    pub const MAX: u8 = 100;

    /// Default priority base: 50/50 with zero factors
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            base_priority: 50,
            computed_priority: 50,
            factors: PriorityFactors::default(),
            priority_decay: PriorityDecay {
                decay_rate: 0.0,
                last_recalculated: now,
            },
        }
    }

    /// Clamp priorities and factor levels into [0,100]
    pub fn normalized(mut self) -> Self {
        self.base_priority = self.base_priority.min(Self::MAX);
        self.computed_priority = self.computed_priority.min(Self::MAX);
        self.factors.urgency = self.factors.urgency.min(Self::MAX);
        self.factors.importance = self.factors.importance.min(Self::MAX);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,
    pub related_entity_ids: Vec<String>,
    pub conflicting_entity_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    pub cluster_type: String,
    pub cluster_importance: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependencies {
    pub blocked_by_ids: Vec<String>,
    pub blocks_ids: Vec<String>,
    pub prerequisite_for_ids: Vec<String>,
}

/// Relational dimension; the default is all-empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationalContext {
    pub relationships: Relationships,
    pub clusters: Vec<Cluster>,
    pub dependencies: Dependencies,
}

/// What the user is doing to the entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    #[default]
    Create,
    Complete,
    Postpone,
    Delete,
    Update,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIntent {
    pub primary_goal: String,
    pub secondary_goals: Vec<String>,
    pub action_type: ActionType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPatterns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_completion_minutes: Option<u32>,
    pub preferred_time_slots: Vec<TimeOfDay>,
    /// 0-100
    pub completion_rate: u8,
    /// 0-100
    pub postponement_frequency: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalContext {
    pub stress_level: u8,
    pub motivation: u8,
    pub satisfaction: u8,
}

/// Intentional dimension; the default is an empty goal with zero behavior stats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentionalContext {
    pub user_intent: UserIntent,
    pub behavior_patterns: BehaviorPatterns,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotional_context: Option<EmotionalContext>,
}

/// The five enriched dimensions of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDimensions {
    pub temporal: TemporalContext,
    pub spatial: SpatialContext,
    pub priority: PriorityContext,
    pub relational: RelationalContext,
    pub intentional: IntentionalContext,
}

/// Persisted aggregate of all five dimensions plus the composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedContext {
    pub entity_id: String,
    pub entity_kind: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub dimensions: ContextDimensions,
    /// 0-100
    pub context_score: u8,
    /// Starts at 1 and grows by one on every successful save
    pub version: u64,
    pub last_updated: DateTime<Utc>,
}

impl UnifiedContext {
    /// Same dimension content and score, ignoring version and timestamps
    pub fn same_content(&self, other: &UnifiedContext) -> bool {
        self.entity_id == other.entity_id
            && self.owner_id == other.owner_id
            && self.dimensions == other.dimensions
            && self.context_score == other.context_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Night);
    }

    #[test]
    fn test_priority_normalized_clamps() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut priority = PriorityContext::at(now);
        priority.base_priority = 180;
        priority.computed_priority = 101;
        priority.factors.urgency = 255;

        let priority = priority.normalized();
        assert_eq!(priority.base_priority, 100);
        assert_eq!(priority.computed_priority, 100);
        assert_eq!(priority.factors.urgency, 100);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&TimeOfDay::Evening).unwrap(),
            "\"evening\""
        );
        assert_eq!(
            serde_json::to_string(&ActionType::Postpone).unwrap(),
            "\"postpone\""
        );
    }
}
