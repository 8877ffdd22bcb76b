//! Composite context score
//!
//! Additive heuristic over the enriched dimensions:
//!
//! ```text
//! score = 50
//! deadline present and hours_until < 24  -> +20
//! else deadline present and hours_until < 48 -> +10
//! computed_priority > 70 -> +15, else > 50 -> +5
//! blocks at least one entity -> +10
//! clamp to [0,100]
//! ```
//!
//! A past deadline has negative `hours_until` and so takes the +20 branch.

use super::analyzers::hours_until;
use super::models::{ContextDimensions, PriorityContext, RelationalContext};
use chrono::{DateTime, Utc};

pub const BASE_SCORE: i32 = 50;
pub const MAX_SCORE: u8 = 100;

/// Score of a set of enriched dimensions at `now`
pub fn context_score(dimensions: &ContextDimensions, now: DateTime<Utc>) -> u8 {
    score_from(&dimensions.priority, &dimensions.relational, now)
}

/// Score from the two dimensions the formula reads
pub fn score_from(
    priority: &PriorityContext,
    relational: &RelationalContext,
    now: DateTime<Utc>,
) -> u8 {
    let mut score = BASE_SCORE;

    if let Some(deadline) = priority.factors.deadline {
        let hours = hours_until(deadline, now);
        if hours < 24 {
            score += 20;
        } else if hours < 48 {
            score += 10;
        }
    }

    if priority.computed_priority > 70 {
        score += 15;
    } else if priority.computed_priority > 50 {
        score += 5;
    }

    if !relational.dependencies.blocks_ids.is_empty() {
        score += 10;
    }

    score.clamp(0, MAX_SCORE as i32) as u8
}
