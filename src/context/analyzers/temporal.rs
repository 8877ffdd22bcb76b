//! Temporal enrichment and deadline urgency

use super::DimensionAnalyzer;
use crate::clock::Clock;
use crate::context::entity::ContextEntity;
use crate::context::models::{RelativeTime, TemporalContext, TimeOfDay};
use crate::error::{ContextError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Whole hours from `now` to `target`, floored (negative when past)
pub fn hours_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (target - now).num_milliseconds().div_euclid(MILLIS_PER_HOUR)
}

/// Whole days from `now` to `target`, floored (negative when past)
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (target - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Urgency in [0,100] of a deadline as seen from `now`
///
/// Step function over floored hours until the deadline:
/// past 0, <1h 100, <6h 90, <24h 75, <48h 60, <1 week 40, otherwise 20.
pub fn urgency_at(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
    match hours_until(deadline, now) {
        h if h < 0 => 0,
        h if h < 1 => 100,
        h if h < 6 => 90,
        h if h < 24 => 75,
        h if h < 48 => 60,
        h if h < 168 => 40,
        _ => 20,
    }
}

/// Derives time-of-day, weekday, workday and relative-time facts from the
/// base timestamp
pub struct TemporalAnalyzer {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    holidays: HashSet<NaiveDate>,
}

impl TemporalAnalyzer {
    /// Analyzer evaluating calendar facts in UTC
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            offset: Utc.fix(),
            holidays: HashSet::new(),
        }
    }

    /// Evaluate hour, weekday and calendar day in a fixed local offset
    pub fn with_offset_minutes(mut self, minutes: i32) -> Result<Self> {
        self.offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ContextError::Configuration(format!("Invalid UTC offset: {} minutes", minutes))
            })?;
        Ok(self)
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Urgency of a deadline relative to the analyzer's clock
    pub fn urgency(&self, deadline: DateTime<Utc>) -> u8 {
        urgency_at(deadline, self.clock.now())
    }

    /// Enrich a base value against an explicit "now"
    pub fn enrich(&self, base: TemporalContext, now: DateTime<Utc>) -> TemporalContext {
        let local = base.timestamp.with_timezone(&self.offset);
        let local_now = now.with_timezone(&self.offset);

        let day_of_week = local.weekday().num_days_from_sunday() as u8;
        let date = local.date_naive();

        TemporalContext {
            time_of_day: TimeOfDay::from_hour(local.hour()),
            day_of_week,
            is_workday: (1..=5).contains(&day_of_week),
            is_holiday: base.is_holiday || self.holidays.contains(&date),
            relative_time: RelativeTime {
                is_past: base.timestamp < now,
                is_current: date == local_now.date_naive(),
                is_future: base.timestamp > now,
                hours_until: Some(hours_until(base.timestamp, now)),
                days_until: Some(days_until(base.timestamp, now)),
            },
            ..base
        }
    }
}

#[async_trait]
impl DimensionAnalyzer<TemporalContext> for TemporalAnalyzer {
    fn name(&self) -> &'static str {
        "temporal"
    }

    async fn analyze(
        &self,
        base: TemporalContext,
        entity: &dyn ContextEntity,
    ) -> Result<TemporalContext> {
        let enriched = self.enrich(base, self.clock.now());
        debug!(
            entity_id = entity.id(),
            time_of_day = ?enriched.time_of_day,
            hours_until = ?enriched.relative_time.hours_until,
            "Temporal context enriched"
        );
        Ok(enriched)
    }
}
