//! Integration tests for change-driven context recomputation
//!
//! Repository writes flow through the emitter and bus into the recompute
//! handler, which rebuilds or invalidates the stored context.

use chrono::{DateTime, Duration, TimeZone, Utc};
use context_engine::{
    config::{BusConfig, EngineConfig},
    context::{AnalyzerSet, ContextQuery, ContextRecomputeHandler, InMemoryContextStore},
    entities::{default_registry, Reminder, Task, TaskPriority, TaskStatus, TASK_KIND},
    events::InMemoryRepository,
    ChangeBus, ChangeEmitter, ContextBuilder, FixedClock,
};
use proptest::prelude::*;
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap()
}

struct Harness {
    clock: Arc<FixedClock>,
    bus: Arc<ChangeBus>,
    builder: Arc<ContextBuilder>,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(FixedClock::new(start()));
        let store = Arc::new(InMemoryContextStore::new(clock.clone()));
        let builder = Arc::new(ContextBuilder::with_defaults(store, clock.clone()));
        Self::wire(clock, builder)
    }

    fn with_engine(config: &EngineConfig) -> Self {
        let clock = Arc::new(FixedClock::new(start()));
        let store = Arc::new(InMemoryContextStore::new(clock.clone()));
        let analyzers = AnalyzerSet::from_config(config, clock.clone()).unwrap();
        let builder = Arc::new(ContextBuilder::new(store, analyzers, clock.clone()));
        Self::wire(clock, builder)
    }

    fn wire(clock: Arc<FixedClock>, builder: Arc<ContextBuilder>) -> Self {
        let bus = Arc::new(ChangeBus::new());
        let handler = Arc::new(ContextRecomputeHandler::new(
            builder.clone(),
            Arc::new(default_registry()),
        ));
        handler.register(&bus);
        Self {
            clock,
            bus,
            builder,
        }
    }

    fn repository<T>(&self, kind: &str, config: &BusConfig) -> InMemoryRepository<T>
    where
        T: context_engine::ContextEntity + serde::Serialize + Clone + 'static,
    {
        let emitter =
            ChangeEmitter::new(self.bus.clone(), kind, self.clock.clone()).with_config(config);
        InMemoryRepository::new(emitter)
    }
}

#[tokio::test]
async fn test_task_lifecycle_drives_context() {
    let harness = Harness::new();
    let tasks = harness.repository::<Task>(TASK_KIND, &BusConfig::default());

    let task = Task::new("t1", "u1", "Prepare demo", start())
        .with_priority(TaskPriority::High)
        .with_due_date(start() + Duration::hours(5))
        .blocking(vec!["t2".to_string()]);
    tasks.create(task.clone()).await.unwrap();

    let context = harness.builder.get("t1").await.unwrap().unwrap();
    assert_eq!(context.version, 1);
    assert_eq!(context.entity_kind, "task");
    assert_eq!(context.context_score, 95);
    assert_eq!(context.dimensions.temporal.relative_time.hours_until, Some(5));

    let done = task
        .with_priority(TaskPriority::Low)
        .with_status(TaskStatus::Done);
    tasks.update(done).await.unwrap();

    let context = harness.builder.get("t1").await.unwrap().unwrap();
    assert_eq!(context.version, 2);
    assert_eq!(context.context_score, 80);

    tasks.delete("t1").await.unwrap();
    assert!(harness.builder.get("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_mutation_emits_nothing() {
    let harness = Harness::new();
    let tasks = harness.repository::<Task>(TASK_KIND, &BusConfig::default());

    let missing = Task::new("ghost", "u1", "Never stored", start());
    assert!(tasks.update(missing).await.is_err());
    assert!(tasks.delete("ghost").await.is_err());
    assert!(harness.builder.get("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_mixed_kinds_and_owner_queries() {
    let harness = Harness::new();
    let tasks = harness.repository::<Task>(TASK_KIND, &BusConfig::default());
    let reminders = harness.repository::<Reminder>("reminder", &BusConfig::default());

    tasks
        .create(
            Task::new("t1", "u1", "Urgent", start())
                .with_priority(TaskPriority::Urgent)
                .with_due_date(start() + Duration::hours(2)),
        )
        .await
        .unwrap();
    tasks
        .create(Task::new("t2", "u1", "Someday", start()).with_priority(TaskPriority::Low))
        .await
        .unwrap();
    reminders
        .create(Reminder::new("r1", "u1", "Call back", start() + Duration::days(10)))
        .await
        .unwrap();
    tasks
        .create(Task::new("t3", "u2", "Other owner", start()))
        .await
        .unwrap();

    let all = harness
        .builder
        .query_by_owner("u1", &ContextQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].entity_id, "t1");

    let only_reminders = harness
        .builder
        .query_by_owner("u1", &ContextQuery::default().with_entity_kind("reminder"))
        .await
        .unwrap();
    assert_eq!(only_reminders.len(), 1);
    assert_eq!(only_reminders[0].entity_id, "r1");

    let high = harness.builder.high_priority("u1").await.unwrap();
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].entity_id, "t1");
    assert!(high[0].context_score >= 70);
}

#[tokio::test]
async fn test_detached_emission_eventually_builds() {
    let harness = Harness::new();
    let config = BusConfig {
        detached_emit: true,
    };
    let tasks = harness.repository::<Task>(TASK_KIND, &config);

    tasks
        .create(Task::new("t1", "u1", "Background", start()))
        .await
        .unwrap();

    let mut built = None;
    for _ in 0..100 {
        built = harness.builder.get("t1").await.unwrap();
        if built.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(built.unwrap().version, 1);
}

#[tokio::test]
async fn test_deadline_priority_analyzer_from_config() {
    let config = EngineConfig {
        deadline_priority: true,
        ..EngineConfig::default()
    };
    let harness = Harness::with_engine(&config);

    let task = Task::new("t1", "u1", "Invoice", start())
        .with_priority(TaskPriority::Medium)
        .with_due_date(start() + Duration::hours(3));
    let context = harness.builder.build_context(&task).await.unwrap();

    // 0.5 * 50 + 0.3 * 90 + 0.2 * 50
    assert_eq!(context.dimensions.priority.factors.urgency, 90);
    assert_eq!(context.dimensions.priority.computed_priority, 62);
    assert_eq!(context.context_score, 75);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_builds_count_every_version() {
    let harness = Harness::new();
    let task = Task::new("t1", "u1", "Contended", start());

    let handles: Vec<_> = (0..24)
        .map(|_| {
            let builder = harness.builder.clone();
            let task = task.clone();
            tokio::spawn(async move { builder.build_context(&task).await })
        })
        .collect();

    let mut versions = Vec::new();
    for handle in handles {
        versions.push(handle.await.unwrap().unwrap().version);
    }
    versions.sort_unstable();

    assert_eq!(versions, (1..=24).collect::<Vec<u64>>());
    let stored = harness.builder.get("t1").await.unwrap().unwrap();
    assert_eq!(stored.version, 24);
}

#[tokio::test]
async fn test_invalidate_unknown_entity_is_noop() {
    let harness = Harness::new();
    harness.builder.invalidate_context("nope").await.unwrap();
    harness.builder.invalidate_context("nope").await.unwrap();
    assert!(harness.builder.get("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rebuild_after_clock_moves_keeps_created_at() {
    let harness = Harness::new();
    let task = Task::new("t1", "u1", "Aging", start()).with_due_date(start() + Duration::hours(30));

    let first = harness.builder.build_context(&task).await.unwrap();
    assert_eq!(first.context_score, 60);

    harness.clock.advance(Duration::hours(10));
    let second = harness.builder.build_context(&task).await.unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.last_updated, start() + Duration::hours(10));
    assert_eq!(second.context_score, 70);
}

proptest! {
    #[test]
    fn prop_task_score_stays_in_range(
        offset_hours in -2000i64..2000,
        level in 0usize..4,
        blocks in any::<bool>(),
        dated in any::<bool>(),
    ) {
        let priority = [
            TaskPriority::Low,
            TaskPriority::Medium,
            TaskPriority::High,
            TaskPriority::Urgent,
        ][level];

        let mut task = Task::new("p1", "u1", "Generated", start()).with_priority(priority);
        if dated {
            task = task.with_due_date(start() + Duration::hours(offset_hours));
        }
        if blocks {
            task = task.blocking(vec!["p2".to_string()]);
        }

        let harness = Harness::new();
        let context = tokio_test::block_on(harness.builder.build_context(&task)).unwrap();

        prop_assert!(context.context_score >= 50);
        prop_assert!(context.context_score <= 100);
    }
}
