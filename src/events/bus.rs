//! Change notification bus
//!
//! Typed publish/subscribe keyed by change-kind topic. Every handler for a
//! published kind runs on its own task; `publish` returns once all of them
//! have settled. A handler that errors or panics is logged and counted and
//! never affects its siblings or the publisher.

use super::event::ChangeEvent;
use crate::metrics::METRICS;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber to change events
///
/// Well-behaved handlers deal with their own errors; anything returned or
/// panicked is caught and logged by the bus.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, event: &ChangeEvent) -> anyhow::Result<()>;
}

/// Handler backed by an async closure
pub struct FnHandler<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> ChangeHandler for FnHandler<F>
where
    F: Fn(ChangeEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &ChangeEvent) -> anyhow::Result<()> {
        (self.f)(event.clone()).await
    }
}

/// Wrap an async closure as a handler
pub fn handler_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn ChangeHandler>
where
    F: Fn(ChangeEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        f,
    })
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

impl PublishReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }

    pub fn merge(self, other: PublishReport) -> PublishReport {
        PublishReport {
            delivered: self.delivered + other.delivered,
            failed: self.failed + other.failed,
        }
    }
}

struct Subscription {
    id: SubscriptionId,
    handler: Arc<dyn ChangeHandler>,
}

/// Run every handler concurrently on its own task and wait for all of them
pub(crate) async fn dispatch(
    handlers: Vec<Arc<dyn ChangeHandler>>,
    event: Arc<ChangeEvent>,
) -> PublishReport {
    let (names, tasks): (Vec<String>, Vec<_>) = handlers
        .into_iter()
        .map(|handler| {
            let event = event.clone();
            let name = handler.name().to_string();
            let task = tokio::spawn(async move { handler.handle(&event).await });
            (name, task)
        })
        .unzip();

    let mut report = PublishReport::default();

    for (name, outcome) in names.iter().zip(join_all(tasks).await) {
        match outcome {
            Ok(Ok(())) => report.delivered += 1,
            Ok(Err(e)) => {
                report.failed += 1;
                error!(
                    handler = %name,
                    event_id = %event.id,
                    kind = %event.kind,
                    entity_id = %event.entity_id,
                    "Change handler failed: {:#}",
                    e
                );
            }
            Err(join_error) => {
                report.failed += 1;
                error!(
                    handler = %name,
                    event_id = %event.id,
                    kind = %event.kind,
                    entity_id = %event.entity_id,
                    "Change handler panicked or was cancelled: {}",
                    join_error
                );
            }
        }
    }

    report
}

/// Publish/subscribe hub shared by repositories and subscribers
///
/// Created once by the composition root and passed around as `Arc<ChangeBus>`.
#[derive(Default)]
pub struct ChangeBus {
    handlers: DashMap<String, Vec<Subscription>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event kind
    pub fn subscribe(&self, kind: impl AsRef<str>, handler: Arc<dyn ChangeHandler>) -> SubscriptionId {
        let id = SubscriptionId::new();
        debug!(kind = kind.as_ref(), handler = handler.name(), "Subscribing handler");
        self.handlers
            .entry(kind.as_ref().to_string())
            .or_default()
            .push(Subscription { id, handler });
        id
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, kind: impl AsRef<str>, id: SubscriptionId) -> bool {
        let kind = kind.as_ref();
        let removed = match self.handlers.get_mut(kind) {
            Some(mut subs) => {
                let before = subs.len();
                subs.retain(|sub| sub.id != id);
                subs.len() != before
            }
            None => false,
        };

        self.handlers.remove_if(kind, |_, subs| subs.is_empty());
        removed
    }

    /// Deliver an event to every handler of its kind
    pub async fn publish(&self, event: ChangeEvent) -> PublishReport {
        let kind = event.kind.as_str();

        // Snapshot so no map lock is held while handlers run
        let handlers: Vec<Arc<dyn ChangeHandler>> = self
            .handlers
            .get(kind)
            .map(|subs| subs.iter().map(|sub| sub.handler.clone()).collect())
            .unwrap_or_default();

        debug!(
            event_id = %event.id,
            kind,
            entity_kind = %event.entity_kind,
            entity_id = %event.entity_id,
            handlers = handlers.len(),
            "Publishing change event"
        );

        let report = dispatch(handlers, Arc::new(event)).await;
        METRICS.record_publish(kind, report.failed);
        report
    }

    /// Kinds with at least one handler, sorted
    pub fn list_event_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .handlers
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        kinds.sort();
        kinds
    }

    pub fn handler_count(&self, kind: impl AsRef<str>) -> usize {
        self.handlers
            .get(kind.as_ref())
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.handlers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event::ChangeKind;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn event(kind: ChangeKind) -> ChangeEvent {
        ChangeEvent::new(kind, "task", "t1", "u1", None, Utc::now())
    }

    fn counting(counter: Arc<AtomicUsize>) -> Arc<dyn ChangeHandler> {
        handler_fn("counter", move |_event| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    struct Panicking;

    #[async_trait]
    impl ChangeHandler for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn handle(&self, _event: &ChangeEvent) -> anyhow::Result<()> {
            panic!("handler blew up");
        }
    }

    #[tokio::test]
    async fn test_failing_handler_is_isolated() {
        let bus = ChangeBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe(ChangeKind::Create, handler_fn("failing", |_event| async {
            Err::<(), _>(anyhow::anyhow!("boom"))
        }));
        bus.subscribe(ChangeKind::Create, counting(counter.clone()));

        let report = bus.publish(event(ChangeKind::Create)).await;
        assert_eq!(report, PublishReport { delivered: 1, failed: 1 });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let bus = ChangeBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe(ChangeKind::Update, Arc::new(Panicking));
        bus.subscribe(ChangeKind::Update, counting(counter.clone()));

        let report = bus.publish(event(ChangeKind::Update)).await;
        assert_eq!(report.failed, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_only_matching_kind_is_delivered() {
        let bus = ChangeBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe(ChangeKind::Delete, counting(counter.clone()));

        let report = bus.publish(event(ChangeKind::Create)).await;
        assert_eq!(report.total(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handlers_run_concurrently_and_publish_waits() {
        let bus = ChangeBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let counter = counter.clone();
            bus.subscribe(ChangeKind::Create, handler_fn("slow", move |_event| {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }));
        }

        let start = std::time::Instant::now();
        let report = bus.publish(event(ChangeKind::Create)).await;

        assert_eq!(report.delivered, 4);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        // four sequential sleeps would take 800ms
        assert!(start.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let bus = ChangeBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let id = bus.subscribe(ChangeKind::Create, counting(counter.clone()));
        assert_eq!(bus.handler_count(ChangeKind::Create), 1);
        assert_eq!(bus.list_event_kinds(), vec!["CREATE".to_string()]);

        assert!(bus.unsubscribe(ChangeKind::Create, id));
        assert!(!bus.unsubscribe(ChangeKind::Create, id));
        assert!(!bus.unsubscribe("NEVER", SubscriptionId::new()));

        assert_eq!(bus.handler_count(ChangeKind::Create), 0);
        assert!(bus.list_event_kinds().is_empty());

        bus.publish(event(ChangeKind::Create)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let bus = ChangeBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe(ChangeKind::Create, counting(counter.clone()));
        bus.subscribe(ChangeKind::Delete, counting(counter.clone()));

        bus.clear();
        assert!(bus.list_event_kinds().is_empty());
        assert_eq!(bus.publish(event(ChangeKind::Create)).await.total(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_subscribe_and_publish() {
        let bus = Arc::new(ChangeBus::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let subscribers: Vec<_> = (0..16)
            .map(|_| {
                let bus = bus.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    let id = bus.subscribe(ChangeKind::Update, counting(counter));
                    bus.publish(event(ChangeKind::Update)).await;
                    bus.unsubscribe(ChangeKind::Update, id)
                })
            })
            .collect();

        for task in subscribers {
            assert!(task.await.unwrap());
        }
        assert_eq!(bus.handler_count(ChangeKind::Update), 0);
        // each publish saw at least its own handler
        assert!(counter.load(Ordering::SeqCst) >= 16);
    }
}
