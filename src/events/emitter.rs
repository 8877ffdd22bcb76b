//! Post-commit change emission for repositories
//!
//! A repository commits its mutation first and only then hands the change to
//! its emitter. Delivery goes to the shared bus and to any directly attached
//! observers with the same isolation guarantees; delivery failures are logged
//! and never reach the mutation's caller.

use super::bus::{dispatch, ChangeBus, ChangeHandler, PublishReport, SubscriptionId};
use super::event::{ChangeEvent, ChangeKind};
use crate::clock::Clock;
use crate::config::BusConfig;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Emits change events on behalf of one repository
pub struct ChangeEmitter {
    bus: Arc<ChangeBus>,
    entity_kind: String,
    observers: DashMap<SubscriptionId, Arc<dyn ChangeHandler>>,
    clock: Arc<dyn Clock>,
    detached: bool,
}

impl ChangeEmitter {
    pub fn new(bus: Arc<ChangeBus>, entity_kind: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            bus,
            entity_kind: entity_kind.into(),
            observers: DashMap::new(),
            clock,
            detached: false,
        }
    }

    /// Apply bus settings (awaited vs detached delivery)
    pub fn with_config(mut self, config: &BusConfig) -> Self {
        self.detached = config.detached_emit;
        self
    }

    pub fn entity_kind(&self) -> &str {
        &self.entity_kind
    }

    /// Register a direct observer that sees every change of this repository
    pub fn attach(&self, observer: Arc<dyn ChangeHandler>) -> SubscriptionId {
        let id = SubscriptionId::new();
        debug!(
            entity_kind = %self.entity_kind,
            observer = observer.name(),
            "Attaching observer"
        );
        self.observers.insert(id, observer);
        id
    }

    /// Remove a direct observer; returns whether it was attached
    pub fn detach(&self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub async fn emit_created(&self, entity_id: &str, owner_id: &str, payload: Value) {
        self.emit(ChangeKind::Create, entity_id, owner_id, Some(payload))
            .await
    }

    pub async fn emit_updated(&self, entity_id: &str, owner_id: &str, payload: Value) {
        self.emit(ChangeKind::Update, entity_id, owner_id, Some(payload))
            .await
    }

    pub async fn emit_deleted(&self, entity_id: &str, owner_id: &str) {
        self.emit(ChangeKind::Delete, entity_id, owner_id, None).await
    }

    /// Post-commit step: build the event and deliver it
    ///
    /// Awaits delivery unless the emitter is detached, in which case the
    /// delivery runs on a spawned task and this returns immediately.
    pub async fn emit(
        &self,
        kind: ChangeKind,
        entity_id: &str,
        owner_id: &str,
        payload: Option<Value>,
    ) {
        let event = ChangeEvent::new(
            kind,
            self.entity_kind.clone(),
            entity_id,
            owner_id,
            payload,
            self.clock.now(),
        );

        let observers: Vec<Arc<dyn ChangeHandler>> = self
            .observers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        if self.detached {
            let bus = self.bus.clone();
            tokio::spawn(async move {
                let report = deliver(bus, observers, event).await;
                log_report(&report);
            });
        } else {
            let report = deliver(self.bus.clone(), observers, event).await;
            log_report(&report);
        }
    }
}

/// Bus publish and direct observers, run side by side
async fn deliver(
    bus: Arc<ChangeBus>,
    observers: Vec<Arc<dyn ChangeHandler>>,
    event: ChangeEvent,
) -> PublishReport {
    let observed = Arc::new(event.clone());
    let (published, direct) = tokio::join!(bus.publish(event), dispatch(observers, observed));
    published.merge(direct)
}

fn log_report(report: &PublishReport) {
    if report.failed > 0 {
        warn!(
            delivered = report.delivered,
            failed = report.failed,
            "Change committed but some deliveries failed"
        );
    } else {
        debug!(delivered = report.delivered, "Change delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::events::bus::handler_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting(counter: Arc<AtomicUsize>) -> Arc<dyn ChangeHandler> {
        handler_fn("counter", move |_event| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_emit_reaches_bus_and_observers() {
        let bus = Arc::new(ChangeBus::new());
        let emitter = ChangeEmitter::new(bus.clone(), "task", Arc::new(SystemClock));

        let bus_hits = Arc::new(AtomicUsize::new(0));
        let observer_hits = Arc::new(AtomicUsize::new(0));
        bus.subscribe(ChangeKind::Create, counting(bus_hits.clone()));
        let id = emitter.attach(counting(observer_hits.clone()));

        emitter
            .emit_created("t1", "u1", serde_json::json!({ "id": "t1" }))
            .await;
        assert_eq!(bus_hits.load(Ordering::SeqCst), 1);
        assert_eq!(observer_hits.load(Ordering::SeqCst), 1);

        // observers see every kind, the bus only subscribed kinds
        emitter.emit_deleted("t1", "u1").await;
        assert_eq!(bus_hits.load(Ordering::SeqCst), 1);
        assert_eq!(observer_hits.load(Ordering::SeqCst), 2);

        assert!(emitter.detach(id));
        assert!(!emitter.detach(id));
        emitter.emit_deleted("t1", "u1").await;
        assert_eq!(observer_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_observer_does_not_fail_emit() {
        let bus = Arc::new(ChangeBus::new());
        let emitter = ChangeEmitter::new(bus.clone(), "task", Arc::new(SystemClock));
        let hits = Arc::new(AtomicUsize::new(0));

        emitter.attach(handler_fn("broken", |_event| async {
            Err::<(), _>(anyhow::anyhow!("observer down"))
        }));
        bus.subscribe(ChangeKind::Update, counting(hits.clone()));

        emitter
            .emit_updated("t1", "u1", serde_json::json!({}))
            .await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detached_emit_returns_before_delivery() {
        let bus = Arc::new(ChangeBus::new());
        let emitter = ChangeEmitter::new(bus.clone(), "task", Arc::new(SystemClock))
            .with_config(&BusConfig { detached_emit: true });
        let hits = Arc::new(AtomicUsize::new(0));

        let slow_hits = hits.clone();
        bus.subscribe(ChangeKind::Create, handler_fn("slow", move |_event| {
            let hits = slow_hits.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        emitter
            .emit_created("t1", "u1", serde_json::json!({}))
            .await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
