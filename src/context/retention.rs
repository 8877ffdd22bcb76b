//! Periodic retention sweep over the context store

use super::store::ContextStore;
use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::error::{ContextError, Result};
use crate::metrics::METRICS;
use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Purge contexts not updated within the retention window; returns the count removed
pub async fn sweep_once(
    store: &dyn ContextStore,
    clock: &dyn Clock,
    retention_days: u32,
) -> Result<usize> {
    let now = clock.now();
    let cutoff = now
        .checked_sub_signed(Duration::days(retention_days as i64))
        .ok_or_else(|| {
            ContextError::Configuration(format!(
                "retention_days {} reaches before the earliest representable date",
                retention_days
            ))
        })?;
    let removed = store.purge_older_than(cutoff).await?;
    METRICS.record_purge(removed);
    Ok(removed)
}

/// Run `sweep_once` every `sweep_interval_secs` until the handle is aborted
pub fn spawn_retention_sweep(
    store: Arc<dyn ContextStore>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = std::time::Duration::from_secs(config.sweep_interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            retention_days = config.retention_days,
            interval_secs = period.as_secs(),
            "Retention sweep started"
        );

        loop {
            interval.tick().await;
            match sweep_once(store.as_ref(), clock.as_ref(), config.retention_days).await {
                Ok(removed) => info!(removed, "Retention sweep finished"),
                Err(e) => error!("Retention sweep failed: {}", e),
            }
        }
    })
}
