//! In-memory reference repository with post-commit change emission

use super::bus::{ChangeHandler, SubscriptionId};
use super::emitter::ChangeEmitter;
use crate::context::ContextEntity;
use crate::error::{ContextError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Repository of one entity kind
///
/// Every mutation commits to the backing map first and emits afterwards.
/// Failed mutations emit nothing; failed deliveries never fail the mutation.
pub struct InMemoryRepository<T> {
    records: DashMap<String, T>,
    emitter: ChangeEmitter,
}

impl<T> InMemoryRepository<T>
where
    T: ContextEntity + Serialize + Clone + 'static,
{
    pub fn new(emitter: ChangeEmitter) -> Self {
        Self {
            records: DashMap::new(),
            emitter,
        }
    }

    pub fn emitter(&self) -> &ChangeEmitter {
        &self.emitter
    }

    pub fn attach(&self, observer: Arc<dyn ChangeHandler>) -> SubscriptionId {
        self.emitter.attach(observer)
    }

    pub fn detach(&self, id: SubscriptionId) -> bool {
        self.emitter.detach(id)
    }

    pub async fn create(&self, record: T) -> Result<T> {
        let payload = serde_json::to_value(&record)?;

        match self.records.entry(record.id().to_string()) {
            Entry::Occupied(_) => {
                return Err(ContextError::Conflict(format!(
                    "{} {} already exists",
                    self.emitter.entity_kind(),
                    record.id()
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
            }
        }

        debug!(entity_id = record.id(), "Record created");
        self.emitter
            .emit_created(record.id(), record.owner_id(), payload)
            .await;
        Ok(record)
    }

    pub async fn update(&self, record: T) -> Result<T> {
        let payload = serde_json::to_value(&record)?;

        match self.records.get_mut(record.id()) {
            Some(mut existing) => *existing = record.clone(),
            None => return Err(self.not_found(record.id())),
        }

        debug!(entity_id = record.id(), "Record updated");
        self.emitter
            .emit_updated(record.id(), record.owner_id(), payload)
            .await;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<T> {
        let (_, removed) = self
            .records
            .remove(id)
            .ok_or_else(|| self.not_found(id))?;

        debug!(entity_id = id, "Record deleted");
        self.emitter.emit_deleted(id, removed.owner_id()).await;
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    pub fn list_by_owner(&self, owner_id: &str) -> Vec<T> {
        let mut records: Vec<T> = self
            .records
            .iter()
            .filter(|entry| entry.value().owner_id() == owner_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.id().cmp(b.id()));
        records
    }

    fn not_found(&self, id: &str) -> ContextError {
        ContextError::NotFound(format!("{} {}", self.emitter.entity_kind(), id))
    }
}
