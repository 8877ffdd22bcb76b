//! Entity capability interface and the kind-keyed decoder registry
//!
//! Any domain object can be scored as long as it exposes an id, an owner and
//! a kind tag. The five `extract_*` methods are optional capabilities: an
//! entity that does not override one gets the documented default for that
//! dimension.

use super::models::{
    IntentionalContext, PriorityContext, RelationalContext, SpatialContext, TemporalContext,
};
use crate::error::{ContextError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Domain object that can be turned into a unified context
pub trait ContextEntity: Send + Sync {
    fn id(&self) -> &str;

    fn owner_id(&self) -> &str;

    /// Tag of the originating repository's domain type
    fn entity_kind(&self) -> &str;

    fn extract_temporal_context(&self) -> Option<TemporalContext> {
        None
    }

    fn extract_spatial_context(&self) -> Option<SpatialContext> {
        None
    }

    fn extract_priority_context(&self) -> Option<PriorityContext> {
        None
    }

    fn extract_relational_context(&self) -> Option<RelationalContext> {
        None
    }

    fn extract_intentional_context(&self) -> Option<IntentionalContext> {
        None
    }
}

/// Turns a change-event payload into an entity
pub trait EntityDecoder: Send + Sync {
    fn decode(&self, payload: &Value) -> Result<Arc<dyn ContextEntity>>;
}

/// Decoder for any serde-deserializable entity type
struct SerdeDecoder<T> {
    kind: String,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> EntityDecoder for SerdeDecoder<T>
where
    T: ContextEntity + DeserializeOwned + 'static,
{
    fn decode(&self, payload: &Value) -> Result<Arc<dyn ContextEntity>> {
        let entity: T = serde_json::from_value(payload.clone()).map_err(|e| ContextError::Decode {
            entity_kind: self.kind.clone(),
            message: e.to_string(),
        })?;
        Ok(Arc::new(entity))
    }
}

/// Registry of decoders keyed by entity-kind tag
#[derive(Default)]
pub struct EntityRegistry {
    decoders: HashMap<String, Arc<dyn EntityDecoder>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom decoder for a kind, replacing any previous one
    pub fn register(&mut self, kind: impl Into<String>, decoder: Arc<dyn EntityDecoder>) {
        let kind = kind.into();
        debug!("Registering entity decoder for kind '{}'", kind);
        self.decoders.insert(kind, decoder);
    }

    /// Register a serde-backed decoder for `T`
    pub fn register_serde<T>(&mut self, kind: impl Into<String>)
    where
        T: ContextEntity + DeserializeOwned + 'static,
    {
        let kind = kind.into();
        let decoder = SerdeDecoder::<T> {
            kind: kind.clone(),
            _marker: std::marker::PhantomData,
        };
        self.register(kind, Arc::new(decoder));
    }

    /// Decode a payload of the given kind
    pub fn decode(&self, kind: &str, payload: &Value) -> Result<Arc<dyn ContextEntity>> {
        let decoder = self
            .decoders
            .get(kind)
            .ok_or_else(|| ContextError::UnknownEntityKind(kind.to_string()))?;
        decoder.decode(payload)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.decoders.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }
}
