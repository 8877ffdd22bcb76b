//! Contextual scoring
//!
//! This module derives five context dimensions for a domain entity, enriches
//! them through pluggable analyzers, scores the result and persists it as a
//! versioned unified context.

pub mod analyzers;
pub mod builder;
pub mod entity;
pub mod models;
pub mod recompute;
pub mod retention;
pub mod scoring;
pub mod store;

pub use analyzers::{
    urgency_at, AnalyzerSet, DeadlinePriorityAnalyzer, DimensionAnalyzer, NoopAnalyzer,
    TemporalAnalyzer,
};
pub use builder::ContextBuilder;
pub use entity::{ContextEntity, EntityDecoder, EntityRegistry};
pub use models::*;
pub use recompute::ContextRecomputeHandler;
pub use retention::{spawn_retention_sweep, sweep_once};
pub use scoring::context_score;
pub use store::{ContextQuery, ContextStore, InMemoryContextStore, HIGH_PRIORITY_MIN_SCORE};
