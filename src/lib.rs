//! Contextual scoring engine
//!
//! Derives five context dimensions (temporal, spatial, priority, relational,
//! intentional) for domain entities, enriches them through pluggable
//! analyzers, scores them and keeps a versioned record per entity. Writes in
//! the primary repositories reach the engine through a change bus so that
//! contexts are recomputed without coupling storage to scoring.

pub mod clock;
pub mod config;
pub mod context;
pub mod entities;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use context::{
    AnalyzerSet, ContextBuilder, ContextEntity, ContextQuery, ContextRecomputeHandler,
    ContextStore, EntityRegistry, InMemoryContextStore, UnifiedContext,
};
pub use error::{ContextError, Result};
pub use events::{ChangeBus, ChangeEmitter, ChangeEvent, ChangeHandler, ChangeKind};
pub use logging::init_logging;
pub use metrics::METRICS;
