//! Change notification
//!
//! - `event`: the immutable change record
//! - `bus`: concurrent fan-out with per-handler isolation
//! - `emitter`: post-commit emission used by repositories
//! - `repository`: in-memory reference repository

pub mod bus;
pub mod emitter;
pub mod event;
pub mod repository;

pub use bus::{handler_fn, ChangeBus, ChangeHandler, FnHandler, PublishReport, SubscriptionId};
pub use emitter::ChangeEmitter;
pub use event::{ChangeEvent, ChangeKind};
pub use repository::InMemoryRepository;
