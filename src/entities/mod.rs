//! Reference entity kinds

pub mod reminder;
pub mod task;

pub use reminder::{Reminder, REMINDER_KIND};
pub use task::{Task, TaskPriority, TaskStatus, TASK_KIND};

use crate::context::EntityRegistry;

/// Registry with decoders for every reference entity kind
pub fn default_registry() -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    registry.register_serde::<Task>(TASK_KIND);
    registry.register_serde::<Reminder>(REMINDER_KIND);
    registry
}
