//! Definiciones de eventos de migración y trait EventStore.

mod store;
mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{MigrationEvent, MigrationEventKind};
