use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{MigrationEvent, MigrationEventKind};
use crate::errors::DeployError;

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&mut self, run_id: Uuid, kind: MigrationEventKind) -> Result<MigrationEvent, DeployError>;
    /// Lista eventos de un run (orden ascendente por seq).
    fn list(&self, run_id: Uuid) -> Vec<MigrationEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: HashMap<Uuid, Vec<MigrationEvent>>,
}

impl InMemoryEventStore {
    pub fn runs(&self) -> impl Iterator<Item = &Uuid> {
        self.inner.keys()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: MigrationEventKind) -> Result<MigrationEvent, DeployError> {
        let events = self.inner.entry(run_id).or_default();
        let ev = MigrationEvent { seq: events.len() as u64,
                                  run_id,
                                  kind,
                                  ts: Utc::now() };
        events.push(ev.clone());
        Ok(ev)
    }

    fn list(&self, run_id: Uuid) -> Vec<MigrationEvent> {
        self.inner.get(&run_id).cloned().unwrap_or_default()
    }
}

impl<S: EventStore + ?Sized> EventStore for &mut S {
    fn append_kind(&mut self, run_id: Uuid, kind: MigrationEventKind) -> Result<MigrationEvent, DeployError> {
        (**self).append_kind(run_id, kind)
    }

    fn list(&self, run_id: Uuid) -> Vec<MigrationEvent> {
        (**self).list(run_id)
    }
}
