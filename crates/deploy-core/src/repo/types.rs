//! Estado reconstruido de un run (`RunInstance`).
//!
//! El repositorio aplica un replay lineal: consume los eventos en orden y
//! actualiza un slot por unidad del plan. Los eventos de unidades que no
//! están en el plan actual (p.ej. al filtrar con un rango) se ignoran.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::constants::DEFAULT_NETWORK;
use crate::errors::DeployError;
use crate::event::{MigrationEvent, MigrationEventKind};
use crate::model::DeploymentRecord;
use crate::unit::{MigrationPlan, UnitStatus};

#[derive(Debug, Clone)]
pub struct RunInstance {
    pub id: Uuid,
    pub network: String,
    pub units: Vec<UnitSlot>,
    /// Índice de la primera unidad no completada (== `units.len()` si no queda ninguna).
    pub cursor: usize,
    pub completed: bool,
}

impl RunInstance {
    pub fn slot(&self, sequence: u32) -> Option<&UnitSlot> {
        self.units.iter().find(|s| s.sequence == sequence)
    }

    /// Unidad fallida que bloquea el run, si la hay.
    pub fn failed_unit(&self) -> Option<&UnitSlot> {
        self.units
            .get(self.cursor)
            .filter(|s| matches!(s.status, UnitStatus::Failed))
    }

    /// Unidades completadas cuyo despliegue ya no coincide con `plan`
    /// (artifacts distintos o en otro orden).
    pub fn changed_units(&self, plan: &MigrationPlan) -> Vec<u32> {
        self.units
            .iter()
            .filter(|s| matches!(s.status, UnitStatus::Completed))
            .filter(|s| {
                plan.unit(s.sequence).is_some_and(|u| {
                                         !s.deployments
                                           .iter()
                                           .map(|d| d.artifact.as_str())
                                           .eq(u.artifacts.iter().map(String::as_str))
                                     })
            })
            .map(|s| s.sequence)
            .collect()
    }

    /// Registros de despliegue de las unidades completadas, en orden.
    pub fn deployments(&self) -> Vec<DeploymentRecord> {
        self.units
            .iter()
            .filter(|s| matches!(s.status, UnitStatus::Completed))
            .flat_map(|s| s.deployments.iter().cloned())
            .collect()
    }
}

/// Estado de una unidad en la instancia.
#[derive(Debug, Clone)]
pub struct UnitSlot {
    pub sequence: u32,
    pub name: String,
    pub status: UnitStatus,
    pub fingerprint: Option<String>,
    pub deployments: Vec<DeploymentRecord>,
    pub error: Option<DeployError>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempts: u32,
}

/// Trait para reconstruir (`replay`) el estado de un run a partir de eventos.
pub trait RunRepository {
    fn load(&self, run_id: Uuid, events: &[MigrationEvent], plan: &MigrationPlan) -> RunInstance;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryRunRepository;

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self
    }
}

impl RunRepository for InMemoryRunRepository {
    fn load(&self, run_id: Uuid, events: &[MigrationEvent], plan: &MigrationPlan) -> RunInstance {
        let mut units: Vec<UnitSlot> = plan.units()
                                           .iter()
                                           .map(|u| UnitSlot { sequence: u.sequence,
                                                               name: u.name.clone(),
                                                               status: UnitStatus::Pending,
                                                               fingerprint: None,
                                                               deployments: vec![],
                                                               error: None,
                                                               started_at: None,
                                                               finished_at: None,
                                                               attempts: 0 })
                                           .collect();
        let mut network = DEFAULT_NETWORK.to_string();
        for ev in events {
            if let MigrationEventKind::RunInitialized { network: n, .. } = &ev.kind {
                network = n.clone();
                continue;
            }
            let Some(slot) = event_sequence(&ev.kind).and_then(|seq| units.iter_mut().find(|s| s.sequence == seq))
            else {
                continue;
            };
            match &ev.kind {
                MigrationEventKind::UnitStarted { attempt, .. } => {
                    slot.status = UnitStatus::Running;
                    slot.started_at = Some(ev.ts);
                    slot.finished_at = None;
                    slot.attempts = *attempt;
                    slot.deployments.clear();
                    slot.error = None;
                }
                MigrationEventKind::DeployFinished { sequence,
                                                     artifact,
                                                     address,
                                                     transaction_hash, } => {
                    slot.deployments.push(DeploymentRecord { artifact: artifact.clone(),
                                                             unit: *sequence,
                                                             address: address.clone(),
                                                             transaction_hash: transaction_hash.clone(),
                                                             network: network.clone(),
                                                             deployed_at: ev.ts });
                }
                MigrationEventKind::UnitFailed { error, .. } => {
                    slot.status = UnitStatus::Failed;
                    slot.error = Some(error.clone());
                    slot.finished_at = Some(ev.ts);
                }
                MigrationEventKind::UnitCompleted { fingerprint, .. } => {
                    slot.status = UnitStatus::Completed;
                    slot.fingerprint = Some(fingerprint.clone());
                    slot.finished_at = Some(ev.ts);
                }
                MigrationEventKind::UnitRetryScheduled { .. } => {
                    slot.status = UnitStatus::Pending;
                    slot.error = None;
                }
                MigrationEventKind::DeployRequested { .. }
                | MigrationEventKind::RunInitialized { .. }
                | MigrationEventKind::RunCompleted { .. } => {}
            }
        }
        let cursor = units.iter()
                          .position(|s| !matches!(s.status, UnitStatus::Completed))
                          .unwrap_or(units.len());
        let completed = cursor == units.len();
        RunInstance { id: run_id,
                      network,
                      units,
                      cursor,
                      completed }
    }
}

fn event_sequence(kind: &MigrationEventKind) -> Option<u32> {
    match kind {
        MigrationEventKind::UnitStarted { sequence, .. }
        | MigrationEventKind::DeployRequested { sequence, .. }
        | MigrationEventKind::DeployFinished { sequence, .. }
        | MigrationEventKind::UnitFailed { sequence, .. }
        | MigrationEventKind::UnitCompleted { sequence, .. }
        | MigrationEventKind::UnitRetryScheduled { sequence, .. } => Some(*sequence),
        MigrationEventKind::RunInitialized { .. } | MigrationEventKind::RunCompleted { .. } => None,
    }
}
