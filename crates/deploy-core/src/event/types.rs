//! Tipos de evento de un run de migración y estructura `MigrationEvent`.
//!
//! Rol:
//! - Cada ejecución del `Sequencer` emite eventos a un `EventStore`
//!   append-only.
//! - El `RunRepository` reconstruye el estado del run (replay) sólo a partir
//!   de estos eventos, lo que permite reanudar un run tras reiniciar el
//!   proceso.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DeployError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationEventKind {
    /// Primer evento de todo `run_id`: fija el plan y la red.
    RunInitialized {
        plan_hash: String,
        unit_count: usize,
        network: String,
    },
    /// Una unidad comenzó. `attempt` empieza en 1.
    UnitStarted { sequence: u32, name: String, attempt: u32 },
    /// Se pidió al backend publicar un artifact ya resuelto.
    DeployRequested {
        sequence: u32,
        artifact: String,
        artifact_hash: String,
    },
    /// El backend aceptó la publicación.
    DeployFinished {
        sequence: u32,
        artifact: String,
        address: String,
        transaction_hash: String,
    },
    /// La unidad terminó con error terminal. `artifact` es el que falló
    /// (resolución o despliegue). El run no continúa (stop-on-failure).
    UnitFailed {
        sequence: u32,
        artifact: String,
        error: DeployError,
    },
    /// Todos los artifacts de la unidad quedaron publicados.
    UnitCompleted { sequence: u32, fingerprint: String },
    /// Acción de operador: rearma una unidad fallida.
    UnitRetryScheduled {
        sequence: u32,
        reason: Option<String>,
        attempt: u32,
    },
    /// Cierre del run con el fingerprint agregado de sus unidades.
    RunCompleted { run_fingerprint: String },
}

impl MigrationEventKind {
    /// Variante compacta, útil en tests y logs.
    pub fn code(&self) -> &'static str {
        match self {
            MigrationEventKind::RunInitialized { .. } => "I",
            MigrationEventKind::UnitStarted { .. } => "S",
            MigrationEventKind::DeployRequested { .. } => "Q",
            MigrationEventKind::DeployFinished { .. } => "D",
            MigrationEventKind::UnitFailed { .. } => "X",
            MigrationEventKind::UnitCompleted { .. } => "U",
            MigrationEventKind::UnitRetryScheduled { .. } => "R",
            MigrationEventKind::RunCompleted { .. } => "C",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationEvent {
    pub seq: u64, // asignado por el store (orden append, contiguo por run)
    pub run_id: Uuid,
    pub kind: MigrationEventKind,
    pub ts: DateTime<Utc>, // metadato (no entra en fingerprint)
}
