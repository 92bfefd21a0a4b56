//! deploy-core: secuenciador determinista de migraciones de contratos.
//!
//! Un plan es una lista de unidades numeradas; cada unidad pide al backend
//! el despliegue de sus artifacts, en orden, esperando cada confirmación.
//! Las unidades corren en orden ascendente y un fallo detiene el run.
pub mod artifacts;
pub mod backend;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod repo;
pub mod unit;

pub use artifacts::{ArtifactStore, InMemoryArtifactStore};
pub use backend::{BackendError, DeployRequest, DeploymentBackend, DeploymentReceipt, ScriptedBackend};
pub use engine::{RunCtx, RunSummary, Sequencer, SequencerBuilderInit};
pub use errors::DeployError;
pub use event::{EventStore, InMemoryEventStore, MigrationEvent, MigrationEventKind};
pub use model::{CompiledArtifact, DeploymentRecord};
pub use repo::{InMemoryRunRepository, RunInstance, RunRepository, UnitSlot};
pub use unit::{MigrationPlan, MigrationUnit, UnitStatus};
