//! Contexto de ejecución de un run concreto.

use uuid::Uuid;

use crate::artifacts::ArtifactStore;
use crate::backend::DeploymentBackend;
use crate::engine::Sequencer;
use crate::errors::DeployError;
use crate::event::EventStore;
use crate::model::DeploymentRecord;
use crate::repo::RunRepository;
use crate::unit::MigrationPlan;

/// Agrupa secuenciador, run, plan, store de artifacts y backend para avanzar
/// un run sin repetir argumentos.
pub struct RunCtx<'a, E, R, A, B>
    where E: EventStore,
          R: RunRepository,
          A: ArtifactStore + ?Sized,
          B: DeploymentBackend + ?Sized
{
    pub sequencer: &'a mut Sequencer<E, R>,
    pub run_id: Uuid,
    pub plan: &'a MigrationPlan,
    pub artifacts: &'a A,
    pub backend: &'a mut B,
}

impl<'a, E, R, A, B> RunCtx<'a, E, R, A, B>
    where E: EventStore,
          R: RunRepository,
          A: ArtifactStore + ?Sized,
          B: DeploymentBackend + ?Sized
{
    #[inline]
    pub fn new(sequencer: &'a mut Sequencer<E, R>,
               run_id: Uuid,
               plan: &'a MigrationPlan,
               artifacts: &'a A,
               backend: &'a mut B)
               -> Self {
        Self { sequencer,
               run_id,
               plan,
               artifacts,
               backend }
    }

    /// Ejecuta la siguiente unidad.
    #[inline]
    pub fn step(&mut self) -> Result<Vec<DeploymentRecord>, DeployError> {
        self.sequencer
            .next_with(self.run_id, self.plan, self.artifacts, &mut *self.backend)
    }

    /// Ejecuta hasta `n` unidades o hasta que ocurra un error terminal.
    pub fn run_n(&mut self, n: usize) -> Result<Vec<DeploymentRecord>, DeployError> {
        let mut out = Vec::new();
        for _ in 0..n {
            match self.step() {
                Ok(records) => out.extend(records),
                Err(DeployError::RunCompleted) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Ejecuta unidades hasta completar el run o fallar.
    pub fn run_to_completion(&mut self) -> Result<Vec<DeploymentRecord>, DeployError> {
        self.run_n(usize::MAX)
    }
}
