//! Core Sequencer implementation

use serde_json::json;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::artifacts::ArtifactStore;
use crate::backend::{DeployRequest, DeploymentBackend};
use crate::constants::SEQUENCER_VERSION;
use crate::engine::SequencerBuilderInit;
use crate::errors::DeployError;
use crate::event::{EventStore, InMemoryEventStore, MigrationEvent, MigrationEventKind};
use crate::hashing::hash_value;
use crate::model::{CompiledArtifact, DeploymentRecord};
use crate::repo::{InMemoryRunRepository, RunInstance, RunRepository};
use crate::unit::{MigrationPlan, MigrationUnit, UnitStatus};

/// Resultado de ejecutar un plan (o lo que quedaba de él) hasta el final.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Despliegues hechos en esta invocación.
    pub deployed: Vec<DeploymentRecord>,
    /// Unidades que ya estaban completadas y se saltaron.
    pub skipped: Vec<u32>,
    pub run_fingerprint: Option<String>,
}

/// Secuenciador de despliegues.
///
/// Ejecuta las unidades de un `MigrationPlan` en orden ascendente. Dentro de
/// cada unidad resuelve todos los artifacts y luego pide al backend un
/// despliegue por nombre, en orden, esperando cada confirmación. Todo lo que
/// ocurre queda en el `EventStore`; el estado de un run se reconstruye por
/// replay con el `RunRepository`.
#[derive(Debug)]
pub struct Sequencer<E, R>
    where E: EventStore,
          R: RunRepository
{
    event_store: E,
    repository: R,
    default_run_id: Option<Uuid>,
    default_plan: Option<MigrationPlan>,
}

impl<E, R> Sequencer<E, R>
    where E: EventStore,
          R: RunRepository
{
    /// Crea un nuevo builder para configurar el secuenciador
    #[inline]
    pub fn builder(event_store: E, repository: R) -> SequencerBuilderInit<E, R> {
        SequencerBuilderInit::new(event_store, repository)
    }

    /// Crea un nuevo secuenciador con los stores proporcionados
    pub fn new_with_stores(event_store: E, repository: R) -> Self {
        Self { event_store,
               repository,
               default_run_id: None,
               default_plan: None }
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    pub fn into_event_store(self) -> E {
        self.event_store
    }

    /// Define/genera un `run_id` por defecto si no existe aún y lo retorna.
    pub fn ensure_default_run_id(&mut self) -> Uuid {
        *self.default_run_id.get_or_insert_with(Uuid::new_v4)
    }

    /// Fija explícitamente un `run_id` por defecto (p.ej. para reanudar).
    pub fn set_default_run_id(&mut self, run_id: Uuid) {
        self.default_run_id = Some(run_id);
    }

    pub fn default_run_id(&self) -> Option<Uuid> {
        self.default_run_id
    }

    pub fn set_default_plan(&mut self, plan: MigrationPlan) {
        self.default_plan = Some(plan);
    }

    pub fn default_plan(&self) -> Option<&MigrationPlan> {
        self.default_plan.as_ref()
    }

    /// Eventos de un run concreto.
    pub fn events_for(&self, run_id: Uuid) -> Vec<MigrationEvent> {
        self.event_store.list(run_id)
    }

    /// Eventos del run por defecto.
    pub fn events(&self) -> Option<Vec<MigrationEvent>> {
        self.default_run_id.map(|id| self.event_store.list(id))
    }

    /// Variante compacta de eventos para el run por defecto.
    pub fn event_codes(&self) -> Option<Vec<&'static str>> {
        self.events()
            .map(|events| events.iter().map(|e| e.kind.code()).collect())
    }

    /// Estado reconstruido de un run respecto a `plan`.
    pub fn instance(&self, run_id: Uuid, plan: &MigrationPlan) -> RunInstance {
        let events = self.event_store.list(run_id);
        self.repository.load(run_id, &events, plan)
    }

    /// Fingerprint del último `RunCompleted` de un run.
    pub fn run_fingerprint_for(&self, run_id: Uuid) -> Option<String> {
        self.event_store
            .list(run_id)
            .iter()
            .rev()
            .find_map(|e| match &e.kind {
                MigrationEventKind::RunCompleted { run_fingerprint } => Some(run_fingerprint.clone()),
                _ => None,
            })
    }

    pub fn run_fingerprint(&self) -> Option<String> {
        self.default_run_id.and_then(|id| self.run_fingerprint_for(id))
    }

    /// Garantiza que exista `RunInitialized` y devuelve los eventos del run.
    fn load_or_init(&mut self, run_id: Uuid, plan: &MigrationPlan, network: &str) -> Result<Vec<MigrationEvent>, DeployError> {
        let mut events = self.event_store.list(run_id);
        let stored_hash = events.iter().find_map(|e| match &e.kind {
                                           MigrationEventKind::RunInitialized { plan_hash, .. } => Some(plan_hash.clone()),
                                           _ => None,
                                       });
        if let Some(stored) = stored_hash {
            if stored != plan.plan_hash() {
                let changed = self.repository.load(run_id, &events, plan).changed_units(plan);
                if !changed.is_empty() {
                    warn!(%run_id, ?changed, "completed units differ from the current plan and will not be redeployed");
                }
            }
        } else {
            let ev = self.event_store
                         .append_kind(run_id,
                                      MigrationEventKind::RunInitialized { plan_hash: plan.plan_hash().to_string(),
                                                                           unit_count: plan.len(),
                                                                           network: network.to_string() })?;
            debug!(%run_id, plan_hash = plan.plan_hash(), "run initialized");
            events.push(ev);
        }
        Ok(events)
    }

    /// Ejecuta la siguiente unidad pendiente del run.
    ///
    /// Devuelve los registros de despliegue de esa unidad. Cuando no queda
    /// ninguna unidad devuelve `Err(DeployError::RunCompleted)`; si la unidad
    /// en curso falló antes, `Err(DeployError::RunHasFailed)` hasta que se
    /// rearme con `retry_unit`.
    pub fn next_with<A, B>(&mut self,
                           run_id: Uuid,
                           plan: &MigrationPlan,
                           artifacts: &A,
                           backend: &mut B)
                           -> Result<Vec<DeploymentRecord>, DeployError>
        where A: ArtifactStore + ?Sized,
              B: DeploymentBackend + ?Sized
    {
        let network = backend.network().to_string();
        let events = self.load_or_init(run_id, plan, &network)?;
        let instance = self.repository.load(run_id, &events, plan);

        if instance.completed {
            return Err(DeployError::RunCompleted);
        }
        let slot = &instance.units[instance.cursor];
        if matches!(slot.status, UnitStatus::Failed) {
            return Err(DeployError::RunHasFailed { sequence: slot.sequence });
        }
        if matches!(slot.status, UnitStatus::Running) {
            warn!(%run_id, sequence = slot.sequence, "unit was interrupted, starting a new attempt");
        }
        let attempt = slot.attempts + 1;
        let unit = &plan.units()[instance.cursor];

        let records = self.execute_unit(run_id, plan, unit, attempt, artifacts, backend, &network)?;

        if self.instance(run_id, plan).completed {
            self.complete_run(run_id)?;
        }
        Ok(records)
    }

    /// Ejecuta el run hasta completar todas las unidades o fallar.
    pub fn run_plan_with<A, B>(&mut self,
                               run_id: Uuid,
                               plan: &MigrationPlan,
                               artifacts: &A,
                               backend: &mut B)
                               -> Result<RunSummary, DeployError>
        where A: ArtifactStore + ?Sized,
              B: DeploymentBackend + ?Sized
    {
        let before = self.instance(run_id, plan);
        let skipped: Vec<u32> = before.units
                                      .iter()
                                      .filter(|s| matches!(s.status, UnitStatus::Completed))
                                      .map(|s| s.sequence)
                                      .collect();
        if !skipped.is_empty() {
            info!(%run_id, ?skipped, "skipping completed units");
        }

        let mut deployed = Vec::new();
        loop {
            match self.next_with(run_id, plan, artifacts, backend) {
                Ok(records) => deployed.extend(records),
                Err(DeployError::RunCompleted) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(RunSummary { run_id,
                        deployed,
                        skipped,
                        run_fingerprint: self.run_fingerprint_for(run_id) })
    }

    /// Unidades completadas del run que cambiaron respecto a `plan` desde que
    /// se desplegaron. Vacío si el plan es el mismo con el que se inició el run.
    pub fn plan_drift(&self, run_id: Uuid, plan: &MigrationPlan) -> Vec<u32> {
        let events = self.event_store.list(run_id);
        let same_plan = events.iter().any(|e| {
                                         matches!(&e.kind, MigrationEventKind::RunInitialized { plan_hash, .. }
                                                  if plan_hash == plan.plan_hash())
                                     });
        if same_plan {
            return Vec::new();
        }
        self.repository.load(run_id, &events, plan).changed_units(plan)
    }

    /// Verifica que `sub` (un rango de `plan`) pueda correr sobre el run: toda
    /// unidad de `plan` anterior a la primera de `sub` debe estar completada.
    ///
    /// Una unidad fallida devuelve `RunHasFailed`; una pendiente, `UnitPending`.
    pub fn ensure_prefix_completed(&self,
                                   run_id: Uuid,
                                   plan: &MigrationPlan,
                                   sub: &MigrationPlan)
                                   -> Result<(), DeployError> {
        let Some(first) = sub.units().first() else {
            return Ok(());
        };
        let instance = self.instance(run_id, plan);
        let blocking = instance.units
                               .iter()
                               .take_while(|s| s.sequence < first.sequence)
                               .find(|s| !matches!(s.status, UnitStatus::Completed));
        match blocking {
            None => Ok(()),
            Some(slot) if matches!(slot.status, UnitStatus::Failed) => {
                Err(DeployError::RunHasFailed { sequence: slot.sequence })
            }
            Some(slot) => Err(DeployError::UnitPending { sequence: slot.sequence }),
        }
    }

    /// Ejecuta sólo las unidades de `plan` en `[from, to]`, respetando el orden
    /// del plan completo (ver `ensure_prefix_completed`).
    #[allow(clippy::too_many_arguments)]
    pub fn run_range_with<A, B>(&mut self,
                                run_id: Uuid,
                                plan: &MigrationPlan,
                                from: Option<u32>,
                                to: Option<u32>,
                                artifacts: &A,
                                backend: &mut B)
                                -> Result<RunSummary, DeployError>
        where A: ArtifactStore + ?Sized,
              B: DeploymentBackend + ?Sized
    {
        let sub = plan.range(from, to)?;
        self.ensure_prefix_completed(run_id, plan, &sub)?;
        self.run_plan_with(run_id, &sub, artifacts, backend)
    }

    /// Ejecuta una sola unidad como un run propio (run id nuevo).
    pub fn run_unit<A, B>(&mut self,
                          unit: &MigrationUnit,
                          artifacts: &A,
                          backend: &mut B)
                          -> Result<Vec<DeploymentRecord>, DeployError>
        where A: ArtifactStore + ?Sized,
              B: DeploymentBackend + ?Sized
    {
        let plan = MigrationPlan::new(vec![unit.clone()])?;
        self.next_with(Uuid::new_v4(), &plan, artifacts, backend)
    }

    /// Ejecuta el plan por defecto sobre el run por defecto.
    pub fn run<A, B>(&mut self, artifacts: &A, backend: &mut B) -> Result<RunSummary, DeployError>
        where A: ArtifactStore + ?Sized,
              B: DeploymentBackend + ?Sized
    {
        let run_id = self.ensure_default_run_id();
        let plan = self.take_default_plan()?;
        let result = self.run_plan_with(run_id, &plan, artifacts, backend);
        self.default_plan = Some(plan);
        result
    }

    /// Avanza una unidad del plan por defecto.
    pub fn step<A, B>(&mut self, artifacts: &A, backend: &mut B) -> Result<Vec<DeploymentRecord>, DeployError>
        where A: ArtifactStore + ?Sized,
              B: DeploymentBackend + ?Sized
    {
        let run_id = self.ensure_default_run_id();
        let plan = self.take_default_plan()?;
        let result = self.next_with(run_id, &plan, artifacts, backend);
        self.default_plan = Some(plan);
        result
    }

    fn take_default_plan(&mut self) -> Result<MigrationPlan, DeployError> {
        self.default_plan
            .take()
            .ok_or_else(|| DeployError::Internal("no default plan configured".into()))
    }

    /// Rearma una unidad fallida para que el próximo `next_with` la vuelva a
    /// ejecutar completa.
    ///
    /// Devuelve `Ok(false)` si la unidad no está fallida o si ya alcanzó
    /// `max_attempts` intentos.
    pub fn retry_unit(&mut self,
                      run_id: Uuid,
                      plan: &MigrationPlan,
                      sequence: u32,
                      reason: Option<String>,
                      max_attempts: Option<u32>)
                      -> Result<bool, DeployError> {
        if plan.unit(sequence).is_none() {
            return Err(DeployError::UnknownUnit(sequence));
        }
        let instance = self.instance(run_id, plan);
        let Some(slot) = instance.slot(sequence) else {
            return Err(DeployError::UnknownUnit(sequence));
        };
        if !matches!(slot.status, UnitStatus::Failed) {
            debug!(%run_id, sequence, status = slot.status.as_str(), "retry rejected: unit not failed");
            return Ok(false);
        }
        if max_attempts.is_some_and(|max| slot.attempts >= max) {
            debug!(%run_id, sequence, attempts = slot.attempts, "retry rejected: attempt cap reached");
            return Ok(false);
        }
        self.event_store
            .append_kind(run_id,
                         MigrationEventKind::UnitRetryScheduled { sequence,
                                                                  reason,
                                                                  attempt: slot.attempts + 1 })?;
        info!(%run_id, sequence, "unit re-armed for retry");
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_unit<A, B>(&mut self,
                          run_id: Uuid,
                          plan: &MigrationPlan,
                          unit: &MigrationUnit,
                          attempt: u32,
                          artifacts: &A,
                          backend: &mut B,
                          network: &str)
                          -> Result<Vec<DeploymentRecord>, DeployError>
        where A: ArtifactStore + ?Sized,
              B: DeploymentBackend + ?Sized
    {
        let span = info_span!("unit", sequence = unit.sequence, name = %unit.name, attempt);
        let _guard = span.enter();

        self.event_store.append_kind(run_id,
                                     MigrationEventKind::UnitStarted { sequence: unit.sequence,
                                                                       name: unit.name.clone(),
                                                                       attempt })?;

        // Resolución completa antes del primer despliegue: un nombre sin
        // artifact deja la unidad sin ninguna petición al backend.
        let mut resolved: Vec<&CompiledArtifact> = Vec::with_capacity(unit.len());
        for name in &unit.artifacts {
            match artifacts.require(name) {
                Ok(a) => resolved.push(a),
                Err(error) => return self.fail_unit(run_id, unit.sequence, name, error),
            }
        }

        let mut records = Vec::with_capacity(resolved.len());
        for artifact in resolved {
            self.event_store
                .append_kind(run_id,
                             MigrationEventKind::DeployRequested { sequence: unit.sequence,
                                                                   artifact: artifact.name.clone(),
                                                                   artifact_hash: artifact.hash.clone() })?;
            debug!(artifact = %artifact.name, "deploy requested");

            let request = DeployRequest { artifact,
                                          unit: unit.sequence };
            let receipt = match backend.deploy(&request) {
                Ok(r) => r,
                Err(e) => {
                    let error = DeployError::DeploymentFailed { artifact: artifact.name.clone(),
                                                                reason: e.to_string() };
                    return self.fail_unit(run_id, unit.sequence, &artifact.name, error);
                }
            };

            let ev = self.event_store
                         .append_kind(run_id,
                                      MigrationEventKind::DeployFinished { sequence: unit.sequence,
                                                                           artifact: artifact.name.clone(),
                                                                           address: receipt.address.clone(),
                                                                           transaction_hash: receipt.transaction_hash
                                                                                                    .clone() })?;
            info!(artifact = %artifact.name, address = %receipt.address, "deployed");
            records.push((artifact.hash.clone(),
                          DeploymentRecord { artifact: artifact.name.clone(),
                                             unit: unit.sequence,
                                             address: receipt.address,
                                             transaction_hash: receipt.transaction_hash,
                                             network: network.to_string(),
                                             deployed_at: ev.ts }));
        }

        let fingerprint = unit_fingerprint(plan, unit.sequence, &records);
        self.event_store.append_kind(run_id,
                                     MigrationEventKind::UnitCompleted { sequence: unit.sequence,
                                                                         fingerprint })?;
        info!(deployed = records.len(), "unit completed");
        Ok(records.into_iter().map(|(_, r)| r).collect())
    }

    fn fail_unit(&mut self,
                 run_id: Uuid,
                 sequence: u32,
                 artifact: &str,
                 error: DeployError)
                 -> Result<Vec<DeploymentRecord>, DeployError> {
        warn!(%run_id, sequence, artifact, %error, "unit failed");
        self.event_store.append_kind(run_id,
                                     MigrationEventKind::UnitFailed { sequence,
                                                                      artifact: artifact.to_string(),
                                                                      error: error.clone() })?;
        Err(error)
    }

    fn complete_run(&mut self, run_id: Uuid) -> Result<(), DeployError> {
        let unit_fps: Vec<String> = self.event_store
                                        .list(run_id)
                                        .iter()
                                        .filter_map(|e| match &e.kind {
                                            MigrationEventKind::UnitCompleted { fingerprint, .. } => Some(fingerprint.clone()),
                                            _ => None,
                                        })
                                        .collect();
        let run_fingerprint = hash_value(&json!({
                                             "engine_version": SEQUENCER_VERSION,
                                             "unit_fingerprints": unit_fps
                                         }));
        info!(%run_id, %run_fingerprint, "run completed");
        self.event_store
            .append_kind(run_id, MigrationEventKind::RunCompleted { run_fingerprint })?;
        Ok(())
    }
}

fn unit_fingerprint(plan: &MigrationPlan, sequence: u32, records: &[(String, DeploymentRecord)]) -> String {
    let artifact_hashes: Vec<&str> = records.iter().map(|(h, _)| h.as_str()).collect();
    let addresses: Vec<&str> = records.iter().map(|(_, r)| r.address.as_str()).collect();
    hash_value(&json!({
        "engine_version": SEQUENCER_VERSION,
        "plan_hash": plan.plan_hash(),
        "sequence": sequence,
        "artifact_hashes": artifact_hashes,
        "addresses": addresses
    }))
}

impl Sequencer<InMemoryEventStore, InMemoryRunRepository> {
    /// Crea un builder con stores en memoria
    #[inline]
    pub fn new() -> SequencerBuilderInit<InMemoryEventStore, InMemoryRunRepository> {
        SequencerBuilderInit::new(InMemoryEventStore::default(), InMemoryRunRepository::new())
    }

    /// Secuenciador en memoria sin plan por defecto.
    pub fn in_memory() -> Self {
        Self::default()
    }
}

impl Default for Sequencer<InMemoryEventStore, InMemoryRunRepository> {
    fn default() -> Self {
        Self::new_with_stores(InMemoryEventStore::default(), InMemoryRunRepository::new())
    }
}
