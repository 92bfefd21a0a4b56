//! Builder para `Sequencer`.
//!
//! `SequencerBuilderInit` contiene las stores; cada llamada a `unit` añade
//! una unidad al plan por defecto. `build` valida el plan (sequence únicos,
//! unidades no vacías) y lo fija en el secuenciador.
//!
//! ```ignore
//! let mut sequencer = Sequencer::new()
//!     .unit(2, "deploy_contracts", ["Registry", "Reward"])
//!     .unit(3, "deploy_examples", ["AlwaysExecutableJob", "SimpleCronJob"])
//!     .build()?;
//! let summary = sequencer.run(&artifacts, &mut backend)?;
//! ```

use crate::engine::Sequencer;
use crate::errors::DeployError;
use crate::event::EventStore;
use crate::repo::RunRepository;
use crate::unit::{MigrationPlan, MigrationUnit};

#[derive(Debug)]
pub struct SequencerBuilderInit<E: EventStore, R: RunRepository> {
    /// Store de eventos que usará el secuenciador.
    pub event_store: E,
    /// Repositorio que reconstruye el estado de los runs.
    pub repository: R,
    units: Vec<MigrationUnit>,
}

impl<E: EventStore, R: RunRepository> SequencerBuilderInit<E, R> {
    pub fn new(event_store: E, repository: R) -> Self {
        Self { event_store,
               repository,
               units: Vec::new() }
    }

    /// Añade una unidad numerada al plan por defecto.
    pub fn unit<I, S>(mut self, sequence: u32, name: &str, artifacts: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.units.push(MigrationUnit::new(sequence, name, artifacts));
        self
    }

    /// Usa un plan ya construido (p.ej. cargado de configuración).
    pub fn plan(mut self, plan: &MigrationPlan) -> Self {
        self.units.extend(plan.units().iter().cloned());
        self
    }

    /// Construye el `Sequencer`; falla si el plan resultante no es válido.
    pub fn build(self) -> Result<Sequencer<E, R>, DeployError> {
        let plan = MigrationPlan::new(self.units)?;
        let mut sequencer = Sequencer::new_with_stores(self.event_store, self.repository);
        sequencer.set_default_plan(plan);
        Ok(sequencer)
    }
}
