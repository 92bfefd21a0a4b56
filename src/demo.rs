//! Demo en memoria: los cuatro contratos del plan incorporado con bytecode
//! mínimo, desplegados sobre `SimulatedChain`.

use deploy_adapters::migrations::{ALWAYS_EXECUTABLE_JOB, REGISTRY, REWARD, SIMPLE_CRON_JOB};
use deploy_adapters::{builtin_plan, SimulatedChain};
use deploy_core::{CompiledArtifact, DeployError, InMemoryArtifactStore, RunSummary, Sequencer};
use serde_json::json;

/// Artifacts de ejemplo (ABI vacía salvo el constructor del Registry).
pub fn demo_artifacts() -> InMemoryArtifactStore {
    InMemoryArtifactStore::new().with(CompiledArtifact::new(REGISTRY,
                                                            json!([{ "type": "constructor", "inputs": [] }]),
                                                            "0x6080604052348015600f57600080fd5b50"))
                                .with(CompiledArtifact::new(REWARD, json!([]), "0x6080604052600a"))
                                .with(CompiledArtifact::new(ALWAYS_EXECUTABLE_JOB, json!([]), "0x60806040526001"))
                                .with(CompiledArtifact::new(SIMPLE_CRON_JOB, json!([]), "0x60806040526002"))
}

/// Ejecuta el plan incorporado completo sobre `chain` con stores en memoria.
pub fn run_demo(mut chain: SimulatedChain) -> Result<RunSummary, DeployError> {
    let mut sequencer = Sequencer::in_memory();
    sequencer.set_default_plan(builtin_plan()?);
    sequencer.run(&demo_artifacts(), &mut chain)
}
