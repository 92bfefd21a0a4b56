//! deploy-adapters: implementaciones concretas de los contratos del core.
//!
//! - `truffle`: `ArtifactStore` sobre un directorio de build con artifacts
//!   JSON al estilo Truffle (`build/contracts/<Name>.json`).
//! - `chain`: `DeploymentBackend` simulado y determinista (direcciones,
//!   hashes de transacción, coste por byte, modo offline).
//! - `migrations`: el plan incorporado (unidades 2 y 3).

pub mod chain;
pub mod migrations;
pub mod truffle;

pub use chain::{ChainConfig, SimulatedChain};
pub use migrations::{builtin_plan, deploy_contracts, deploy_examples};
pub use truffle::{ArtifactLoadError, TruffleArtifactStore};
