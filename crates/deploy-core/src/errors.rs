//! Errores del secuenciador.
//!
//! `DeployError` viaja dentro de los eventos (`UnitFailed`), por eso es
//! serializable y comparable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum DeployError {
    #[error("artifact not found: {name}")]
    ArtifactNotFound { name: String },
    #[error("artifact {name} has no bytecode (interface or abstract contract)")]
    ArtifactNotDeployable { name: String },
    #[error("deployment of {artifact} failed: {reason}")]
    DeploymentFailed { artifact: String, reason: String },
    #[error("invalid migration plan: {0}")]
    InvalidPlan(String),
    #[error("unknown migration unit {0}")]
    UnknownUnit(u32),
    #[error("migration run already completed")]
    RunCompleted,
    #[error("unit {sequence} failed previously (stop-on-failure)")]
    RunHasFailed { sequence: u32 },
    #[error("unit {sequence} has not completed yet; later units cannot run")]
    UnitPending { sequence: u32 },
    #[error("event store: {0}")]
    Store(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl DeployError {
    /// Errores producidos al resolver artifacts (antes de tocar el backend).
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::ArtifactNotFound { .. } | Self::ArtifactNotDeployable { .. })
    }
}
