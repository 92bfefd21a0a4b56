use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::CompiledArtifact;

/// Petición de despliegue de un artifact dentro de una unidad.
#[derive(Debug, Clone, Copy)]
pub struct DeployRequest<'a> {
    pub artifact: &'a CompiledArtifact,
    pub unit: u32,
}

/// Confirmación del backend para un despliegue aceptado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReceipt {
    pub address: String,
    pub transaction_hash: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },
    #[error("network unavailable: {0}")]
    Unavailable(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

pub trait DeploymentBackend {
    /// Nombre de la red a la que publica el backend.
    fn network(&self) -> &str {
        crate::constants::DEFAULT_NETWORK
    }

    /// Publica el artifact y espera su confirmación.
    fn deploy(&mut self, request: &DeployRequest<'_>) -> Result<DeploymentReceipt, BackendError>;
}

impl<B: DeploymentBackend + ?Sized> DeploymentBackend for &mut B {
    fn network(&self) -> &str {
        (**self).network()
    }

    fn deploy(&mut self, request: &DeployRequest<'_>) -> Result<DeploymentReceipt, BackendError> {
        (**self).deploy(request)
    }
}

impl<B: DeploymentBackend + ?Sized> DeploymentBackend for Box<B> {
    fn network(&self) -> &str {
        (**self).network()
    }

    fn deploy(&mut self, request: &DeployRequest<'_>) -> Result<DeploymentReceipt, BackendError> {
        (**self).deploy(request)
    }
}
