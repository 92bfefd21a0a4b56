//! Backend programable: registra cada petición y falla donde se le indique.
//! Pensado para tests y para simular escenarios de error sin red.

use std::collections::HashMap;

use super::{BackendError, DeployRequest, DeploymentBackend, DeploymentReceipt};
use crate::hashing::hash_str;

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    network: Option<String>,
    requests: Vec<String>,
    fail_at: HashMap<usize, BackendError>,
    fail_artifact: HashMap<String, BackendError>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Falla la petición número `index` (0-based, contando todas las peticiones recibidas).
    pub fn fail_request(mut self, index: usize, error: BackendError) -> Self {
        self.fail_at.insert(index, error);
        self
    }

    /// Falla cada petición para `artifact` hasta que se llame a `heal`.
    pub fn fail_artifact(mut self, artifact: impl Into<String>, error: BackendError) -> Self {
        self.fail_artifact.insert(artifact.into(), error);
        self
    }

    /// Elimina todos los fallos programados.
    pub fn heal(&mut self) {
        self.fail_at.clear();
        self.fail_artifact.clear();
    }

    /// Nombres pedidos, en orden de llegada (incluye los que fallaron).
    pub fn requests(&self) -> &[String] {
        &self.requests
    }
}

impl DeploymentBackend for ScriptedBackend {
    fn network(&self) -> &str {
        self.network.as_deref().unwrap_or(crate::constants::DEFAULT_NETWORK)
    }

    fn deploy(&mut self, request: &DeployRequest<'_>) -> Result<DeploymentReceipt, BackendError> {
        let index = self.requests.len();
        let name = request.artifact.name.clone();
        self.requests.push(name.clone());
        if let Some(err) = self.fail_at.get(&index).or_else(|| self.fail_artifact.get(&name)) {
            return Err(err.clone());
        }
        let digest = hash_str(&format!("{}:{}:{}", self.network(), index, request.artifact.hash));
        Ok(DeploymentReceipt { address: format!("0x{}", &digest[..40]),
                               transaction_hash: format!("0x{digest}") })
    }
}
