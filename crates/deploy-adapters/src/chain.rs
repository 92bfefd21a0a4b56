//! Backend de despliegue simulado.
//!
//! Reproduce lo mínimo de una red para probar el secuenciador sin nodo:
//! - dirección de contrato derivada de `(deployer, nonce)` como en CREATE;
//! - hash de transacción derivado de `(deployer, nonce, artifact.hash)`;
//! - coste `base_cost + bytes * cost_per_byte` descontado de un balance;
//! - modo offline para simular una red caída.
//!
//! Todo es determinista: dos cadenas con la misma configuración y el mismo
//! nonce inicial producen las mismas direcciones.

use deploy_core::hashing::hash_str;
use deploy_core::{BackendError, DeployRequest, DeploymentBackend, DeploymentReceipt};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub network: String,
    pub deployer: String,
    pub balance: u64,
    pub base_cost: u64,
    pub cost_per_byte: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { network: deploy_core::constants::DEFAULT_NETWORK.to_string(),
               deployer: "0x00000000000000000000000000000000deadbeef".to_string(),
               balance: 100_000_000,
               base_cost: 21_000,
               cost_per_byte: 10 }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedChain {
    config: ChainConfig,
    balance: u64,
    nonce: u64,
    online: bool,
    deployed: Vec<(String, String)>,
}

impl SimulatedChain {
    pub fn new(config: ChainConfig) -> Self {
        Self { balance: config.balance,
               config,
               nonce: 0,
               online: true,
               deployed: Vec::new() }
    }

    /// Arranca con un nonce previo (p.ej. el número de despliegues ya registrados).
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn go_offline(&mut self) {
        self.online = false;
    }

    pub fn go_online(&mut self) {
        self.online = true;
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Pares `(artifact, address)` publicados en esta instancia.
    pub fn deployed(&self) -> &[(String, String)] {
        &self.deployed
    }

    /// Coste de publicar `code_size` bytes.
    pub fn cost_of(&self, code_size: usize) -> u64 {
        let bytes = u64::try_from(code_size).unwrap_or(u64::MAX);
        self.config
            .base_cost
            .saturating_add(bytes.saturating_mul(self.config.cost_per_byte))
    }

    fn contract_address(&self) -> String {
        let digest = hash_str(&format!("{}:{}", self.config.deployer.to_lowercase(), self.nonce));
        format!("0x{}", &digest[..40])
    }
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

impl DeploymentBackend for SimulatedChain {
    fn network(&self) -> &str {
        &self.config.network
    }

    fn deploy(&mut self, request: &DeployRequest<'_>) -> Result<DeploymentReceipt, BackendError> {
        if !self.online {
            return Err(BackendError::Unavailable(format!("network {} is unreachable", self.config.network)));
        }
        let artifact = request.artifact;
        if !artifact.is_deployable() {
            return Err(BackendError::Rejected(format!("{} has no bytecode", artifact.name)));
        }
        let cost = self.cost_of(artifact.code_size());
        if cost > self.balance {
            return Err(BackendError::InsufficientFunds { required: u128::from(cost),
                                                         available: u128::from(self.balance) });
        }

        let address = self.contract_address();
        let tx = hash_str(&format!("{}:{}:{}", self.config.deployer, self.nonce, artifact.hash));
        self.balance -= cost;
        self.nonce += 1;
        self.deployed.push((artifact.name.clone(), address.clone()));
        debug!(artifact = %artifact.name, %address, cost, unit = request.unit, "simulated deploy");
        Ok(DeploymentReceipt { address,
                               transaction_hash: format!("0x{tx}") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_core::CompiledArtifact;
    use serde_json::json;

    fn artifact(name: &str, code: &str) -> CompiledArtifact {
        CompiledArtifact::new(name, json!([]), code)
    }

    #[test]
    fn addresses_follow_nonce_and_are_reproducible() {
        let a = artifact("Registry", "0x60806040");
        let mut chain = SimulatedChain::default();
        let r1 = chain.deploy(&DeployRequest { artifact: &a, unit: 2 }).unwrap();
        let r2 = chain.deploy(&DeployRequest { artifact: &a, unit: 2 }).unwrap();
        assert_ne!(r1.address, r2.address);
        assert_eq!(r1.address.len(), 42);
        assert_eq!(chain.nonce(), 2);

        let mut replay = SimulatedChain::default().with_nonce(1);
        let r3 = replay.deploy(&DeployRequest { artifact: &a, unit: 2 }).unwrap();
        assert_eq!(r3.address, r2.address);
    }

    #[test]
    fn charges_cost_and_rejects_when_balance_is_short() {
        let a = artifact("Reward", "0x60806040"); // 4 bytes
        let mut chain = SimulatedChain::new(ChainConfig { balance: 100,
                                                          base_cost: 50,
                                                          cost_per_byte: 10,
                                                          ..ChainConfig::default() });
        assert_eq!(chain.cost_of(a.code_size()), 90);
        chain.deploy(&DeployRequest { artifact: &a, unit: 2 }).unwrap();
        assert_eq!(chain.balance(), 10);
        let err = chain.deploy(&DeployRequest { artifact: &a, unit: 2 }).unwrap_err();
        assert_eq!(err, BackendError::InsufficientFunds { required: 90, available: 10 });
        assert_eq!(chain.nonce(), 1, "failed deploys do not consume a nonce");
    }

    #[test]
    fn offline_chain_is_unavailable() {
        let a = artifact("Registry", "0x6080");
        let mut chain = SimulatedChain::default();
        chain.go_offline();
        assert!(matches!(chain.deploy(&DeployRequest { artifact: &a, unit: 2 }),
                         Err(BackendError::Unavailable(_))));
        chain.go_online();
        assert!(chain.deploy(&DeployRequest { artifact: &a, unit: 2 }).is_ok());
    }
}
