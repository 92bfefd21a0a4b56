//! Registro de despliegues por red (`deployments.json`).
//!
//! Guarda la última dirección conocida de cada artifact en cada red y el
//! número de transacciones emitidas (nonce del deployer en la cadena
//! simulada). Una nueva entrada para el mismo artifact reemplaza a la
//! anterior.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use deploy_core::DeploymentRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PersistenceError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkLedger {
    #[serde(default)]
    pub deployments: BTreeMap<String, DeploymentRecord>,
    #[serde(default)]
    pub transactions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    networks: BTreeMap<String, NetworkLedger>,
}

#[derive(Debug, Clone)]
pub struct DeploymentLedger {
    path: PathBuf,
    data: LedgerFile,
}

impl DeploymentLedger {
    /// Carga el ledger; un archivo inexistente es un ledger vacío.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.is_file() {
            let raw = fs::read_to_string(&path).map_err(PersistenceError::io(&path))?;
            serde_json::from_str(&raw).map_err(|source| PersistenceError::Json { path: path.clone(),
                                                                                 source })?
        } else {
            LedgerFile::default()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, record: DeploymentRecord) {
        self.data
            .networks
            .entry(record.network.clone())
            .or_default()
            .deployments
            .insert(record.artifact.clone(), record);
    }

    /// Fija el nonce del deployer en `network` tras un run (incluye los
    /// despliegues de unidades que luego fallaron).
    pub fn set_transactions(&mut self, network: &str, transactions: u64) {
        self.data.networks.entry(network.to_string()).or_default().transactions = transactions;
    }

    pub fn record_all<I>(&mut self, records: I)
        where I: IntoIterator<Item = DeploymentRecord>
    {
        records.into_iter().for_each(|r| self.record(r));
    }

    pub fn get(&self, network: &str, artifact: &str) -> Option<&DeploymentRecord> {
        self.data.networks.get(network)?.deployments.get(artifact)
    }

    pub fn network(&self, network: &str) -> Option<&NetworkLedger> {
        self.data.networks.get(network)
    }

    /// Transacciones registradas en `network` (0 si nunca se desplegó ahí).
    pub fn transactions(&self, network: &str) -> u64 {
        self.data.networks.get(network).map_or(0, |n| n.transactions)
    }

    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.data.networks.keys().map(String::as_str)
    }

    /// Escribe a un archivo temporal y lo renombra sobre el destino.
    pub fn save(&self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(PersistenceError::io(parent))?;
        }
        let raw = serde_json::to_string_pretty(&self.data).map_err(|source| PersistenceError::Json { path: self.path
                                                                                                               .clone(),
                                                                                                     source })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(PersistenceError::io(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(PersistenceError::io(&self.path))?;
        debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }
}
