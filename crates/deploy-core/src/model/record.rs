use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resultado on-chain de desplegar un artifact dentro de una unidad.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub artifact: String,
    pub unit: u32,
    pub address: String,
    pub transaction_hash: String,
    pub network: String,
    pub deployed_at: DateTime<Utc>, // metadato (no entra en fingerprint)
}
