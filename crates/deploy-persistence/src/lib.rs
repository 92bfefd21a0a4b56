//! deploy-persistence
//!
//! Estado durable de los runs de migración, sin base de datos:
//! - `file_store`: `EventStore` append-only sobre un archivo JSON-lines, con
//!   paridad 1:1 respecto al store en memoria (mismo replay, mismos seq).
//! - `ledger`: registro de direcciones desplegadas por red.
//! - `config`: plan de migración (TOML) + overrides de entorno (`.env`).

pub mod config;
pub mod error;
pub mod file_store;
pub mod ledger;

pub use config::{init_dotenv, DeployConfig, ProjectConfig, UnitConfig};
pub use error::PersistenceError;
pub use file_store::FileEventStore;
pub use ledger::{DeploymentLedger, NetworkLedger};
