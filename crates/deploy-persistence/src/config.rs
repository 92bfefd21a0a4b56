//! Configuración del runner de migraciones.
//!
//! Fuentes, en orden de precedencia creciente:
//! 1. valores por defecto (plan incorporado, red `development`);
//! 2. archivo TOML (`migrations.toml` o `DEPLOYFLOW_CONFIG`);
//! 3. variables de entorno (`.env` se carga una sola vez):
//!    `DEPLOYFLOW_ARTIFACTS_DIR`, `DEPLOYFLOW_NETWORK`, `DEPLOYFLOW_STATE_DIR`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use deploy_adapters::{builtin_plan, ChainConfig};
use deploy_core::{DeployError, MigrationPlan, MigrationUnit};
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::debug;

use crate::error::PersistenceError;

pub const CONFIG_ENV: &str = "DEPLOYFLOW_CONFIG";
pub const ARTIFACTS_DIR_ENV: &str = "DEPLOYFLOW_ARTIFACTS_DIR";
pub const NETWORK_ENV: &str = "DEPLOYFLOW_NETWORK";
pub const STATE_DIR_ENV: &str = "DEPLOYFLOW_STATE_DIR";
pub const DEFAULT_CONFIG_FILE: &str = "migrations.toml";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    /// Parámetros de la cadena simulada (`network` se toma de `project`).
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default, rename = "unit")]
    pub units: Vec<UnitConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { artifacts_dir: default_artifacts_dir(),
               network: default_network(),
               state_dir: default_state_dir() }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("build/contracts")
}

fn default_network() -> String {
    deploy_core::constants::DEFAULT_NETWORK.to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".deployflow")
}

/// Unidad declarada en el archivo (`[[unit]]`).
#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    pub sequence: u32,
    pub name: Option<String>,
    pub artifacts: Vec<String>,
}

impl DeployConfig {
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, PersistenceError> {
        toml::from_str(raw).map_err(|source| PersistenceError::Toml { path: origin.to_path_buf(),
                                                                      source })
    }

    /// Carga la configuración.
    ///
    /// Con `path == None` se usa `DEPLOYFLOW_CONFIG` o `migrations.toml`; si
    /// ese archivo por defecto no existe se parte de los valores por defecto.
    /// Un path explícito inexistente es un error.
    pub fn load(path: Option<&Path>) -> Result<Self, PersistenceError> {
        init_dotenv();
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match env::var(CONFIG_ENV) {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        let mut config = if path.is_file() {
            let raw = fs::read_to_string(&path).map_err(PersistenceError::io(&path))?;
            debug!(path = %path.display(), "loading deploy config");
            Self::from_toml_str(&raw, &path)?
        } else if explicit {
            return Err(PersistenceError::ConfigNotFound(path));
        } else {
            debug!("no config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Aplica overrides a partir de una función de lookup (el entorno en producción).
    pub fn apply_overrides<F>(&mut self, lookup: F)
        where F: Fn(&str) -> Option<String>
    {
        if let Some(v) = lookup(ARTIFACTS_DIR_ENV).filter(|v| !v.is_empty()) {
            self.project.artifacts_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(NETWORK_ENV).filter(|v| !v.is_empty()) {
            self.project.network = v;
        }
        if let Some(v) = lookup(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.project.state_dir = PathBuf::from(v);
        }
    }

    /// Plan declarado; sin `[[unit]]` se usa el plan incorporado.
    pub fn plan(&self) -> Result<MigrationPlan, DeployError> {
        if self.units.is_empty() {
            return builtin_plan();
        }
        let units = self.units
                        .iter()
                        .map(|u| {
                            let name = u.name.clone().unwrap_or_else(|| format!("unit_{}", u.sequence));
                            MigrationUnit::new(u.sequence, name, u.artifacts.iter().cloned())
                        })
                        .collect();
        MigrationPlan::new(units)
    }

    /// Configuración de la cadena simulada para la red activa.
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig { network: self.project.network.clone(),
                      ..self.chain.clone() }
    }

    /// Log de eventos de la red activa.
    pub fn events_path(&self) -> PathBuf {
        self.project
            .state_dir
            .join(format!("{}.events.jsonl", self.project.network))
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.project.state_dir.join("deployments.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parse_full_config() {
        let raw = r#"
            [project]
            artifacts_dir = "out/contracts"
            network = "sepolia"

            [chain]
            balance = 500
            cost_per_byte = 2

            [[unit]]
            sequence = 3
            name = "deploy_examples"
            artifacts = ["AlwaysExecutableJob", "SimpleCronJob"]

            [[unit]]
            sequence = 2
            artifacts = ["Registry", "Reward"]
        "#;
        let cfg = DeployConfig::from_toml_str(raw, Path::new("migrations.toml")).unwrap();
        assert_eq!(cfg.project.artifacts_dir, PathBuf::from("out/contracts"));
        assert_eq!(cfg.project.state_dir, PathBuf::from(".deployflow"));
        let chain = cfg.chain_config();
        assert_eq!(chain.network, "sepolia");
        assert_eq!(chain.balance, 500);
        assert_eq!(chain.base_cost, ChainConfig::default().base_cost);

        let plan = cfg.plan().unwrap();
        assert_eq!(plan.units()[0].sequence, 2);
        assert_eq!(plan.units()[0].name, "unit_2");
        assert_eq!(plan.units()[1].name, "deploy_examples");
        assert_eq!(cfg.events_path(), PathBuf::from(".deployflow/sepolia.events.jsonl"));
    }

    #[test]
    fn empty_config_uses_builtin_plan() {
        let cfg = DeployConfig::from_toml_str("", Path::new("x.toml")).unwrap();
        assert_eq!(cfg.plan().unwrap(), builtin_plan().unwrap());
        assert_eq!(cfg.project.network, "development");
    }

    #[test]
    fn duplicate_sequences_are_rejected() {
        let raw = r#"
            [[unit]]
            sequence = 2
            artifacts = ["Registry"]
            [[unit]]
            sequence = 2
            artifacts = ["Reward"]
        "#;
        let cfg = DeployConfig::from_toml_str(raw, Path::new("x.toml")).unwrap();
        assert!(matches!(cfg.plan(), Err(DeployError::InvalidPlan(_))));
    }

    #[test]
    fn overrides_replace_non_empty_values() {
        let mut cfg = DeployConfig::default();
        let vars: HashMap<&str, &str> = [(NETWORK_ENV, "goerli"), (STATE_DIR_ENV, "")].into_iter().collect();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.project.network, "goerli");
        assert_eq!(cfg.project.state_dir, PathBuf::from(".deployflow"));
    }

    #[test]
    fn malformed_toml_reports_origin() {
        let err = DeployConfig::from_toml_str("[[unit]\nsequence=", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
