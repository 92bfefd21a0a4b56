//! Errores de persistencia.

use std::path::PathBuf;

use deploy_core::DeployError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("corrupt event log {path} at line {line}: {source}")]
    CorruptLog {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("invalid config {path}: {source}")]
    Toml { path: PathBuf, source: toml::de::Error },
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

impl From<PersistenceError> for DeployError {
    fn from(err: PersistenceError) -> Self {
        DeployError::Store(err.to_string())
    }
}
