//! `ArtifactStore` sobre un directorio de build de Truffle.
//!
//! Cada `*.json` del directorio describe un contrato compilado:
//! `contractName`, `abi`, `bytecode` (el resto de campos se ignora). Si falta
//! `contractName` se usa el nombre del archivo sin extensión. Un archivo que
//! no parsea es un error que nombra el archivo; no se descarta en silencio.

use std::fs;
use std::path::{Path, PathBuf};

use deploy_core::{ArtifactStore, CompiledArtifact, InMemoryArtifactStore};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("artifacts directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("io error reading {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid artifact json in {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("contract {name} defined twice ({path})")]
    Duplicate { name: String, path: PathBuf },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TruffleArtifactFile {
    contract_name: Option<String>,
    #[serde(default)]
    abi: Value,
    #[serde(default)]
    bytecode: String,
}

#[derive(Debug, Clone, Default)]
pub struct TruffleArtifactStore {
    root: PathBuf,
    inner: InMemoryArtifactStore,
}

impl TruffleArtifactStore {
    /// Carga todos los artifacts del directorio (no recursivo).
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        let root = dir.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ArtifactLoadError::MissingDirectory(root));
        }
        let entries = fs::read_dir(&root).map_err(|source| ArtifactLoadError::Io { path: root.clone(), source })?;
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| ArtifactLoadError::Io { path: root.clone(), source })?
                            .path();
            if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut inner = InMemoryArtifactStore::new();
        for path in files {
            let artifact = read_artifact(&path)?;
            debug!(name = %artifact.name, path = %path.display(), "artifact loaded");
            let name = artifact.name.clone();
            if inner.insert(artifact).is_some() {
                return Err(ArtifactLoadError::Duplicate { name, path });
            }
        }
        Ok(Self { root, inner })
    }

    /// Parsea un único artifact desde su JSON. `fallback_name` se usa si el
    /// JSON no trae `contractName`.
    pub fn parse_artifact(json: &str, fallback_name: &str) -> Result<CompiledArtifact, serde_json::Error> {
        let file: TruffleArtifactFile = serde_json::from_str(json)?;
        let name = file.contract_name
                       .filter(|n| !n.trim().is_empty())
                       .unwrap_or_else(|| fallback_name.to_string());
        Ok(CompiledArtifact::new(name, file.abi, file.bytecode))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn read_artifact(path: &Path) -> Result<CompiledArtifact, ArtifactLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| ArtifactLoadError::Io { path: path.to_path_buf(), source })?;
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    TruffleArtifactStore::parse_artifact(&raw, &stem).map_err(|source| ArtifactLoadError::Parse { path: path.to_path_buf(),
                                                                                                   source })
}

impl ArtifactStore for TruffleArtifactStore {
    fn resolve(&self, name: &str) -> Option<&CompiledArtifact> {
        self.inner.resolve(name)
    }

    fn names(&self) -> Vec<String> {
        self.inner.names()
    }
}
