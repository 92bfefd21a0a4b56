use std::collections::BTreeMap;

use crate::errors::DeployError;
use crate::model::CompiledArtifact;

/// Lookup de artifacts compilados por nombre.
pub trait ArtifactStore {
    /// Devuelve el artifact registrado bajo `name`, si existe.
    fn resolve(&self, name: &str) -> Option<&CompiledArtifact>;

    /// Nombres disponibles en orden estable.
    fn names(&self) -> Vec<String>;

    /// Variante que falla con `ArtifactNotFound` / `ArtifactNotDeployable`.
    fn require(&self, name: &str) -> Result<&CompiledArtifact, DeployError> {
        let artifact = self.resolve(name)
                           .ok_or_else(|| DeployError::ArtifactNotFound { name: name.to_string() })?;
        if !artifact.is_deployable() {
            return Err(DeployError::ArtifactNotDeployable { name: name.to_string() });
        }
        Ok(artifact)
    }
}

/// Store en memoria construido por el llamador.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    inner: BTreeMap<String, CompiledArtifact>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un artifact; si el nombre ya existía lo reemplaza y devuelve el anterior.
    pub fn insert(&mut self, artifact: CompiledArtifact) -> Option<CompiledArtifact> {
        self.inner.insert(artifact.name.clone(), artifact)
    }

    pub fn with(mut self, artifact: CompiledArtifact) -> Self {
        self.insert(artifact);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<CompiledArtifact> for InMemoryArtifactStore {
    fn from_iter<I: IntoIterator<Item = CompiledArtifact>>(iter: I) -> Self {
        Self { inner: iter.into_iter().map(|a| (a.name.clone(), a)).collect() }
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn resolve(&self, name: &str) -> Option<&CompiledArtifact> {
        self.inner.get(name)
    }

    fn names(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }
}
