use serde::{Deserialize, Serialize};

/// Paso numerado de migración.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationUnit {
    /// Orden de ejecución (ascendente).
    pub sequence: u32,
    /// Etiqueta legible, p.ej. `deploy_contracts`.
    pub name: String,
    /// Artifacts a desplegar, en el orden en que se piden al backend.
    pub artifacts: Vec<String>,
}

impl MigrationUnit {
    pub fn new<I, S>(sequence: u32, name: impl Into<String>, artifacts: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        Self { sequence,
               name: name.into(),
               artifacts: artifacts.into_iter().map(Into::into).collect() }
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
