//! Artifact compilado: par interfaz (ABI) + bytecode identificado por nombre.
//!
//! - `abi` es JSON genérico; el secuenciador no interpreta su contenido.
//! - `hash` se calcula al construir sobre el JSON canónico de
//!   `{abi, bytecode}` y sirve como identidad en eventos y fingerprints.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::hashing::hash_value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledArtifact {
    pub name: String,
    pub abi: Value,
    pub bytecode: String,
    pub hash: String,
}

impl CompiledArtifact {
    pub fn new(name: impl Into<String>, abi: Value, bytecode: impl Into<String>) -> Self {
        let bytecode = bytecode.into();
        let hash = hash_value(&json!({ "abi": abi, "bytecode": bytecode }));
        Self { name: name.into(),
               abi,
               bytecode,
               hash }
    }

    /// Bytecode sin prefijo `0x`.
    pub fn code(&self) -> &str {
        self.bytecode.strip_prefix("0x").unwrap_or(&self.bytecode)
    }

    /// Interfaces y contratos abstractos compilan sin bytecode.
    pub fn is_deployable(&self) -> bool {
        !self.code().trim().is_empty()
    }

    /// Tamaño aproximado del código en bytes (dos dígitos hex por byte).
    pub fn code_size(&self) -> usize {
        self.code().len() / 2
    }
}
