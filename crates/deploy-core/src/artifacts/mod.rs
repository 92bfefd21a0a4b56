//! Resolución de artifacts por nombre.
//!
//! El store se pasa explícitamente al secuenciador: no existe un registro
//! global de artifacts.

mod store;

pub use store::{ArtifactStore, InMemoryArtifactStore};
