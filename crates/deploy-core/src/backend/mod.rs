//! Contrato con el backend de despliegue (red / nodo externo).
//!
//! Cada llamada a `deploy` bloquea hasta que el backend acepta o rechaza la
//! publicación. El secuenciador no reintenta: cualquier `BackendError` se
//! traduce a `DeployError::DeploymentFailed`.

mod scripted;
mod traits;

pub use scripted::ScriptedBackend;
pub use traits::{BackendError, DeployRequest, DeploymentBackend, DeploymentReceipt};
