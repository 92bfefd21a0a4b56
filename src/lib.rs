//! DeployFlow Rust Library
//!
//! Fachada del workspace:
//! - Reexporta `deploy_core`, `deploy_adapters` y `deploy_persistence`.
//! - `demo`: artifacts de ejemplo y un run completo sobre la cadena
//!   simulada, usado por `main.rs` y por los tests de integración.

pub use deploy_adapters;
pub use deploy_core;
pub use deploy_persistence;

pub mod demo;
