//! Unidades de migración y plan ordenado.
//!
//! Una unidad es un paso numerado con una lista ordenada de artifacts a
//! desplegar. El plan fija el orden ascendente por `sequence`; no se infiere
//! nada de nombres de archivo.

pub mod definition;
pub mod plan;
mod status;

pub use definition::MigrationUnit;
pub use plan::MigrationPlan;
pub use status::UnitStatus;
