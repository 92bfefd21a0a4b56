//! Plan incorporado: las dos unidades de migración del proyecto.
//!
//! La unidad 1 (contrato de bookkeeping de migraciones) no forma parte del
//! plan; la numeración arranca en 2.

use deploy_core::{DeployError, MigrationPlan, MigrationUnit};

pub const REGISTRY: &str = "Registry";
pub const REWARD: &str = "Reward";
pub const ALWAYS_EXECUTABLE_JOB: &str = "AlwaysExecutableJob";
pub const SIMPLE_CRON_JOB: &str = "SimpleCronJob";

/// Unidad 2: contratos núcleo.
pub fn deploy_contracts() -> MigrationUnit {
    MigrationUnit::new(2, "deploy_contracts", [REGISTRY, REWARD])
}

/// Unidad 3: jobs de ejemplo.
pub fn deploy_examples() -> MigrationUnit {
    MigrationUnit::new(3, "deploy_examples", [ALWAYS_EXECUTABLE_JOB, SIMPLE_CRON_JOB])
}

pub fn builtin_plan() -> Result<MigrationPlan, DeployError> {
    MigrationPlan::new(vec![deploy_contracts(), deploy_examples()])
}
