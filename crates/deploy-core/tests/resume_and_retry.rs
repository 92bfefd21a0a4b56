//! Reanudación de runs y retry manual de unidades fallidas.

use deploy_core::{BackendError, CompiledArtifact, DeployError, InMemoryArtifactStore, MigrationEventKind, MigrationPlan,
                  MigrationUnit, ScriptedBackend, Sequencer, UnitStatus};
use serde_json::json;
use uuid::Uuid;

fn artifacts() -> InMemoryArtifactStore {
    ["Registry", "Reward", "AlwaysExecutableJob", "SimpleCronJob"].into_iter()
                                                                  .map(|n| CompiledArtifact::new(n, json!([]), format!("0x{:x}", n.len())))
                                                                  .collect()
}

fn plan() -> MigrationPlan {
    MigrationPlan::new(vec![MigrationUnit::new(2, "deploy_contracts", ["Registry", "Reward"]),
                            MigrationUnit::new(3, "deploy_examples", ["AlwaysExecutableJob", "SimpleCronJob"])]).unwrap()
}

#[test]
fn rerunning_a_run_skips_completed_units() {
    let plan = plan();
    let mut sequencer = Sequencer::in_memory();
    let run_id = Uuid::new_v4();
    let mut backend = ScriptedBackend::new();

    // Sólo la primera unidad.
    sequencer.next_with(run_id, &plan, &artifacts(), &mut backend).unwrap();
    let summary = sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend)
                           .unwrap();
    assert_eq!(summary.skipped, vec![2]);
    assert_eq!(summary.deployed.len(), 2);
    assert_eq!(backend.requests(),
               ["Registry", "Reward", "AlwaysExecutableJob", "SimpleCronJob"]);

    // Un run completo no vuelve a pedir nada.
    let summary = sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend)
                           .unwrap();
    assert!(summary.deployed.is_empty());
    assert_eq!(summary.skipped, vec![2, 3]);
    assert_eq!(backend.requests().len(), 4);
}

#[test]
fn extended_plan_runs_only_new_units() {
    let mut sequencer = Sequencer::in_memory();
    let run_id = Uuid::new_v4();
    let mut backend = ScriptedBackend::new();
    sequencer.run_plan_with(run_id, &plan(), &artifacts(), &mut backend).unwrap();

    let mut units = plan().units().to_vec();
    units.push(MigrationUnit::new(4, "redeploy_registry", ["Registry"]));
    let extended = MigrationPlan::new(units).unwrap();
    let summary = sequencer.run_plan_with(run_id, &extended, &artifacts(), &mut backend)
                           .unwrap();
    assert_eq!(summary.deployed.len(), 1);
    assert_eq!(summary.deployed[0].unit, 4);
    assert_eq!(backend.requests().last().map(String::as_str), Some("Registry"));
}

#[test]
fn retry_rearms_failed_unit_and_redeploys_it_whole() {
    let plan = plan();
    let mut sequencer = Sequencer::in_memory();
    let run_id = Uuid::new_v4();
    let mut backend = ScriptedBackend::new().fail_artifact("SimpleCronJob", BackendError::Unavailable("rpc down".into()));

    let err = sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend)
                       .unwrap_err();
    assert!(matches!(err, DeployError::DeploymentFailed { .. }));

    // Retry sobre una unidad completada se rechaza.
    assert!(!sequencer.retry_unit(run_id, &plan, 2, None, None).unwrap());
    assert_eq!(sequencer.retry_unit(run_id, &plan, 9, None, None).unwrap_err(),
               DeployError::UnknownUnit(9));

    assert!(sequencer.retry_unit(run_id, &plan, 3, Some("rpc back".into()), Some(3))
                     .unwrap());
    backend.heal();
    let summary = sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend)
                           .unwrap();
    let names: Vec<&str> = summary.deployed.iter().map(|r| r.artifact.as_str()).collect();
    assert_eq!(names, ["AlwaysExecutableJob", "SimpleCronJob"]);

    let instance = sequencer.instance(run_id, &plan);
    let slot = instance.slot(3).unwrap();
    assert_eq!(slot.status, UnitStatus::Completed);
    assert_eq!(slot.attempts, 2);
    assert_eq!(slot.deployments.len(), 2);
    assert!(instance.completed);
    assert!(sequencer.events_for(run_id)
                     .iter()
                     .any(|e| matches!(e.kind, MigrationEventKind::UnitRetryScheduled { attempt: 2, .. })));
}

#[test]
fn retry_respects_attempt_cap() {
    let plan = plan();
    let mut sequencer = Sequencer::in_memory();
    let run_id = Uuid::new_v4();
    let mut backend = ScriptedBackend::new().fail_artifact("Reward", BackendError::Rejected("revert".into()));
    let _ = sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend);

    assert!(!sequencer.retry_unit(run_id, &plan, 2, None, Some(1)).unwrap());
    assert!(sequencer.retry_unit(run_id, &plan, 2, None, Some(2)).unwrap());
    // Sigue fallando: segundo intento agotado.
    let _ = sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend);
    assert!(!sequencer.retry_unit(run_id, &plan, 2, None, Some(2)).unwrap());
}

#[test]
fn fingerprints_are_reproducible_for_identical_runs() {
    let run = || {
        let mut sequencer = Sequencer::in_memory();
        let run_id = Uuid::new_v4();
        sequencer.run_plan_with(run_id, &plan(), &artifacts(), &mut ScriptedBackend::new())
                 .unwrap()
                 .run_fingerprint
                 .expect("run fingerprint")
    };
    assert_eq!(run(), run());
}

#[test]
fn range_run_is_blocked_by_a_failed_earlier_unit() {
    let plan = plan();
    let mut sequencer = Sequencer::in_memory();
    let run_id = Uuid::new_v4();
    let mut backend = ScriptedBackend::new().fail_artifact("Reward", BackendError::Rejected("revert".into()));
    assert!(sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend)
                     .is_err());

    backend.heal();
    let err = sequencer.run_range_with(run_id, &plan, Some(3), None, &artifacts(), &mut backend)
                       .unwrap_err();
    assert_eq!(err, DeployError::RunHasFailed { sequence: 2 });
    assert_eq!(backend.requests(), ["Registry", "Reward"]);
    let instance = sequencer.instance(run_id, &plan);
    assert_eq!(instance.slot(2).unwrap().status, UnitStatus::Failed);
    assert_eq!(instance.slot(3).unwrap().status, UnitStatus::Pending);
}

#[test]
fn range_run_waits_for_pending_earlier_units() {
    let plan = plan();
    let mut sequencer = Sequencer::in_memory();
    let run_id = Uuid::new_v4();
    let mut backend = ScriptedBackend::new();

    let err = sequencer.run_range_with(run_id, &plan, Some(3), None, &artifacts(), &mut backend)
                       .unwrap_err();
    assert_eq!(err, DeployError::UnitPending { sequence: 2 });
    assert!(backend.requests().is_empty());

    // `--to` sí puede correr sola la primera unidad; luego el rango superior.
    let first = sequencer.run_range_with(run_id, &plan, None, Some(2), &artifacts(), &mut backend)
                         .unwrap();
    assert_eq!(first.deployed.len(), 2);
    let rest = sequencer.run_range_with(run_id, &plan, Some(3), None, &artifacts(), &mut backend)
                        .unwrap();
    assert_eq!(rest.deployed.len(), 2);
    assert!(sequencer.instance(run_id, &plan).completed);
}

#[test]
fn changed_plan_is_reported_as_drift() {
    let plan = plan();
    let mut sequencer = Sequencer::in_memory();
    let run_id = Uuid::new_v4();
    let mut backend = ScriptedBackend::new();
    sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend).unwrap();
    assert!(sequencer.plan_drift(run_id, &plan).is_empty());

    // Mismo contenido restringido a un rango: no es un cambio.
    assert!(sequencer.plan_drift(run_id, &plan.range(Some(3), None).unwrap()).is_empty());

    let reordered = MigrationPlan::new(vec![MigrationUnit::new(2, "deploy_contracts", ["Reward", "Registry"]),
                                            MigrationUnit::new(3, "deploy_examples", ["AlwaysExecutableJob", "SimpleCronJob"])]).unwrap();
    assert_eq!(sequencer.plan_drift(run_id, &reordered), vec![2]);

    // Las unidades completadas no se redespliegan por el cambio.
    let summary = sequencer.run_plan_with(run_id, &reordered, &artifacts(), &mut backend)
                           .unwrap();
    assert!(summary.deployed.is_empty());
    assert_eq!(backend.requests().len(), 4);
}
