//! El log en archivo debe reconstruir el mismo estado que el store en memoria
//! y permitir reanudar un run tras reabrirlo.

use std::fs;
use std::io::Write;

use deploy_core::{BackendError, CompiledArtifact, EventStore, InMemoryArtifactStore, InMemoryEventStore,
                  InMemoryRunRepository, MigrationEventKind, MigrationPlan, MigrationUnit, ScriptedBackend, Sequencer,
                  UnitStatus};
use deploy_persistence::{FileEventStore, PersistenceError};
use serde_json::json;
use uuid::Uuid;

fn artifacts() -> InMemoryArtifactStore {
    ["Registry", "Reward", "AlwaysExecutableJob", "SimpleCronJob"].into_iter()
                                                                  .map(|n| CompiledArtifact::new(n, json!([]), format!("0x60{:02x}", n.len())))
                                                                  .collect()
}

fn plan() -> MigrationPlan {
    MigrationPlan::new(vec![MigrationUnit::new(2, "deploy_contracts", ["Registry", "Reward"]),
                            MigrationUnit::new(3, "deploy_examples", ["AlwaysExecutableJob", "SimpleCronJob"])]).unwrap()
}

#[test]
fn file_store_matches_in_memory_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let run_id = Uuid::new_v4();
    let plan = plan();

    let file = FileEventStore::open(dir.path().join("development.events.jsonl")).unwrap();
    let mut on_disk = Sequencer::new_with_stores(file, InMemoryRunRepository::new());
    on_disk.run_plan_with(run_id, &plan, &artifacts(), &mut ScriptedBackend::new())
           .unwrap();

    let mut in_memory = Sequencer::new_with_stores(InMemoryEventStore::default(), InMemoryRunRepository::new());
    in_memory.run_plan_with(run_id, &plan, &artifacts(), &mut ScriptedBackend::new())
             .unwrap();

    let codes = |events: Vec<deploy_core::MigrationEvent>| events.iter().map(|e| e.kind.code()).collect::<Vec<_>>();
    assert_eq!(codes(on_disk.events_for(run_id)), codes(in_memory.events_for(run_id)));
    assert_eq!(on_disk.run_fingerprint_for(run_id), in_memory.run_fingerprint_for(run_id));

    // Reabrir devuelve exactamente los mismos eventos.
    let reopened = FileEventStore::open(dir.path().join("development.events.jsonl")).unwrap();
    assert_eq!(reopened.list(run_id), on_disk.events_for(run_id));
    assert_eq!(reopened.latest_run(), Some(run_id));
}

#[test]
fn reopened_log_resumes_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state/development.events.jsonl");
    let plan = plan();
    let run_id = Uuid::new_v4();

    {
        let store = FileEventStore::open(&path).unwrap();
        let mut sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
        let mut backend = ScriptedBackend::new().fail_artifact("SimpleCronJob", BackendError::Unavailable("node down".into()));
        assert!(sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend)
                         .is_err());
    }

    let store = FileEventStore::open(&path).unwrap();
    assert_eq!(store.latest_run(), Some(run_id));
    let mut sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
    let instance = sequencer.instance(run_id, &plan);
    assert_eq!(instance.slot(2).unwrap().status, UnitStatus::Completed);
    assert_eq!(instance.failed_unit().map(|s| s.sequence), Some(3));

    assert!(sequencer.retry_unit(run_id, &plan, 3, Some("node back".into()), None)
                     .unwrap());
    let mut backend = ScriptedBackend::new();
    let summary = sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend)
                           .unwrap();
    assert_eq!(summary.skipped, vec![2]);
    assert_eq!(backend.requests(), ["AlwaysExecutableJob", "SimpleCronJob"]);
    assert!(summary.run_fingerprint.is_some());
}

#[test]
fn latest_run_follows_initialization_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileEventStore::open(dir.path().join("log.jsonl")).unwrap();
    assert_eq!(store.latest_run(), None);

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    for id in [first, second] {
        store.append_kind(id,
                          MigrationEventKind::RunInitialized { plan_hash: "p".into(),
                                                               unit_count: 1,
                                                               network: "development".into() })
             .unwrap();
    }
    // Un evento tardío del primero no cambia cuál es el último run.
    store.append_kind(first,
                      MigrationEventKind::UnitStarted { sequence: 1,
                                                        name: "u".into(),
                                                        attempt: 1 })
         .unwrap();
    assert_eq!(store.latest_run(), Some(second));
    assert_eq!(store.runs(), &[first, second]);
    assert_eq!(store.list(first).iter().map(|e| e.seq).collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn corrupt_line_is_reported_with_its_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    {
        let mut store = FileEventStore::open(&path).unwrap();
        store.append_kind(Uuid::new_v4(),
                          MigrationEventKind::RunCompleted { run_fingerprint: "f".into() })
             .unwrap();
    }
    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "{{not json").unwrap();

    match FileEventStore::open(&path) {
        Err(PersistenceError::CorruptLog { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected CorruptLog, got {other:?}"),
    }
}

#[test]
fn torn_last_line_is_dropped_and_run_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("development.events.jsonl");
    let plan = plan();
    let run_id = Uuid::new_v4();
    {
        let store = FileEventStore::open(&path).unwrap();
        let mut sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
        sequencer.next_with(run_id, &plan, &artifacts(), &mut ScriptedBackend::new())
                 .unwrap();
    }
    let intact = fs::metadata(&path).unwrap().len();
    // Crash a mitad de un append: fragmento sin '\n'.
    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
    write!(file, r#"{{"seq":8,"run_id":"{run_id}","kind":{{"UnitSta"#).unwrap();
    drop(file);

    let store = FileEventStore::open(&path).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), intact);
    assert_eq!(store.latest_run(), Some(run_id));
    let mut sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
    assert_eq!(sequencer.instance(run_id, &plan).slot(2).unwrap().status, UnitStatus::Completed);

    let mut backend = ScriptedBackend::new();
    let summary = sequencer.run_plan_with(run_id, &plan, &artifacts(), &mut backend)
                           .unwrap();
    assert_eq!(summary.skipped, vec![2]);
    assert_eq!(backend.requests(), ["AlwaysExecutableJob", "SimpleCronJob"]);

    // Lo escrito después del truncado se relee sin errores.
    let reopened = FileEventStore::open(&path).unwrap();
    assert_eq!(reopened.list(run_id), sequencer.events_for(run_id));
}

#[test]
fn complete_last_line_without_newline_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    let run_id = Uuid::new_v4();
    {
        let mut store = FileEventStore::open(&path).unwrap();
        store.append_kind(run_id,
                          MigrationEventKind::RunInitialized { plan_hash: "p".into(),
                                                               unit_count: 1,
                                                               network: "development".into() })
             .unwrap();
    }
    // Quitar el '\n' final: el evento está completo y debe conservarse.
    let raw = fs::read_to_string(&path).unwrap();
    fs::write(&path, raw.trim_end()).unwrap();

    let mut store = FileEventStore::open(&path).unwrap();
    assert_eq!(store.list(run_id).len(), 1);
    store.append_kind(run_id,
                      MigrationEventKind::RunCompleted { run_fingerprint: "f".into() })
         .unwrap();
    drop(store);
    let reopened = FileEventStore::open(&path).unwrap();
    assert_eq!(reopened.list(run_id).iter().map(|e| e.kind.code()).collect::<Vec<_>>(), ["I", "C"]);
}
