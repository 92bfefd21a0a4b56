//! Plan incorporado + artifacts Truffle en disco + cadena simulada.

use std::fs;

use deploy_adapters::{builtin_plan, ArtifactLoadError, ChainConfig, SimulatedChain, TruffleArtifactStore};
use deploy_core::{ArtifactStore, DeployError, Sequencer};
use serde_json::json;
use uuid::Uuid;

fn write_artifact(dir: &std::path::Path, name: &str, bytecode: &str) {
    let body = json!({
        "contractName": name,
        "abi": [{"type": "constructor", "inputs": []}],
        "bytecode": bytecode,
        "deployedBytecode": bytecode,
        "networks": {}
    });
    fs::write(dir.join(format!("{name}.json")), body.to_string()).unwrap();
}

fn build_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in ["Registry", "Reward", "AlwaysExecutableJob", "SimpleCronJob"] {
        write_artifact(dir.path(), name, "0x608060405234801561001057600080fd5b50");
    }
    write_artifact(dir.path(), "IJob", "0x");
    fs::write(dir.path().join("README.txt"), "not an artifact").unwrap();
    dir
}

#[test]
fn loads_every_json_artifact() {
    let dir = build_dir();
    let store = TruffleArtifactStore::load(dir.path()).unwrap();
    assert_eq!(store.len(), 5);
    assert!(store.resolve("SimpleCronJob").is_some());
    assert!(store.require("IJob").is_err());
}

#[test]
fn broken_json_names_the_file() {
    let dir = build_dir();
    fs::write(dir.path().join("Broken.json"), "{ nope").unwrap();
    match TruffleArtifactStore::load(dir.path()) {
        Err(ArtifactLoadError::Parse { path, .. }) => assert!(path.ends_with("Broken.json")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn only_regular_json_files_are_loaded() {
    let dir = build_dir();
    fs::create_dir(dir.path().join("nested.json")).unwrap();
    write_artifact(&dir.path().join("nested.json"), "Hidden", "0x6080");
    let store = TruffleArtifactStore::load(dir.path()).unwrap();
    assert_eq!(store.len(), 5);
    assert!(store.resolve("Hidden").is_none());
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("build").join("contracts");
    assert!(matches!(TruffleArtifactStore::load(&missing), Err(ArtifactLoadError::MissingDirectory(_))));
}

#[test]
fn builtin_plan_deploys_on_simulated_chain() {
    let dir = build_dir();
    let store = TruffleArtifactStore::load(dir.path()).unwrap();
    let plan = builtin_plan().unwrap();
    let mut chain = SimulatedChain::default();
    let mut sequencer = Sequencer::in_memory();

    let summary = sequencer.run_plan_with(Uuid::new_v4(), &plan, &store, &mut chain)
                           .unwrap();
    let order: Vec<&str> = summary.deployed.iter().map(|r| r.artifact.as_str()).collect();
    assert_eq!(order, ["Registry", "Reward", "AlwaysExecutableJob", "SimpleCronJob"]);
    assert!(summary.deployed.iter().all(|r| r.network == "development"));
    let deployed: Vec<&str> = chain.deployed().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(deployed, order);
}

#[test]
fn underfunded_chain_fails_second_unit_on_its_second_deploy() {
    let dir = build_dir();
    let store = TruffleArtifactStore::load(dir.path()).unwrap();
    let plan = builtin_plan().unwrap();
    // 18 bytes de código: cada despliegue cuesta 100 + 18 = 118.
    let mut chain = SimulatedChain::new(ChainConfig { balance: 118 * 3,
                                                      base_cost: 100,
                                                      cost_per_byte: 1,
                                                      ..ChainConfig::default() });
    let mut sequencer = Sequencer::in_memory();
    let err = sequencer.run_plan_with(Uuid::new_v4(), &plan, &store, &mut chain)
                       .unwrap_err();
    assert!(matches!(&err, DeployError::DeploymentFailed { artifact, .. } if artifact == "SimpleCronJob"),
            "unexpected error {err:?}");
    assert_eq!(chain.deployed().len(), 3);
}
