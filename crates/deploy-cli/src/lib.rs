//! Comandos de `deploy-cli`, separados del parseo de argumentos para poder
//! probarlos contra un proyecto en un directorio temporal.
//!
//! Cada comando devuelve el código de salida del proceso; los errores se
//! traducen con `exit_code`.

use clap::Args;
use deploy_adapters::{ArtifactLoadError, SimulatedChain, TruffleArtifactStore};
use deploy_core::{ArtifactStore, DeployError, DeploymentRecord, EventStore, InMemoryEventStore, InMemoryRunRepository,
                  MigrationPlan, Sequencer, UnitStatus};
use deploy_persistence::{DeployConfig, DeploymentLedger, FileEventStore, PersistenceError};
use tracing::{info, warn};
use uuid::Uuid;

pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_FAILED: i32 = 4;
pub const EXIT_INTERNAL: i32 = 5;

#[derive(Debug, Clone, Default, Args)]
pub struct MigrateArgs {
    /// Start a new run instead of resuming the latest one
    #[arg(long)]
    pub reset: bool,
    #[arg(long)]
    pub from: Option<u32>,
    #[arg(long)]
    pub to: Option<u32>,
    /// Do not write the event log nor the ledger
    #[arg(long)]
    pub dry_run: bool,
}

pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<DeployError>() {
        return match e {
            DeployError::InvalidPlan(_) | DeployError::UnknownUnit(_) => EXIT_USAGE,
            DeployError::Store(_) | DeployError::Internal(_) => EXIT_INTERNAL,
            _ => EXIT_FAILED,
        };
    }
    if let Some(e) = err.downcast_ref::<PersistenceError>() {
        return match e {
            PersistenceError::Toml { .. } | PersistenceError::ConfigNotFound(_) | PersistenceError::Invalid(_) => EXIT_USAGE,
            _ => EXIT_INTERNAL,
        };
    }
    if err.downcast_ref::<ArtifactLoadError>().is_some() {
        return EXIT_USAGE;
    }
    EXIT_INTERNAL
}

pub fn migrate(config: &DeployConfig, args: &MigrateArgs) -> anyhow::Result<i32> {
    let full = config.plan()?;
    let plan = full.range(args.from, args.to)?;
    let artifacts = TruffleArtifactStore::load(&config.project.artifacts_dir)?;
    let network = config.project.network.as_str();
    let mut ledger = DeploymentLedger::load(config.ledger_path())?;
    let mut chain = SimulatedChain::new(config.chain_config()).with_nonce(ledger.transactions(network));

    if args.dry_run {
        // Copia en memoria del run actual: lo ya completado se salta igual.
        let mut store = InMemoryEventStore::default();
        let mut run_id = Uuid::new_v4();
        if !args.reset && config.events_path().is_file() {
            let file = FileEventStore::open(config.events_path())?;
            if let Some(latest) = file.latest_run() {
                for ev in file.list(latest) {
                    store.append_kind(latest, ev.kind)?;
                }
                run_id = latest;
            }
        }
        let mut sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
        println!("dry run on {network} (nothing is persisted)");
        sequencer.ensure_prefix_completed(run_id, &full, &plan)?;
        return drive(&mut sequencer, run_id, &plan, &artifacts, &mut chain, |_| {});
    }

    let store = FileEventStore::open(config.events_path())?;
    let run_id = match store.latest_run() {
        Some(id) if !args.reset => id,
        _ => Uuid::new_v4(),
    };
    let mut sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
    // `--from` no puede saltarse una unidad anterior fallida o pendiente.
    sequencer.ensure_prefix_completed(run_id, &full, &plan)?;
    let outcome = drive(&mut sequencer, run_id, &plan, &artifacts, &mut chain, |records| {
        ledger.record_all(records.iter().cloned())
    });
    ledger.set_transactions(network, chain.nonce());
    ledger.save()?;
    outcome
}

fn drive<E, F>(sequencer: &mut Sequencer<E, InMemoryRunRepository>,
               run_id: Uuid,
               plan: &MigrationPlan,
               artifacts: &TruffleArtifactStore,
               chain: &mut SimulatedChain,
               mut on_unit: F)
               -> anyhow::Result<i32>
    where E: EventStore,
          F: FnMut(&[DeploymentRecord])
{
    let before = sequencer.instance(run_id, plan);
    for slot in before.units
                      .iter()
                      .filter(|s| matches!(s.status, UnitStatus::Completed))
    {
        println!("unit {} {}: already completed", slot.sequence, slot.name);
    }
    info!(%run_id, units = plan.len(), "migrating");

    loop {
        match sequencer.next_with(run_id, plan, artifacts, chain) {
            Ok(records) => {
                if let Some(first) = records.first() {
                    println!("unit {}: deployed {} contract(s)", first.unit, records.len());
                }
                for r in &records {
                    println!("  {:<24} {}", r.artifact, r.address);
                }
                on_unit(&records);
            }
            Err(DeployError::RunCompleted) => break,
            Err(e @ DeployError::RunHasFailed { sequence }) => {
                warn!(%run_id, sequence, "run blocked by a failed unit");
                eprintln!("unit {sequence} failed in a previous attempt; use `retry --unit {sequence}` or `migrate --reset`");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    match sequencer.run_fingerprint_for(run_id) {
        Some(fp) => println!("run {run_id} completed ({fp})"),
        None => println!("run {run_id}: nothing to do"),
    }
    Ok(EXIT_OK)
}

pub fn status(config: &DeployConfig) -> anyhow::Result<i32> {
    let plan = config.plan()?;
    let network = &config.project.network;
    let path = config.events_path();
    if !path.is_file() {
        println!("no runs recorded for {network}");
        return Ok(EXIT_OK);
    }
    let store = FileEventStore::open(&path)?;
    let Some(run_id) = store.latest_run() else {
        println!("no runs recorded for {network}");
        return Ok(EXIT_OK);
    };
    let sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
    let instance = sequencer.instance(run_id, &plan);

    println!("run {run_id} on {network}");
    for slot in &instance.units {
        println!("{:>4} {:<24} {:<10} attempts={}",
                 slot.sequence,
                 slot.name,
                 slot.status.as_str(),
                 slot.attempts);
        for d in &slot.deployments {
            println!("       {:<24} {}", d.artifact, d.address);
        }
        if let Some(err) = &slot.error {
            println!("       error: {err}");
        }
    }
    if let Some(fp) = sequencer.run_fingerprint_for(run_id) {
        println!("fingerprint {fp}");
    }
    Ok(EXIT_OK)
}

pub fn print_plan(config: &DeployConfig) -> anyhow::Result<i32> {
    let plan = config.plan()?;
    // El plan se imprime aunque falte el directorio de artifacts.
    let artifacts = TruffleArtifactStore::load(&config.project.artifacts_dir).ok();
    println!("plan {} ({} units, network {})",
             plan.plan_hash(),
             plan.len(),
             config.project.network);
    for unit in plan.units() {
        println!("{:>4} {}", unit.sequence, unit.name);
        for name in &unit.artifacts {
            let note = match artifacts.as_ref().map(|a| a.require(name)) {
                Some(Ok(_)) => "",
                Some(Err(DeployError::ArtifactNotDeployable { .. })) => " (not deployable)",
                Some(Err(_)) => " (missing)",
                None => " (unchecked)",
            };
            println!("       {name}{note}");
        }
    }
    Ok(EXIT_OK)
}

pub fn retry(config: &DeployConfig, unit: u32, reason: Option<String>, max: Option<u32>) -> anyhow::Result<i32> {
    let plan = config.plan()?;
    let path = config.events_path();
    let store = if path.is_file() { Some(FileEventStore::open(&path)?) } else { None };
    let Some((store, run_id)) = store.and_then(|s| s.latest_run().map(|id| (s, id))) else {
        eprintln!("no run recorded for {}", config.project.network);
        return Ok(EXIT_FAILED);
    };
    let mut sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
    if sequencer.retry_unit(run_id, &plan, unit, reason, max)? {
        println!("unit {unit} re-armed in run {run_id}");
        Ok(EXIT_OK)
    } else {
        eprintln!("rejected: unit {unit} is not failed or reached its attempt cap");
        Ok(EXIT_FAILED)
    }
}
