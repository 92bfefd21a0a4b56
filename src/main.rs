use deploy_adapters::{builtin_plan, ChainConfig, SimulatedChain};
use deploy_core::{DeployError, InMemoryRunRepository, MigrationEventKind, RunSummary, Sequencer, UnitStatus};
use deployflow_rust::demo::{demo_artifacts, run_demo};
use tracing_subscriber::EnvFilter;

fn print_summary(summary: &RunSummary) {
    println!("run {}", summary.run_id);
    for r in &summary.deployed {
        println!("  unit {} {:<22} {} (tx {})",
                 r.unit,
                 r.artifact,
                 r.address,
                 &r.transaction_hash[..18.min(r.transaction_hash.len())]);
    }
    if let Some(fp) = &summary.run_fingerprint {
        println!("  fingerprint {fp}");
    }
}

/// Validación: la red cae durante la unidad 3, el run queda bloqueado y un
/// retry explícito la vuelve a ejecutar completa sin repetir la unidad 2.
fn run_retry_validation() -> Result<(), String> {
    let plan = builtin_plan().map_err(|e| e.to_string())?;
    let artifacts = demo_artifacts();
    let mut chain = SimulatedChain::new(ChainConfig::default());
    let mut sequencer = Sequencer::in_memory();
    let run_id = sequencer.ensure_default_run_id();

    let first = sequencer.next_with(run_id, &plan, &artifacts, &mut chain)
                         .map_err(|e| e.to_string())?;
    println!("unit 2 desplegó {} contratos", first.len());

    chain.go_offline();
    match sequencer.next_with(run_id, &plan, &artifacts, &mut chain) {
        Err(DeployError::DeploymentFailed { artifact, reason }) => println!("unit 3 falló en {artifact}: {reason}"),
        other => return Err(format!("se esperaba DeploymentFailed, llegó {other:?}")),
    }
    if !matches!(sequencer.next_with(run_id, &plan, &artifacts, &mut chain),
                 Err(DeployError::RunHasFailed { sequence: 3 }))
    {
        return Err("el run debería quedar bloqueado en la unidad 3".into());
    }

    chain.go_online();
    let rearmed = sequencer.retry_unit(run_id, &plan, 3, Some("red restablecida".into()), Some(3))
                           .map_err(|e| e.to_string())?;
    if !rearmed {
        return Err("retry_unit rechazó la unidad 3".into());
    }
    let summary = sequencer.run_plan_with(run_id, &plan, &artifacts, &mut chain)
                           .map_err(|e| e.to_string())?;
    if summary.skipped != vec![2] || summary.deployed.len() != 2 {
        return Err(format!("resumen inesperado tras retry: {summary:?}"));
    }

    let instance = sequencer.instance(run_id, &plan);
    let slot = instance.slot(3).ok_or("falta la unidad 3")?;
    if slot.status != UnitStatus::Completed || slot.attempts != 2 {
        return Err(format!("unidad 3 en estado {} con {} intentos", slot.status.as_str(), slot.attempts));
    }
    let retries = sequencer.events_for(run_id)
                           .iter()
                           .filter(|e| matches!(e.kind, MigrationEventKind::UnitRetryScheduled { .. }))
                           .count();
    println!("eventos: {:?} (retries: {retries})",
             sequencer.events_for(run_id).iter().map(|e| e.kind.code()).collect::<Vec<_>>());
    println!("!Validación retry: OK");
    Ok(())
}

/// Mismo plan con el log de eventos en archivo; un segundo proceso (simulado
/// reabriendo el log) no vuelve a desplegar nada.
#[cfg(feature = "file_demo")]
fn run_file_demo() -> Result<(), String> {
    use deploy_persistence::FileEventStore;

    let path = std::env::temp_dir().join(format!("deployflow-demo-{}.events.jsonl", uuid::Uuid::new_v4()));
    let plan = builtin_plan().map_err(|e| e.to_string())?;
    let run_id = uuid::Uuid::new_v4();
    for pass in 1..=2 {
        let store = FileEventStore::open(&path).map_err(|e| e.to_string())?;
        let mut sequencer = Sequencer::new_with_stores(store, InMemoryRunRepository::new());
        let summary = sequencer.run_plan_with(run_id, &plan, &demo_artifacts(), &mut SimulatedChain::default())
                               .map_err(|e| e.to_string())?;
        println!("pasada {pass}: desplegados={} saltadas={:?}", summary.deployed.len(), summary.skipped);
    }
    println!("log en {}", path.display());
    Ok(())
}

fn main() {
    // Cargar variables de entorno desde .env si existe (RUST_LOG, etc.)
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                             .init();

    match run_demo(SimulatedChain::default()) {
        Ok(summary) => print_summary(&summary),
        Err(e) => eprintln!("demo falló: {e}"),
    }

    // Un segundo run sobre la misma cadena produce direcciones nuevas (nonce).
    let mut sequencer = Sequencer::new_with_stores(deploy_core::InMemoryEventStore::default(), InMemoryRunRepository::new());
    let mut chain = SimulatedChain::default().with_nonce(4);
    if let Ok(plan) = builtin_plan() {
        match sequencer.run_plan_with(uuid::Uuid::new_v4(), &plan, &demo_artifacts(), &mut chain) {
            Ok(summary) => print_summary(&summary),
            Err(e) => eprintln!("segundo run falló: {e}"),
        }
    }

    if let Err(e) = run_retry_validation() {
        eprintln!("Validación retry falló: {e}");
    }

    maybe_run_file_demo();
}

fn maybe_run_file_demo() {
    #[cfg(feature = "file_demo")]
    {
        if let Err(e) = run_file_demo() {
            eprintln!("demo con archivo falló: {e}");
        }
    }
}
