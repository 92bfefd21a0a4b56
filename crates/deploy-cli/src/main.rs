use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deploy_cli::{exit_code, migrate, print_plan, retry, status, MigrateArgs};
use deploy_persistence::DeployConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deploy-cli")]
#[command(about = "Run contract deployment migrations in order")]
#[command(version)]
struct Cli {
    /// Plan file (defaults to DEPLOYFLOW_CONFIG or migrations.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pending units of the current run
    Migrate(MigrateArgs),
    /// Show the state of the latest run
    Status,
    /// Print the resolved plan
    Plan,
    /// Re-arm a failed unit so the next migrate runs it again
    Retry {
        #[arg(long)]
        unit: u32,
        #[arg(long)]
        reason: Option<String>,
        /// Refuse when the unit already has this many attempts
        #[arg(long)]
        max: Option<u32>,
    },
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
                             .init();

    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit_code(&e)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = DeployConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Migrate(args) => migrate(&config, &args),
        Commands::Status => status(&config),
        Commands::Plan => print_plan(&config),
        Commands::Retry { unit, reason, max } => retry(&config, unit, reason, max),
    }
}
