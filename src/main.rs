mod console;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cadence_core::config::CadenceConfig;
use cadence_core::event::EventBus;
use cadence_flow::{CadenceLibrary, Simulator};

#[derive(Parser)]
#[command(name = "cadence", version, about = "Compose and test-run email outreach cadences")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "cadence.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List cadences and their step counts
    List,
    /// Show a cadence in run order
    Show {
        /// Cadence name or id (default: the first cadence)
        #[arg(long)]
        cadence: Option<String>,
    },
    /// Test-run a cadence, simulating each step
    Run {
        /// Cadence name or id (default: the first cadence)
        #[arg(long)]
        cadence: Option<String>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Start the interactive cadence editor
    Repl,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "cadence", &mut std::io::stdout());
        return Ok(());
    }

    let config = CadenceConfig::load_or_default(&cli.config)?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.config.exists() {
        info!(path = %cli.config.display(), "Loaded config");
    }

    let event_bus = Arc::new(EventBus::new(config.events.capacity));
    let simulator = Simulator::new(config.simulator.clone(), event_bus);
    let mut library = CadenceLibrary::with_samples();

    match cli.command {
        Some(Commands::List) => {
            for cadence in library.list() {
                println!("{:<3} {:<20} {} steps", cadence.id, cadence.name, cadence.steps());
            }
        }
        Some(Commands::Show { cadence }) => {
            if let Some(key) = cadence {
                library.select(&key)?;
            }
            console::print_cadence(library.active(), &simulator.statuses());
        }
        Some(Commands::Run { cadence, json }) => {
            if let Some(key) = cadence {
                library.select(&key)?;
            }
            let snapshot = library.active().graph.snapshot();
            let mut lines = console::spawn_stdin_lines();
            console::drive_run(&simulator, &snapshot, &mut lines, json).await?;
        }
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
        }
        Some(Commands::Repl) | None => {
            let mut lines = console::spawn_stdin_lines();
            repl::run_repl(&mut library, &simulator, &mut lines).await?;
        }
        Some(Commands::Completions { .. }) => {}
    }

    Ok(())
}
