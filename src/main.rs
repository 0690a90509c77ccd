use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use gridmorph::config::{AppConfig, ConfigManager};
use gridmorph::runner::Orchestrator;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Evolve against every task and checkpoint the results.
    Train,
    /// Produce a submission from an existing checkpoint.
    Solve,
    /// Train, then solve, inside a single time budget.
    Full,
}

/// Evolutionary solver for grid transformation puzzles.
#[derive(Parser)]
#[command(name = "gridmorph")]
#[command(about = "Evolve grid transformation programs under a time budget", long_about = None)]
#[command(version)]
struct Cli {
    /// What to run.
    #[arg(long, value_enum, default_value = "full")]
    mode: Mode,

    /// Task file: a JSON object mapping task ids to tasks.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for the submission and checkpoint files.
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Checkpoint to resume from or solve from.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overall wall-clock budget in hours.
    #[arg(long)]
    time_budget_hours: Option<f64>,

    /// Genomes per generation.
    #[arg(long)]
    population_size: Option<usize>,

    /// Root random seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let manager = ConfigManager::new();
    if let Some(path) = &cli.config {
        manager
            .load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
    }
    let mut config = manager.get();
    if let Some(hours) = cli.time_budget_hours {
        config.runtime.time_budget_hours = hours;
    }
    if let Some(population) = cli.population_size {
        config.evolution.population_size = population;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut orchestrator = Orchestrator::new(config, cli.seed);

    match cli.mode {
        Mode::Train => {
            orchestrator.train(&cli.input, &cli.output_dir, cli.checkpoint.as_deref())?
        }
        Mode::Solve => {
            let Some(checkpoint) = &cli.checkpoint else {
                bail!("--checkpoint is required in solve mode");
            };
            orchestrator.solve(&cli.input, &cli.output_dir, checkpoint)?;
        }
        Mode::Full => {
            orchestrator.full(&cli.input, &cli.output_dir, cli.checkpoint.as_deref())?
        }
    }
    Ok(())
}
