use anyhow::Context;
use clap::Parser;
use rescue_ga::baseline::build_baseline;
use rescue_ga::models::{JsonSnapshotWriter, Path};
use rescue_ga::{
    Configuration, RunOutcome, WorkerComparison, bootstrap_optimizer, compare_workers,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rescue")]
#[command(about = "Search a 3D grid for survivor rescue paths with an island-model genetic algorithm")]
struct Cli {
    /// JSON configuration file; missing fields fall back to defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Worker threads (0 = one per core)
    #[arg(long)]
    workers: Option<usize>,
    /// Seed for a reproducible grid and reproducible workers
    #[arg(long)]
    seed: Option<u64>,
    /// Directory receiving snapshot_<n>.json files
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
    /// Also compute the A* baseline and compare
    #[arg(long)]
    baseline: bool,
    /// Print the outcome as JSON instead of text
    #[arg(long)]
    json: bool,
    /// Run the same environment with one worker and with the configured workers, and
    /// report the speedup
    #[arg(long)]
    compare_workers: bool,
}

fn describe(label: &str, path: &Path, survivors: usize) {
    println!("{label}");
    println!("  fitness:   {:.2}", path.fitness());
    println!("  survivors: {}/{}", path.survivors_reached(), survivors);
    println!("  priority:  {}", path.priority_sum());
    println!("  coverage:  {}", path.coverage());
    println!("  risk:      {}", path.risk());
    println!("  length:    {}", path.len());
    let steps: Vec<String> = path.genes().iter().map(ToString::to_string).collect();
    println!("  path:      {}", steps.join(" -> "));
}

fn report(outcome: &RunOutcome, survivors: usize) {
    println!(
        "Run {} concluded with {:?} after {} generations in {:.3}s",
        outcome.run_id(),
        outcome.conclusion(),
        outcome.generation(),
        outcome.elapsed().as_secs_f64()
    );
    if outcome.failed_workers() > 0 {
        println!("  {} worker(s) failed", outcome.failed_workers());
    }

    match outcome.best() {
        Some(best) => describe("Best path:", best, survivors),
        None => println!("No feasible path was found"),
    }
}

fn compare(comparison: &WorkerComparison) {
    let row = |label: &str, outcome: &RunOutcome| {
        println!(
            "{label:<10} {:>9.3}s {:>14} {:>10}",
            outcome.elapsed().as_secs_f64(),
            outcome
                .best_fitness()
                .map_or_else(|| "-".to_string(), |f| format!("{f:.2}")),
            outcome.best().map_or(0, Path::survivors_reached),
        );
    };

    println!(
        "{:<10} {:>10} {:>14} {:>10}",
        "workers", "time", "best fitness", "survivors"
    );
    row("1", comparison.single());
    row(&comparison.workers().to_string(), comparison.parallel());
    println!("Speedup:             {:.2}x", comparison.speedup());
    println!("Parallel efficiency: {:.1}%", comparison.efficiency() * 100.0);
}

fn main() -> anyhow::Result<()> {
    dotenv::from_filename(".env.local").ok();
    tracing_subscriber::fmt()
        .with_thread_ids(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Configuration::from_file(path)?,
        None => Configuration::default(),
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    tracing::debug!(config = %serde_json::to_string(&config)?, "Loaded configuration");

    if cli.compare_workers {
        let comparison = compare_workers(&config)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        } else {
            compare(&comparison);
        }
        return Ok(());
    }

    let mut builder = bootstrap_optimizer(&config)?;
    if let Some(directory) = &cli.snapshot_dir {
        builder = builder.with_snapshot_sink(JsonSnapshotWriter::new(directory)?);
    }

    let service = builder.build().context("Could not prepare the run")?;
    let survivors = service.environment().survivors().len();
    let max_path_length = service.request().max_path_length();
    let model = service.fitness_model();

    let outcome = service.run()?;

    let baseline = if cli.baseline {
        outcome
            .best()
            .and_then(Path::start)
            .map(|start| build_baseline(&model, start, max_path_length))
    } else {
        None
    };

    if cli.json {
        let value = serde_json::json!({ "outcome": outcome, "baseline": baseline });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    report(&outcome, survivors);
    if cli.baseline {
        match (&baseline, outcome.best()) {
            (Some(baseline), Some(best)) => {
                describe("A* baseline from the same start:", baseline, survivors);
                println!(
                    "Fitness difference (GA - A*): {:.2}",
                    best.fitness() - baseline.fitness()
                );
            }
            _ => println!("No baseline: the run produced no start position"),
        }
    }

    Ok(())
}
