//! maze-chase: command-line front end for the forager/pursuer evolution.

#[cfg(feature = "visual")]
mod viewer;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use maze_chase_ga::{
    FileSink, FitnessSink, MemorySink, Role, RunSummary, Settings, Simulation, Winner,
};
use rayon::prelude::*;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};

const DEFAULT_SETTINGS: &str = "settings.json";

#[derive(Parser)]
#[command(name = "maze-chase")]
#[command(author, version, about = "Evolve forager and pursuer behaviour in a grid maze", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve for the configured number of generations
    Run {
        /// Settings file (.json or .toml); settings.json if present, else defaults
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Seed overriding the settings file
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for the average-fitness files
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Forager generations to run, overriding Evolutions
        #[arg(short, long)]
        generations: Option<u32>,
    },

    /// Run independently seeded simulations in parallel and print a JSON summary
    Batch {
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Number of runs
        #[arg(short, long, default_value = "4")]
        runs: u64,

        /// Seed of the first run; run i uses seed + i
        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(short, long)]
        generations: Option<u32>,
    },

    /// Watch the simulation in a window
    View {
        #[arg(short, long)]
        settings: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write a settings file holding the defaults
    Init {
        /// Target file (.json or .toml)
        #[arg(default_value = DEFAULT_SETTINGS)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(io::stderr).init();

    match cli.command {
        Commands::Run { settings, seed, out, generations } => {
            let mut settings = load_settings(settings.as_deref())?;
            if seed.is_some() {
                settings.seed = seed;
            }
            if let Some(generations) = generations {
                settings.evolutions = generations;
            }
            if settings.visual {
                return view(&settings);
            }
            run(&settings, &out)
        }
        Commands::Batch { settings, runs, seed, generations } => {
            let mut settings = load_settings(settings.as_deref())?;
            if let Some(generations) = generations {
                settings.evolutions = generations;
            }
            batch(&settings, runs, seed)
        }
        Commands::View { settings, seed } => {
            let mut settings = load_settings(settings.as_deref())?;
            if seed.is_some() {
                settings.seed = seed;
            }
            view(&settings)
        }
        Commands::Init { path, force } => {
            if path.exists() {
                if !force {
                    bail!("{} already exists, pass --force to overwrite", path.display());
                }
                warn!(path = %path.display(), "overwriting settings file");
            }
            Settings::default()
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote default settings to {}", path.display());
            Ok(())
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_SETTINGS).exists() => Path::new(DEFAULT_SETTINGS),
        None => {
            info!("no settings file, using defaults");
            return Ok(Settings::default());
        }
    };
    Settings::load(path).with_context(|| format!("failed to load settings from {}", path.display()))
}

fn build(settings: &Settings) -> Result<Simulation> {
    let template = settings.template().context("failed to load maze template")?;
    Simulation::configure(settings, &template).context("failed to configure simulation")
}

/// Writes every generation's averages to disk and echoes them to stdout.
struct ConsoleSink {
    files: FileSink,
}

impl FitnessSink for ConsoleSink {
    fn record(&mut self, role: Role, generation: u32, average: f32) -> io::Result<()> {
        println!("{:>8} generation {:>4}  average fitness {:.5}", role.name(), generation, average);
        self.files.record(role, generation, average)
    }
}

fn run(settings: &Settings, out: &Path) -> Result<()> {
    let mut sim = build(settings)?;
    let files = FileSink::create(out)
        .with_context(|| format!("failed to prepare output directory {}", out.display()))?;
    sim.set_sink(Box::new(ConsoleSink { files }));

    let logs = settings.logs;
    let summary = sim.run(settings.evolutions, |result| {
        if logs {
            let winner = match result.winner {
                Winner::Forager => "forager",
                Winner::Pursuer => "pursuer",
                Winner::Stalemate => "stalemate",
            };
            println!(
                "gen {:>3}/{:<3} {:<9} fruit {} ticks {:>5}  forager {:.5}  pursuer {:.5}",
                result.generations.forager,
                result.generations.pursuer,
                winner,
                result.fruit_collected,
                result.ticks,
                result.forager_fitness,
                result.pursuer_fitness,
            );
        }
    })?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} episodes: forager {} / pursuer {} / stalemate {}, {} fruit collected",
        summary.episodes,
        summary.forager_wins,
        summary.pursuer_wins,
        summary.stalemates,
        summary.fruit_collected
    );
    println!(
        "best fitness: forager {:.5}, pursuer {:.5}",
        summary.best_forager_fitness, summary.best_pursuer_fitness
    );
}

#[derive(Serialize)]
struct BatchRun {
    seed: u64,
    summary: RunSummary,
    forager_averages: Vec<f32>,
    pursuer_averages: Vec<f32>,
}

fn batch(settings: &Settings, runs: u64, base_seed: u64) -> Result<()> {
    let results: Vec<BatchRun> = (0..runs)
        .into_par_iter()
        .map(|i| -> Result<BatchRun> {
            let seed = base_seed + i;
            let seeded = Settings { seed: Some(seed), ..settings.clone() };
            let mut sim = build(&seeded)?;
            let curves = MemorySink::new();
            sim.set_sink(Box::new(curves.clone()));
            let summary = sim
                .run(seeded.evolutions, |_| {})
                .with_context(|| format!("run with seed {seed} failed"))?;
            Ok(BatchRun {
                seed,
                summary,
                forager_averages: curves.curve(Role::Forager),
                pursuer_averages: curves.curve(Role::Pursuer),
            })
        })
        .collect::<Result<_>>()?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[cfg(feature = "visual")]
fn view(settings: &Settings) -> Result<()> {
    let mut sim = build(settings)?;
    let curves = MemorySink::new();
    sim.set_sink(Box::new(curves.clone()));
    viewer::run(sim, curves)
}

#[cfg(not(feature = "visual"))]
fn view(_settings: &Settings) -> Result<()> {
    bail!("rebuild with the `visual` feature to open the viewer")
}
