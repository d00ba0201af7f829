//! VORTEX ARENA - CLI Entry Point
//!
//! Headless driver for the arena kernel.

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Instant;
use vortex_arena::arena::wander_intents;
use vortex_arena::snapshot::{FrameLog, StatusFrame};
use vortex_arena::{benchmark, Arena, Config, HazardState};

#[derive(Parser)]
#[command(name = "vortex-arena")]
#[command(version)]
#[command(about = "Headless driver for the vortex arena simulation kernel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless match with wandering agents
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "300")]
        ticks: u64,

        /// Number of agents to spawn
        #[arg(short, long, default_value = "6")]
        agents: usize,

        /// Random seed, overriding the config
        #[arg(long)]
        seed: Option<u64>,

        /// Write status frames to this file
        #[arg(short, long)]
        frames: Option<PathBuf>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the safe-zone shrink schedule of a configuration
    Forecast {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of ticks
        #[arg(short, long, default_value = "1000")]
        ticks: u64,

        /// Number of agents
        #[arg(short, long, default_value = "8")]
        agents: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Summarize a recorded frame file
    Inspect {
        /// Frame file
        frames: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            agents,
            seed,
            frames,
            quiet,
        } => run_match(config, ticks, agents, seed, frames, quiet),

        Commands::Forecast { config } => print_forecast(config),

        Commands::Benchmark { ticks, agents } => run_benchmark(ticks, agents),

        Commands::Init { output } => generate_config(output),

        Commands::Inspect { frames } => inspect_frames(frames),
    }
}

fn load_config(path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        log::info!("Loading config from: {:?}", path);
        Config::from_file(path)
    } else {
        log::info!("Using default configuration");
        Ok(Config::default())
    }
}

fn run_match(
    config_path: PathBuf,
    ticks: u64,
    agents: usize,
    seed: Option<u64>,
    frames: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&config_path)?;
    if let Some(s) = seed {
        config.arena.seed = s;
    }

    let stats_interval = config.logging.stats_interval.max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(config.arena.seed.wrapping_add(1));
    let mut arena = Arena::new(config.clone());
    for i in 0..agents {
        arena.spawn_agent(format!("agent-{}", i));
    }

    println!("Starting match");
    println!("  Agents: {}", arena.live_count());
    println!("  Arena: {}x{}", config.arena.columns, config.arena.rows);
    println!("  Seed: {}", arena.seed());
    println!("  Ticks: {}", ticks);
    println!();

    let mut log = FrameLog::new();
    let start = Instant::now();

    for _ in 0..ticks {
        if frames.is_some() {
            log.record(StatusFrame::capture(&arena));
        }

        let intents = wander_intents(&arena, &mut rng);
        let report = arena.step(&intents);

        if !quiet {
            for death in &report.deaths {
                println!("  tick {:>4}: agent {} died at {} ({:?})", report.tick, death.agent, death.position, death.cause);
            }
            if report.tick % stats_interval == 0 {
                let hazard = arena.hazard().report();
                println!(
                    "tick {:>4} | alive {:>2} | zone {} | hazard {:?} ({} left)",
                    report.tick,
                    arena.live_count(),
                    arena.safe_zone().current_bounds(),
                    hazard.state(),
                    hazard.ticks_remaining
                );
            }
        }

        if arena.live_count() == 0 {
            println!("\nNo agents left at tick {}", arena.tick());
            break;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("=== Match Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Ticks: {}", arena.tick());
    println!("Speed: {:.1} ticks/s", arena.tick() as f64 / elapsed.as_secs_f64().max(f64::EPSILON));

    let mut standings: Vec<_> = arena.agents().iter().collect();
    standings.sort_by(|a, b| b.score.cmp(&a.score));
    for agent in standings {
        println!(
            "  {:<10} score {:>5}  length {:>3}  {}",
            agent.name,
            agent.score,
            agent.len(),
            if agent.is_active() { "alive" } else { "dead" }
        );
    }

    if let Some(path) = frames {
        log.save(&path)?;
        println!("Frames: {:?} ({} recorded)", path, log.len());
    }

    Ok(())
}

fn print_forecast(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&config_path)?;
    let arena = Arena::new(config.clone());
    let zone = arena.safe_zone();

    println!("=== Safe Zone Schedule ===");
    println!("Initial bounds: {}", zone.current_bounds());
    println!("Warning window: {} ticks", config.safe_zone.warning_ticks);
    println!();

    for event in config.safe_zone.schedule() {
        let phase = config
            .safe_zone
            .phase_at(event.start_tick)
            .map_or_else(|| "-".to_string(), |p| format!("{:?}", p));
        println!(
            "  {:<5} tick {:>4} over {:>3} ticks -> {}x{}",
            phase, event.start_tick, event.duration, event.target_width, event.target_height
        );
    }

    let forecast = zone.forecast();
    println!();
    if let Some(next) = forecast.next {
        println!("Next shrink: tick {} -> {}", next.start_tick, next.target);
    }
    match forecast.last {
        Some(last) => println!("Final bounds: {} (from tick {})", last.target, last.start_tick),
        None => println!("No shrink scheduled"),
    }

    Ok(())
}

fn run_benchmark(ticks: u64, agents: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== VORTEX ARENA Benchmark ===");
    println!("Ticks: {}", ticks);
    println!("Agents: {}", agents);
    println!();

    let result = benchmark(ticks, agents);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn inspect_frames(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Frame Analysis ===");
    println!("File: {:?}", path);
    println!();

    let log = FrameLog::load(&path)?;
    println!("Frames: {}", log.len());
    let (Some(first), Some(last)) = (log.frames.first(), log.frames.last()) else {
        return Ok(());
    };

    println!("Ticks: {} - {}", first.tick, last.tick);
    println!("Initial bounds: {}", first.safe_zone.current_bounds);
    println!("Final bounds: {}", last.safe_zone.current_bounds);

    let shrinking = log.frames.iter().filter(|f| f.safe_zone.shrinking).count();
    let active = log
        .frames
        .iter()
        .filter(|f| f.hazard.state() == HazardState::Active)
        .count();
    println!("Ticks shrinking: {}", shrinking);
    println!("Ticks with active hazard: {}", active);

    let anchors: Vec<_> = log
        .frames
        .windows(2)
        .filter(|w| w[0].hazard.state() == HazardState::Inactive && w[1].hazard.state() == HazardState::Warning)
        .map(|w| (w[1].tick, w[1].hazard.anchor_x, w[1].hazard.anchor_y))
        .collect();
    for (tick, x, y) in anchors {
        println!("  hazard placed at ({}, {}) by tick {}", x, y, tick);
    }

    Ok(())
}
