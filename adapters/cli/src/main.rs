#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Ant Maze simulation headlessly.

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use ant_maze_core::{AgentMode, AgentSnapshot};
use ant_maze_system_tick_driver::{Simulation, SimulationConfig, TickDriver};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ant-maze",
    version,
    about = "Run the ant maze simulation without a renderer"
)]
struct Cli {
    /// TOML file with simulation settings; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maze width in cells.
    #[arg(long)]
    columns: Option<u32>,
    /// Maze height in cells.
    #[arg(long)]
    rows: Option<u32>,
    /// Percentage of optional interior walls to keep (0-100).
    #[arg(long)]
    density: Option<u8>,
    /// Base seed for maze carving and agent movement.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of ants spawned at the maze centre.
    #[arg(long)]
    agents: Option<u32>,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Fixed tick period in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Pace ticks at the configured period on a driver thread.
    #[arg(long)]
    realtime: bool,
}

/// Entry point for the Ant Maze command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let file = cli.config.as_deref().map(load_config).transpose()?;
    let config = resolve_config(&cli, file.unwrap_or_default());
    info!(
        seed = config.seed,
        columns = config.columns,
        rows = config.rows,
        density = config.density,
        agents = config.agent_count,
        "starting simulation"
    );

    let simulation = if cli.realtime {
        run_realtime(&config, cli.ticks)?
    } else {
        run_stepped(&config, cli.ticks)?
    };

    print_report(&simulation);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

fn resolve_config(cli: &Cli, file: SimulationConfig) -> SimulationConfig {
    SimulationConfig {
        seed: cli.seed.unwrap_or(file.seed),
        columns: cli.columns.unwrap_or(file.columns),
        rows: cli.rows.unwrap_or(file.rows),
        density: cli.density.unwrap_or(file.density),
        agent_count: cli.agents.unwrap_or(file.agent_count),
        tick_period_ms: cli.tick_ms.unwrap_or(file.tick_period_ms),
        movement: file.movement,
    }
}

fn run_stepped(config: &SimulationConfig, ticks: u64) -> Result<Simulation> {
    let mut simulation = Simulation::new(config);
    simulation
        .configure(config.columns, config.rows, config.density)
        .context("failed to configure maze")?;

    let started = Instant::now();
    for _ in 0..ticks {
        let _ = simulation
            .tick()
            .with_context(|| format!("tick {} failed", simulation.tick_index() + 1))?;
    }
    info!(
        ticks,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "stepped simulation finished"
    );
    Ok(simulation)
}

fn run_realtime(config: &SimulationConfig, ticks: u64) -> Result<Simulation> {
    let mut simulation = Simulation::new(config);
    simulation
        .configure(config.columns, config.rows, config.density)
        .context("failed to configure maze")?;

    let driver = TickDriver::spawn(simulation, config.tick_period())
        .context("failed to start tick driver")?;

    let poll = config.tick_period().max(Duration::from_millis(1));
    while driver.latest_tick() < ticks && !driver.is_finished() {
        thread::sleep(poll);
    }

    driver.shutdown().context("tick driver stopped with an error")
}

fn print_report(simulation: &Simulation) {
    let agents = simulation.snapshot();
    println!(
        "tick {} ({:.1}s simulated), {} agents",
        simulation.tick_index(),
        simulation.elapsed().as_secs_f32(),
        agents.len()
    );
    for mode in [
        AgentMode::Roaming,
        AgentMode::Wedged,
        AgentMode::Phasing,
        AgentMode::Stuck,
    ] {
        println!("  {mode:?}: {}", count_mode(&agents, mode));
    }
    for agent in &agents {
        println!(
            "  ant {:>3} at ({:>7.1}, {:>7.1}) heading {:>5.1} {:?}",
            agent.id.get(),
            agent.position.x,
            agent.position.y,
            agent.heading,
            agent.mode
        );
    }
}

fn count_mode(agents: &[AgentSnapshot], mode: AgentMode) -> usize {
    agents.iter().filter(|agent| agent.mode == mode).count()
}
