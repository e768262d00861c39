#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Simulation facade and the fixed-period driver that ticks it.
//!
//! [`Simulation`] owns the authoritative world and the movement system and
//! runs each tick strictly in sequence: movement reads the pre-tick
//! [`AgentView`](ant_maze_core::AgentView) at the next clock reading, the
//! resulting batch is checked, and only then do the clock and agents advance. [`TickDriver`] moves a simulation onto its own thread
//! and publishes a [`Frame`] after every tick.

mod driver;

use std::{sync::Arc, time::Duration};

use ant_maze_core::{
    derive_stream_seed, AgentSnapshot, Command, Event, GridTopology, SimulationError,
    WallDensity,
};
use ant_maze_system_movement::{Movement, MovementTuning};
use ant_maze_world::{self as world, query, World};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use driver::{DriverCommand, DriverError, Frame, TickDriver};

const MOVEMENT_STREAM: &str = "movement";

/// Tunable parameters for a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base seed every random stream derives from.
    pub seed: u64,
    /// Maze width in cells.
    pub columns: u32,
    /// Maze height in cells.
    pub rows: u32,
    /// Percentage of optional interior walls retained.
    pub density: u8,
    /// Number of agents spawned on every configure.
    pub agent_count: u32,
    /// Fixed tick period in milliseconds.
    pub tick_period_ms: u64,
    /// Movement and phasing tuning.
    pub movement: MovementTuning,
}

impl SimulationConfig {
    /// Fixed tick period.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_A175,
            columns: 20,
            rows: 20,
            density: WallDensity::default().percent(),
            agent_count: 20,
            tick_period_ms: 16,
            movement: MovementTuning::default(),
        }
    }
}

/// Single-threaded simulation facade.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    movement: Movement,
    dt: Duration,
    published: Vec<AgentSnapshot>,
}

impl Simulation {
    /// Creates an unconfigured simulation; call [`Simulation::configure`] before ticking.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        let movement_seed = derive_stream_seed(config.seed, MOVEMENT_STREAM, 0);
        Self {
            world: World::new(config.seed, config.agent_count),
            movement: Movement::new(movement_seed, config.movement.clone()),
            dt: config.tick_period(),
            published: Vec::new(),
        }
    }

    /// Carves a new maze and respawns every agent at its centre.
    pub fn configure(&mut self, columns: u32, rows: u32, density: u8) -> Result<(), SimulationError> {
        let density = WallDensity::new(density)?;
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::ConfigureMaze {
                columns,
                rows,
                density,
            },
            &mut events,
        )?;
        self.published = query::snapshots(&self.world);
        Ok(())
    }

    /// Reapplies the wall density to the current maze without re-carving it.
    pub fn set_density(&mut self, density: u8) -> Result<(), SimulationError> {
        let density = WallDensity::new(density)?;
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::SetWallDensity { density },
            &mut events,
        )
    }

    /// Runs one fixed-step tick and returns the published agent snapshots.
    ///
    /// On failure neither the clock nor the agents move, and the previously
    /// published snapshots stay in place.
    pub fn tick(&mut self) -> Result<Vec<AgentSnapshot>, SimulationError> {
        let topology = query::topology(&self.world).ok_or(SimulationError::NotConfigured)?;
        let view = query::agent_view(&self.world);
        let pending = [Event::TimeAdvanced {
            dt: self.dt,
            now: query::now(&self.world).saturating_add(self.dt),
        }];

        let mut commands = Vec::new();
        self.movement
            .handle(&pending, &view, &topology, &mut commands)
            .map_err(|error| {
                warn!(%error, "movement rejected the agent snapshot");
                SimulationError::from(error)
            })?;

        self.commit(commands)
    }

    /// Advances the clock and applies `commands` once every batch has been accepted.
    fn commit(&mut self, commands: Vec<Command>) -> Result<Vec<AgentSnapshot>, SimulationError> {
        for command in &commands {
            if let Command::CommitAgents { agents } = command {
                query::check_batch(&self.world, agents).map_err(|error| {
                    warn!(%error, "rejected agent batch");
                    SimulationError::from(error)
                })?;
            }
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt: self.dt }, &mut events)?;
        for command in commands {
            world::apply(&mut self.world, command, &mut events)?;
        }

        self.published = query::snapshots(&self.world);
        Ok(self.published.clone())
    }

    /// Agent snapshots published by the last successful configure or tick.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AgentSnapshot> {
        self.published.clone()
    }

    /// Topology currently in effect.
    #[must_use]
    pub fn walls(&self) -> Option<Arc<GridTopology>> {
        query::topology(&self.world)
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Simulated time elapsed so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        query::now(&self.world)
    }

    /// Reports whether a maze has been configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        query::topology(&self.world).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ant_maze_core::StateCorruptionError;

    #[test]
    fn default_config_matches_documented_values() {
        let config = SimulationConfig::default();
        assert_eq!(config.columns, 20);
        assert_eq!(config.rows, 20);
        assert_eq!(config.density, 70);
        assert_eq!(config.agent_count, 20);
        assert_eq!(config.tick_period(), Duration::from_millis(16));
    }

    #[test]
    fn configure_publishes_spawned_agents() {
        let config = SimulationConfig {
            agent_count: 6,
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(&config);
        assert!(simulation.snapshot().is_empty());
        assert!(!simulation.is_configured());

        simulation.configure(8, 8, 100).expect("configure succeeds");
        assert_eq!(simulation.snapshot().len(), 6);
        assert!(simulation.is_configured());
    }

    #[test]
    fn rejected_batch_leaves_clock_and_agents_untouched() {
        let config = SimulationConfig {
            agent_count: 4,
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(&config);
        simulation.configure(8, 8, 60).expect("configure succeeds");
        for _ in 0..10 {
            let _ = simulation.tick().expect("tick succeeds");
        }
        let published = simulation.snapshot();
        let elapsed = simulation.elapsed();

        let mut short = query::agent_view(&simulation.world)
            .iter()
            .cloned()
            .collect::<Vec<_>>();
        let _ = short.pop();
        assert_eq!(
            simulation.commit(vec![Command::CommitAgents { agents: short }]),
            Err(SimulationError::StateCorruption(
                StateCorruptionError::AgentCountMismatch {
                    expected: 4,
                    actual: 3
                }
            ))
        );

        assert_eq!(simulation.tick_index(), 10);
        assert_eq!(simulation.elapsed(), elapsed);
        assert_eq!(simulation.snapshot(), published);
        assert_eq!(query::snapshots(&simulation.world), published);

        let _ = simulation.tick().expect("tick succeeds after rejection");
        assert_eq!(simulation.tick_index(), 11);
        assert_eq!(simulation.elapsed(), elapsed + Duration::from_millis(16));
    }
}
