#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Ant Maze.

use std::{sync::Arc, time::Duration};

use ant_maze_core::{
    derive_stream_seed, AgentId, AgentState, Command, Event, GridTopology, SimulationError,
    StateCorruptionError, WallDensity,
};
use ant_maze_system_maze_generation::{apply_density, GeneratedMaze, MazeGenerator};
use glam::Vec2;
use tracing::info;

const MAZE_STREAM: &str = "maze";

/// Represents the authoritative Ant Maze world state.
#[derive(Debug)]
pub struct World {
    seed: u64,
    generation: u64,
    agent_count: u32,
    maze: Option<GeneratedMaze>,
    topology: Option<Arc<GridTopology>>,
    density: WallDensity,
    agents: Vec<AgentState>,
    now: Duration,
    tick_index: u64,
}

impl World {
    /// Creates an empty world that spawns `agent_count` agents on configure.
    ///
    /// Every maze the world carves derives its layout from `seed`.
    #[must_use]
    pub fn new(seed: u64, agent_count: u32) -> Self {
        Self {
            seed,
            generation: 0,
            agent_count,
            maze: None,
            topology: None,
            density: WallDensity::default(),
            agents: Vec::new(),
            now: Duration::ZERO,
            tick_index: 0,
        }
    }

    fn origin(&self) -> Vec2 {
        self.topology
            .as_ref()
            .map_or(Vec2::ZERO, |topology| topology.origin())
    }

    fn configure(
        &mut self,
        columns: u32,
        rows: u32,
        density: WallDensity,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SimulationError> {
        let seed = derive_stream_seed(self.seed, MAZE_STREAM, self.generation);
        let maze = MazeGenerator::new(seed).generate(columns, rows)?;
        self.generation = self.generation.saturating_add(1);

        let topology = apply_density(&maze.topology, &maze.removal_queue, density);
        let opened_walls = maze.removal_queue.prefix_for(density).len();
        let spawn_point = topology.cell_center(topology.center_cell());
        let origin = topology.origin();

        out_events.push(Event::MazeConfigured {
            columns,
            rows,
            removable_walls: maze.removal_queue.len(),
        });
        out_events.push(Event::WallDensityChanged {
            density,
            opened_walls,
        });

        self.agents = spawn_agents(self.agent_count, spawn_point, origin);
        out_events.push(Event::AgentsSpawned {
            count: self.agents.len(),
            spawn_point,
        });

        info!(
            columns,
            rows,
            density = density.percent(),
            agents = self.agents.len(),
            "maze configured"
        );

        self.topology = Some(Arc::new(topology));
        self.maze = Some(maze);
        self.density = density;
        Ok(())
    }

    fn verify_batch(&self, agents: &[AgentState]) -> Result<(), StateCorruptionError> {
        if agents.len() != self.agents.len() {
            return Err(StateCorruptionError::AgentCountMismatch {
                expected: self.agents.len(),
                actual: agents.len(),
            });
        }

        let mut ids: Vec<AgentId> = agents.iter().map(|agent| agent.id).collect();
        ids.sort_unstable();
        if let Some(foreign) = ids.iter().find(|id| {
            self.agents
                .binary_search_by_key(*id, |agent| agent.id)
                .is_err()
        }) {
            return Err(StateCorruptionError::UnknownAgent { agent: *foreign });
        }

        // Same length and no foreign ids, so a mismatch here is a duplicate.
        for (current, id) in self.agents.iter().zip(&ids) {
            if current.id != *id {
                return Err(StateCorruptionError::UnknownAgent { agent: current.id });
            }
        }
        Ok(())
    }

    fn commit(
        &mut self,
        mut agents: Vec<AgentState>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), StateCorruptionError> {
        self.verify_batch(&agents)?;
        agents.sort_by_key(|agent| agent.id);

        for (current, next) in self.agents.iter().zip(&agents) {
            if current.mode != next.mode {
                out_events.push(Event::AgentModeChanged {
                    agent: next.id,
                    from: current.mode,
                    to: next.mode,
                });
            }
        }

        self.agents = agents;
        out_events.push(Event::AgentsCommitted {
            tick: self.tick_index,
        });
        Ok(())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// A rejected command leaves the world exactly as it was.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), SimulationError> {
    match command {
        Command::ConfigureMaze {
            columns,
            rows,
            density,
        } => world.configure(columns, rows, density, out_events),
        Command::SetWallDensity { density } => {
            let maze = world.maze.as_ref().ok_or(SimulationError::NotConfigured)?;
            let topology = apply_density(&maze.topology, &maze.removal_queue, density);
            let opened_walls = maze.removal_queue.prefix_for(density).len();
            world.topology = Some(Arc::new(topology));
            world.density = density;
            out_events.push(Event::WallDensityChanged {
                density,
                opened_walls,
            });
            Ok(())
        }
        Command::Tick { dt } => {
            if world.topology.is_none() {
                return Err(SimulationError::NotConfigured);
            }
            world.tick_index = world.tick_index.saturating_add(1);
            world.now = world.now.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt, now: world.now });
            Ok(())
        }
        Command::CommitAgents { agents } => world
            .commit(agents, out_events)
            .map_err(SimulationError::from),
    }
}

fn spawn_agents(count: u32, spawn_point: Vec2, origin: Vec2) -> Vec<AgentState> {
    (0..count)
        .map(|index| {
            let heading = index as f32 * 360.0 / count as f32;
            AgentState::spawn(AgentId::new(index), spawn_point, origin, heading)
        })
        .collect()
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{sync::Arc, time::Duration};

    use ant_maze_core::{
        AgentSnapshot, AgentState, AgentView, GridTopology, StateCorruptionError, WallDensity,
    };

    use super::World;

    /// Topology currently in effect, if a maze has been configured.
    #[must_use]
    pub fn topology(world: &World) -> Option<Arc<GridTopology>> {
        world.topology.clone()
    }

    /// Captures a read-only view of every agent before the next tick.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_states(world.agents.clone(), world.origin())
    }

    /// Published projection of every agent.
    #[must_use]
    pub fn snapshots(world: &World) -> Vec<AgentSnapshot> {
        let origin = world.origin();
        world
            .agents
            .iter()
            .map(|agent| agent.snapshot(origin))
            .collect()
    }

    /// Density applied to the current topology.
    #[must_use]
    pub fn density(world: &World) -> WallDensity {
        world.density
    }

    /// Simulated time elapsed across every tick.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.now
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Checks that `agents` would be accepted as a commit, without applying it.
    pub fn check_batch(world: &World, agents: &[AgentState]) -> Result<(), StateCorruptionError> {
        world.verify_batch(agents)
    }
}
