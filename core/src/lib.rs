#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Ant Maze engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views such as [`AgentView`] and [`GridTopology`], and respond exclusively
//! with new command batches.

mod polar;
mod topology;

use std::{collections::VecDeque, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use polar::{heading_vector, normalize_degrees, to_cartesian, to_polar, PolarPosition};
pub use topology::{GridTopology, WallOrientation, WallRemovalQueue, WallSegment};

/// Side length of a single maze cell in world units.
pub const CELL_SIZE: f32 = 40.0;

/// Thickness of a wall segment in world units, centred on the cell boundary.
pub const WALL_THICKNESS: f32 = 8.0;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Generates a fresh maze with the provided dimensions and respawns agents.
    ConfigureMaze {
        /// Number of cell columns in the maze.
        columns: u32,
        /// Number of cell rows in the maze.
        rows: u32,
        /// Share of optional interior walls to retain.
        density: WallDensity,
    },
    /// Reapplies the wall density to the current maze without re-carving it.
    SetWallDensity {
        /// Share of optional interior walls to retain.
        density: WallDensity,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Replaces every agent with the provided post-tick states in one batch.
    CommitAgents {
        /// Complete set of agent states computed against the pre-tick view.
        agents: Vec<AgentState>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a new maze was carved.
    MazeConfigured {
        /// Number of cell columns in the maze.
        columns: u32,
        /// Number of cell rows in the maze.
        rows: u32,
        /// Number of interior segments eligible for density removal.
        removable_walls: usize,
    },
    /// Confirms that the density overlay was reapplied.
    WallDensityChanged {
        /// Density now in effect.
        density: WallDensity,
        /// Number of queued segments opened by the overlay.
        opened_walls: usize,
    },
    /// Announces that agents were placed at the spawn point.
    AgentsSpawned {
        /// Number of agents created.
        count: usize,
        /// World-space spawn location shared by every agent.
        spawn_point: Vec2,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Simulated time after the tick.
        now: Duration,
    },
    /// Reports that an agent switched modes during a commit.
    AgentModeChanged {
        /// Agent whose mode changed.
        agent: AgentId,
        /// Mode held before the commit.
        from: AgentMode,
        /// Mode held after the commit.
        to: AgentMode,
    },
    /// Confirms that a tick's agent batch was published.
    AgentsCommitted {
        /// Index of the tick that produced the batch.
        tick: u64,
    },
}

/// Unique identifier assigned to an agent.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Percentage of optional interior walls retained by the density overlay.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WallDensity(u8);

impl WallDensity {
    /// Keeps every wall of the perfect maze.
    pub const FULL: Self = Self(100);

    /// Validates and wraps a percentage in `0..=100`.
    pub fn new(percent: u8) -> Result<Self, ConfigurationError> {
        if percent > 100 {
            return Err(ConfigurationError::DensityOutOfRange(percent));
        }
        Ok(Self(percent))
    }

    /// Retained percentage.
    #[must_use]
    pub const fn percent(&self) -> u8 {
        self.0
    }
}

impl Default for WallDensity {
    fn default() -> Self {
        Self(70)
    }
}

/// Tagged simulation and presentation state of an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentMode {
    /// Moving normally with a clear footprint.
    #[default]
    Roaming,
    /// Moving normally while the footprint straddles a wall segment.
    Wedged,
    /// Passing through walls and other agents.
    Phasing,
    /// Phasing while the centre overlaps a wall.
    Stuck,
}

impl AgentMode {
    /// Reports whether the mode ignores walls and agent collisions.
    #[must_use]
    pub const fn is_phasing(self) -> bool {
        matches!(self, Self::Phasing | Self::Stuck)
    }

    /// Derives the mode from the simulation flags computed for a position.
    #[must_use]
    pub const fn classify(phasing: bool, overlapping_wall: bool, wall_between_points: bool) -> Self {
        match (phasing, overlapping_wall, wall_between_points) {
            (true, true, _) => Self::Stuck,
            (true, false, _) => Self::Phasing,
            (false, _, true) => Self::Wedged,
            (false, _, false) => Self::Roaming,
        }
    }
}

/// Single observation of the wall-between-points signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinkSample {
    /// Simulated time of the observation.
    pub at: Duration,
    /// Whether the footprint straddled a wall at that time.
    pub pink: bool,
}

/// Trailing history of the wall-between-points signal for one agent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PinkMonitor {
    since: Option<Duration>,
    samples: VecDeque<PinkSample>,
}

impl PinkMonitor {
    /// Records an observation and discards samples older than `window`.
    pub fn record(&mut self, now: Duration, pink: bool, window: Duration) {
        let was_pink = self.samples.back().map_or(false, |sample| sample.pink);
        match (was_pink, pink) {
            (false, true) => self.since = Some(now),
            (true, false) => self.since = None,
            _ => {}
        }
        self.samples.push_back(PinkSample { at: now, pink });
        while let Some(front) = self.samples.front() {
            if now.saturating_sub(front.at) > window {
                let _ = self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Start of the current uninterrupted pink streak.
    #[must_use]
    pub const fn since(&self) -> Option<Duration> {
        self.since
    }

    /// Number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Reports whether no samples are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fraction of retained samples that were pink.
    #[must_use]
    pub fn pink_ratio(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let pink = self.samples.iter().filter(|sample| sample.pink).count();
        pink as f32 / self.samples.len() as f32
    }

    /// Retained samples in chronological order.
    pub fn samples(&self) -> impl Iterator<Item = &PinkSample> {
        self.samples.iter()
    }
}

/// Complete state of a single agent.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentState {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Canonical position around the map origin.
    pub position: PolarPosition,
    /// Heading in degrees within `[0, 360)`.
    pub heading: f32,
    /// Current simulation mode.
    pub mode: AgentMode,
    /// Whether the footprint straddled a wall after the last update.
    pub wall_between_points: bool,
    /// Hysteresis tracker for the wall-between-points signal.
    pub monitor: PinkMonitor,
}

impl AgentState {
    /// Creates a roaming agent at the provided world-space point.
    #[must_use]
    pub fn spawn(id: AgentId, point: Vec2, origin: Vec2, heading: f32) -> Self {
        Self {
            id,
            position: to_polar(point, origin),
            heading: normalize_degrees(heading),
            mode: AgentMode::Roaming,
            wall_between_points: false,
            monitor: PinkMonitor::default(),
        }
    }

    /// Reports whether the agent currently ignores collisions.
    #[must_use]
    pub const fn is_phasing(&self) -> bool {
        self.mode.is_phasing()
    }

    /// World-space position of the agent.
    #[must_use]
    pub fn cartesian(&self, origin: Vec2) -> Vec2 {
        to_cartesian(self.position, origin)
    }

    /// Projects the state into the read-only form published to consumers.
    #[must_use]
    pub fn snapshot(&self, origin: Vec2) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.cartesian(origin),
            heading: self.heading,
            phasing: self.is_phasing(),
            wall_between_points: self.wall_between_points,
            mode: self.mode,
        }
    }
}

/// Read-only projection of an agent published after each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// World-space position.
    pub position: Vec2,
    /// Heading in degrees.
    pub heading: f32,
    /// Whether the agent is phasing.
    pub phasing: bool,
    /// Whether the footprint straddles a wall.
    pub wall_between_points: bool,
    /// Tagged mode for presentation.
    pub mode: AgentMode,
}

/// Immutable view of every agent captured before a tick.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    agents: Vec<AgentState>,
    origin: Vec2,
}

impl AgentView {
    /// Creates a view from the provided states, sorted by identifier.
    #[must_use]
    pub fn from_states(mut agents: Vec<AgentState>, origin: Vec2) -> Self {
        agents.sort_by_key(|agent| agent.id);
        Self { agents, origin }
    }

    /// Iterator over the captured states in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.iter()
    }

    /// Looks up a captured agent by identifier.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&AgentState> {
        self.agents
            .binary_search_by_key(&id, |agent| agent.id)
            .ok()
            .and_then(|index| self.agents.get(index))
    }

    /// Polar origin the positions are expressed against.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Number of captured agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Reports whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Projects every captured agent into its published form.
    #[must_use]
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents
            .iter()
            .map(|agent| agent.snapshot(self.origin))
            .collect()
    }
}

/// Rejected maze or density configuration.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The maze must have at least one column.
    #[error("maze width must be positive")]
    ZeroColumns,
    /// The maze must have at least one row.
    #[error("maze height must be positive")]
    ZeroRows,
    /// Densities are percentages.
    #[error("wall density {0} is outside 0..=100")]
    DensityOutOfRange(u8),
}

/// Invariant violation in agent bookkeeping; never recovered from.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StateCorruptionError {
    /// An agent id was referenced that the snapshot does not contain.
    #[error("agent {} is not part of the snapshot", .agent.get())]
    UnknownAgent {
        /// Identifier that failed to resolve.
        agent: AgentId,
    },
    /// A committed batch did not cover every live agent.
    #[error("commit carried {actual} agents but {expected} are alive")]
    AgentCountMismatch {
        /// Number of agents alive before the commit.
        expected: usize,
        /// Number of agents in the committed batch.
        actual: usize,
    },
}

/// Failure surfaced by the simulation entry points.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    /// Rejected configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Fatal agent bookkeeping violation.
    #[error(transparent)]
    StateCorruption(#[from] StateCorruptionError),
    /// A tick or density change was requested before any maze existed.
    #[error("no maze has been configured")]
    NotConfigured,
}

/// Derives an independent RNG seed for a labelled stream.
///
/// The same `(base, label, index)` triple always yields the same seed.
#[must_use]
pub fn derive_stream_seed(base: u64, label: &str, index: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}
