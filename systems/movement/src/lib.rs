#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Agent state machine that wanders ants through the maze and phases them out
//! of deadlocks.

use std::time::Duration;

use ant_maze_core::{
    heading_vector, normalize_degrees, to_polar, AgentMode, AgentState, AgentView, Command, Event,
    GridTopology, StateCorruptionError,
};
use ant_maze_system_collision::{collides_with_other_agents, Collision};
use glam::Vec2;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tuning knobs for agent movement and the phasing hysteresis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    /// Distance travelled per tick while moving normally, in world units.
    pub speed: f32,
    /// Radius of an agent's body used by every collision query.
    pub collision_radius: f32,
    /// Speed multiplier applied while phasing.
    pub phasing_speed_factor: f32,
    /// Per-tick probability that a phasing agent picks a fresh heading.
    pub phasing_jitter_chance: f32,
    /// Per-tick probability that a normal agent perturbs its heading.
    pub heading_jitter_chance: f32,
    /// Largest heading perturbation in degrees, applied symmetrically.
    pub heading_jitter_degrees: f32,
    /// Trailing window of wall-between-points samples kept per agent.
    pub pink_window_ms: u64,
    /// Length of an uninterrupted pink streak that forces phasing.
    pub pink_sustain_ms: u64,
    /// Share of pink samples in the window above which phasing is forced.
    pub pink_ratio_threshold: f32,
    /// Minimum number of samples before the share rule applies.
    pub pink_min_samples: usize,
    /// Number of escape headings probed after a blocked move.
    pub probe_count: u32,
    /// Angular spacing between escape probes in degrees.
    pub probe_step_degrees: f32,
}

impl MovementTuning {
    /// Trailing window of the pink history.
    #[must_use]
    pub const fn pink_window(&self) -> Duration {
        Duration::from_millis(self.pink_window_ms)
    }

    /// Streak length after which phasing is forced.
    #[must_use]
    pub const fn pink_sustain(&self) -> Duration {
        Duration::from_millis(self.pink_sustain_ms)
    }
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            speed: 1.2,
            collision_radius: 6.0,
            phasing_speed_factor: 1.5,
            phasing_jitter_chance: 0.35,
            heading_jitter_chance: 0.01,
            heading_jitter_degrees: 20.0,
            pink_window_ms: 6_000,
            pink_sustain_ms: 5_000,
            pink_ratio_threshold: 0.9,
            pink_min_samples: 10,
            probe_count: 8,
            probe_step_degrees: 45.0,
        }
    }
}

/// Pure system that reacts to clock events and emits the next agent batch.
#[derive(Debug)]
pub struct Movement {
    rng: ChaCha8Rng,
    tuning: MovementTuning,
}

impl Movement {
    /// Creates a movement system whose random choices derive from `seed`.
    #[must_use]
    pub fn new(seed: u64, tuning: MovementTuning) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            tuning,
        }
    }

    /// Consumes world events and the pre-tick view to emit one commit batch.
    ///
    /// Every agent is advanced against the same `view`, so the outcome does
    /// not depend on the order agents are processed in.
    pub fn handle(
        &mut self,
        events: &[Event],
        view: &AgentView,
        topology: &GridTopology,
        out: &mut Vec<Command>,
    ) -> Result<(), StateCorruptionError> {
        let Some(now) = events.iter().rev().find_map(|event| match event {
            Event::TimeAdvanced { now, .. } => Some(*now),
            _ => None,
        }) else {
            return Ok(());
        };

        let context = StepContext {
            collision: Collision::new(topology),
            view,
            now,
            tuning: &self.tuning,
            extent: topology.extent(),
        };

        let mut agents = Vec::with_capacity(view.len());
        for agent in view.iter() {
            let next = advance_agent(agent, &context, &mut self.rng)?;
            if next.is_phasing() != agent.is_phasing() {
                debug!(
                    agent = agent.id.get(),
                    from = ?agent.mode,
                    to = ?next.mode,
                    "agent phasing changed"
                );
            }
            agents.push(next);
        }

        out.push(Command::CommitAgents { agents });
        Ok(())
    }
}

/// Read-only inputs shared by every agent update within a tick.
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    /// Wall queries against the topology the tick started with.
    pub collision: Collision<'a>,
    /// Agent states captured before the tick.
    pub view: &'a AgentView,
    /// Simulated time after the tick.
    pub now: Duration,
    /// Movement tuning in effect.
    pub tuning: &'a MovementTuning,
    /// Size of the map in world units.
    pub extent: Vec2,
}

/// Computes an agent's next state from the pre-tick view.
pub fn advance_agent<R: Rng + ?Sized>(
    agent: &AgentState,
    context: &StepContext<'_>,
    rng: &mut R,
) -> Result<AgentState, StateCorruptionError> {
    let tuning = context.tuning;
    let radius = tuning.collision_radius;
    let origin = context.view.origin();
    let collision = context.collision;
    let position = agent.cartesian(origin);

    let stuck = collision.is_agent_stuck(position);
    let pink = collision.has_wall_between_any_sample_pair(position, radius);

    let mut next = agent.clone();
    next.monitor.record(context.now, pink, tuning.pink_window());

    let sustained = pink
        && next.monitor.since().map_or(false, |since| {
            context.now.saturating_sub(since) > tuning.pink_sustain()
        });
    let frequent = next.monitor.pink_ratio() > tuning.pink_ratio_threshold
        && next.monitor.len() > tuning.pink_min_samples;
    let forced = sustained || frequent;

    let was_phasing = agent.is_phasing();
    let mut phasing = was_phasing || stuck || forced;
    let mut heading = agent.heading;
    if forced && !was_phasing {
        heading = random_heading(rng);
    }

    if phasing {
        if rng.gen::<f32>() < tuning.phasing_jitter_chance {
            heading = random_heading(rng);
        }
    } else if rng.gen::<f32>() < tuning.heading_jitter_chance {
        let spread = tuning.heading_jitter_degrees;
        let offset = if spread > 0.0 {
            rng.gen_range(-spread..spread)
        } else {
            0.0
        };
        heading = normalize_degrees(heading + offset);
    }

    let speed = if phasing {
        tuning.speed * tuning.phasing_speed_factor
    } else {
        tuning.speed
    };
    let candidate = position + heading_vector(heading) * speed;
    let is_clear = |point: Vec2| -> Result<bool, StateCorruptionError> {
        Ok(collision.is_valid_position(point, radius)
            && !collides_with_other_agents(agent.id, point, context.view, radius)?)
    };

    let mut destination = position;
    if phasing {
        let candidate = clamp_to_map(candidate, context.extent, radius);
        if is_clear(candidate)? {
            phasing = false;
        }
        destination = candidate;
    } else if is_clear(candidate)? {
        destination = candidate;
    } else {
        let mut escapes = Vec::new();
        for probe in probe_headings(heading, tuning) {
            let probe_point = position + heading_vector(probe) * tuning.speed;
            if is_clear(probe_point)? {
                escapes.push(probe);
            }
        }
        match escapes.choose(rng) {
            Some(escape) => heading = *escape,
            None => {
                phasing = true;
                heading = random_heading(rng);
            }
        }
    }

    next.heading = heading;
    next.position = to_polar(destination, origin);
    next.wall_between_points = collision.has_wall_between_any_sample_pair(destination, radius);
    next.mode = AgentMode::classify(
        phasing,
        collision.is_agent_stuck(destination),
        next.wall_between_points,
    );
    Ok(next)
}

/// Escape headings probed after a blocked move, starting opposite `heading`.
#[must_use]
pub fn probe_headings(heading: f32, tuning: &MovementTuning) -> Vec<f32> {
    (0..tuning.probe_count)
        .map(|index| normalize_degrees(heading + 180.0 + index as f32 * tuning.probe_step_degrees))
        .collect()
}

fn random_heading<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    normalize_degrees(rng.gen_range(0.0..360.0))
}

fn clamp_to_map(point: Vec2, extent: Vec2, margin: f32) -> Vec2 {
    let low = Vec2::splat(margin);
    let high = (extent - Vec2::splat(margin)).max(low);
    point.clamp(low, high)
}
