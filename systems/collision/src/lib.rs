#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Point-sampling wall tests and agent proximity queries.
//!
//! Every query here is total: coordinates outside the grid simply see no
//! walls, and no lookup panics regardless of the input.

use ant_maze_core::{
    AgentId, AgentView, GridTopology, StateCorruptionError, CELL_SIZE, WALL_THICKNESS,
};
use glam::Vec2;

/// Fraction of the collision radius at which footprint samples are taken.
pub const SAMPLE_OFFSET_FACTOR: f32 = 0.8;

/// Multiple of the collision radius inside which two agents collide.
pub const AGENT_SEPARATION_FACTOR: f32 = 1.5;

const HALF_WALL: f32 = WALL_THICKNESS / 2.0;

/// Read-only wall queries against a single topology.
#[derive(Clone, Copy, Debug)]
pub struct Collision<'a> {
    topology: &'a GridTopology,
}

impl<'a> Collision<'a> {
    /// Wraps the topology the queries read from.
    #[must_use]
    pub const fn new(topology: &'a GridTopology) -> Self {
        Self { topology }
    }

    /// Reports whether a body of `radius` centred on `point` clears every wall.
    #[must_use]
    pub fn is_valid_position(&self, point: Vec2, radius: f32) -> bool {
        sample_points(point, radius)
            .iter()
            .all(|sample| !self.touches_wall(*sample))
    }

    /// Reports whether the centre itself overlaps a wall band.
    #[must_use]
    pub fn is_agent_stuck(&self, point: Vec2) -> bool {
        self.touches_wall(point)
    }

    /// Reports whether a wall separates the cells containing `a` and `b`.
    #[must_use]
    pub fn is_wall_between_points(&self, a: Vec2, b: Vec2) -> bool {
        let (a_column, a_row) = cell_of(a);
        let (b_column, b_row) = cell_of(b);
        if a_column == b_column && a_row == b_row {
            return false;
        }

        let rows = i64::from(self.topology.rows());
        let columns = i64::from(self.topology.columns());

        if a_row != b_row {
            let first = a_row.min(b_row).saturating_add(1).max(0);
            let last = a_row.max(b_row).min(rows);
            for row in first..=last {
                if self.topology.horizontal_wall(row, a_column)
                    || self.topology.horizontal_wall(row, b_column)
                {
                    return true;
                }
            }
        }

        if a_column != b_column {
            let first = a_column.min(b_column).saturating_add(1).max(0);
            let last = a_column.max(b_column).min(columns);
            for column in first..=last {
                if self.topology.vertical_wall(a_row, column)
                    || self.topology.vertical_wall(b_row, column)
                {
                    return true;
                }
            }
        }

        false
    }

    /// Reports whether any two footprint samples sit on opposite sides of a wall.
    #[must_use]
    pub fn has_wall_between_any_sample_pair(&self, point: Vec2, radius: f32) -> bool {
        let samples = sample_points(point, radius);
        samples.iter().enumerate().any(|(index, first)| {
            samples[index + 1..]
                .iter()
                .any(|second| self.is_wall_between_points(*first, *second))
        })
    }

    fn touches_wall(&self, point: Vec2) -> bool {
        let (column, row) = cell_of(point);
        let offset_x = point.x - column as f32 * CELL_SIZE;
        let offset_y = point.y - row as f32 * CELL_SIZE;

        let below = row.saturating_add(1);
        let right = column.saturating_add(1);

        (offset_y < HALF_WALL && self.topology.horizontal_wall(row, column))
            || (offset_y > CELL_SIZE - HALF_WALL && self.topology.horizontal_wall(below, column))
            || (offset_x < HALF_WALL && self.topology.vertical_wall(row, column))
            || (offset_x > CELL_SIZE - HALF_WALL && self.topology.vertical_wall(row, right))
    }
}

/// Centre of the footprint followed by the four axis-aligned offsets.
#[must_use]
pub fn sample_points(point: Vec2, radius: f32) -> [Vec2; 5] {
    let offset = radius * SAMPLE_OFFSET_FACTOR;
    [
        point,
        point + Vec2::new(offset, 0.0),
        point - Vec2::new(offset, 0.0),
        point + Vec2::new(0.0, offset),
        point - Vec2::new(0.0, offset),
    ]
}

/// Reports whether `candidate` crowds another non-phasing agent in `view`.
///
/// A querying agent that is phasing in the view never collides. Fails when
/// `agent` is missing from the view, which means the caller is working with
/// a snapshot that does not match the live agent set.
pub fn collides_with_other_agents(
    agent: AgentId,
    candidate: Vec2,
    view: &AgentView,
    radius: f32,
) -> Result<bool, StateCorruptionError> {
    let querying = view
        .get(agent)
        .ok_or(StateCorruptionError::UnknownAgent { agent })?;
    if querying.is_phasing() {
        return Ok(false);
    }

    let threshold = AGENT_SEPARATION_FACTOR * radius;
    let origin = view.origin();
    Ok(view.iter().any(|other| {
        other.id != agent
            && !other.is_phasing()
            && other.cartesian(origin).distance(candidate) < threshold
    }))
}

fn cell_of(point: Vec2) -> (i64, i64) {
    let column = (point.x / CELL_SIZE).floor() as i64;
    let row = (point.y / CELL_SIZE).floor() as i64;
    (column, row)
}
