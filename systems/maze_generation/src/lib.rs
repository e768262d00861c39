#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Randomised perfect-maze carving and the density overlay applied on top of it.

use ant_maze_core::{
    CellCoord, ConfigurationError, GridTopology, WallDensity, WallRemovalQueue, WallSegment,
};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Perfect maze together with the order in which optional walls are opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedMaze {
    /// Carved maze with every optional wall still present.
    pub topology: GridTopology,
    /// Shuffled interior segments consumed by [`apply_density`].
    pub removal_queue: WallRemovalQueue,
}

/// Seeded generator that carves mazes with a randomised depth-first search.
#[derive(Debug)]
pub struct MazeGenerator {
    rng: ChaCha8Rng,
}

impl MazeGenerator {
    /// Creates a generator whose output is fully determined by `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Carves a perfect maze and prepares its wall removal queue.
    pub fn generate(&mut self, columns: u32, rows: u32) -> Result<GeneratedMaze, ConfigurationError> {
        if columns == 0 {
            return Err(ConfigurationError::ZeroColumns);
        }
        if rows == 0 {
            return Err(ConfigurationError::ZeroRows);
        }

        let mut topology = GridTopology::fully_walled(columns, rows);
        self.carve(&mut topology);

        let mut segments = removable_segments(columns, rows);
        segments.shuffle(&mut self.rng);
        debug!(
            columns,
            rows,
            removable = segments.len(),
            "carved perfect maze"
        );

        Ok(GeneratedMaze {
            topology,
            removal_queue: WallRemovalQueue::new(segments),
        })
    }

    fn carve(&mut self, topology: &mut GridTopology) {
        let columns = topology.columns();
        let rows = topology.rows();
        let width = to_usize(columns);
        let mut visited = vec![false; width * to_usize(rows)];

        let start = topology.center_cell();
        visited[cell_index(start, width)] = true;
        let mut stack = vec![Frame::new(start, self.shuffled_directions())];

        while let Some(frame) = stack.last_mut() {
            let Some(direction) = frame.next_direction() else {
                let _ = stack.pop();
                continue;
            };
            let cell = frame.cell;

            let Some(next) = direction.neighbor(cell, columns, rows) else {
                continue;
            };
            let next_index = cell_index(next, width);
            if visited[next_index] {
                continue;
            }

            let _ = topology.clear(direction.wall_between(cell));
            visited[next_index] = true;
            let directions = self.shuffled_directions();
            stack.push(Frame::new(next, directions));
        }
    }

    fn shuffled_directions(&mut self) -> [CarveDirection; 4] {
        let mut directions = CarveDirection::ALL;
        directions.shuffle(&mut self.rng);
        directions
    }
}

/// Opens the leading queue entries required by `density` on a copy of `base`.
///
/// Boundary segments are never opened, whatever the queue contains.
#[must_use]
pub fn apply_density(
    base: &GridTopology,
    queue: &WallRemovalQueue,
    density: WallDensity,
) -> GridTopology {
    let mut topology = base.clone();
    for segment in queue.prefix_for(density) {
        let _ = topology.clear(*segment);
    }
    topology
}

/// Interior segments that do not touch the outer boundary ring.
fn removable_segments(columns: u32, rows: u32) -> Vec<WallSegment> {
    let mut segments = Vec::new();
    for row in 1..rows {
        for column in 1..columns.saturating_sub(1) {
            segments.push(WallSegment::horizontal(row, column));
        }
    }
    for row in 1..rows.saturating_sub(1) {
        for column in 1..columns {
            segments.push(WallSegment::vertical(row, column));
        }
    }
    segments
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CarveDirection {
    South,
    East,
    North,
    West,
}

impl CarveDirection {
    const ALL: [Self; 4] = [Self::South, Self::East, Self::North, Self::West];

    fn neighbor(self, cell: CellCoord, columns: u32, rows: u32) -> Option<CellCoord> {
        let column = cell.column();
        let row = cell.row();
        match self {
            Self::South if row + 1 < rows => Some(CellCoord::new(column, row + 1)),
            Self::East if column + 1 < columns => Some(CellCoord::new(column + 1, row)),
            Self::North if row > 0 => Some(CellCoord::new(column, row - 1)),
            Self::West if column > 0 => Some(CellCoord::new(column - 1, row)),
            _ => None,
        }
    }

    fn wall_between(self, cell: CellCoord) -> WallSegment {
        let column = cell.column();
        let row = cell.row();
        match self {
            Self::South => WallSegment::horizontal(row + 1, column),
            Self::East => WallSegment::vertical(row, column + 1),
            Self::North => WallSegment::horizontal(row, column),
            Self::West => WallSegment::vertical(row, column),
        }
    }
}

/// Pending work for one cell of the depth-first carve.
#[derive(Debug)]
struct Frame {
    cell: CellCoord,
    directions: [CarveDirection; 4],
    cursor: usize,
}

impl Frame {
    fn new(cell: CellCoord, directions: [CarveDirection; 4]) -> Self {
        Self {
            cell,
            directions,
            cursor: 0,
        }
    }

    fn next_direction(&mut self) -> Option<CarveDirection> {
        let direction = self.directions.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(direction)
    }
}

fn cell_index(cell: CellCoord, width: usize) -> usize {
    to_usize(cell.row()) * width + to_usize(cell.column())
}

fn to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removable_segments_skip_boundary_adjacent_walls() {
        let segments = removable_segments(4, 3);
        assert!(segments.contains(&WallSegment::horizontal(1, 1)));
        assert!(segments.contains(&WallSegment::vertical(1, 3)));
        assert!(!segments.contains(&WallSegment::horizontal(1, 0)));
        assert!(!segments.contains(&WallSegment::horizontal(1, 3)));
        assert!(!segments.contains(&WallSegment::vertical(0, 1)));
        assert!(!segments.contains(&WallSegment::vertical(2, 1)));
        // rows 1..3 x columns 1..3 horizontals, row 1 x columns 1..4 verticals
        assert_eq!(segments.len(), 4 + 3);
    }

    #[test]
    fn single_cell_maze_has_no_removable_walls() {
        let mut generator = MazeGenerator::new(1);
        let maze = generator.generate(1, 1).expect("valid dimensions");
        assert!(maze.removal_queue.is_empty());
        assert!(maze.topology.open_segments().is_empty());
        assert!(maze.topology.boundary_intact());
    }

    #[test]
    fn carve_direction_walls_match_neighbors() {
        let cell = CellCoord::new(2, 2);
        assert_eq!(
            CarveDirection::South.wall_between(cell),
            WallSegment::horizontal(3, 2)
        );
        assert_eq!(
            CarveDirection::West.wall_between(cell),
            WallSegment::vertical(2, 2)
        );
        assert_eq!(CarveDirection::North.neighbor(CellCoord::new(0, 0), 3, 3), None);
        assert_eq!(
            CarveDirection::East.neighbor(CellCoord::new(1, 0), 3, 3),
            Some(CellCoord::new(2, 0))
        );
    }
}
