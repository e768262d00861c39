//! Wall grid describing the maze topology.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{CellCoord, CELL_SIZE};

/// Axis along which a wall segment runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WallOrientation {
    /// Segment separating a cell from the cell above it.
    Horizontal,
    /// Segment separating a cell from the cell to its left.
    Vertical,
}

/// Single wall segment addressed by its position in the wall matrices.
///
/// Horizontal segments live at `row` in `0..=rows` and `column` in
/// `0..columns`; segment `(row, column)` is the top edge of cell
/// `(column, row)`. Vertical segments live at `row` in `0..rows` and `column`
/// in `0..=columns`; segment `(row, column)` is the left edge of cell
/// `(column, row)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WallSegment {
    orientation: WallOrientation,
    row: u32,
    column: u32,
}

impl WallSegment {
    /// Creates a horizontal segment at the provided matrix position.
    #[must_use]
    pub const fn horizontal(row: u32, column: u32) -> Self {
        Self {
            orientation: WallOrientation::Horizontal,
            row,
            column,
        }
    }

    /// Creates a vertical segment at the provided matrix position.
    #[must_use]
    pub const fn vertical(row: u32, column: u32) -> Self {
        Self {
            orientation: WallOrientation::Vertical,
            row,
            column,
        }
    }

    /// Axis of the segment.
    #[must_use]
    pub const fn orientation(&self) -> WallOrientation {
        self.orientation
    }

    /// Row index inside the segment's wall matrix.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Column index inside the segment's wall matrix.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

/// Immutable wall layout of a rectangular maze.
///
/// Both matrices are stored row-major. The outermost ring of each matrix is
/// always walled; [`GridTopology::clear`] refuses to open boundary segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridTopology {
    columns: u32,
    rows: u32,
    horizontal: Vec<bool>,
    vertical: Vec<bool>,
}

impl GridTopology {
    /// Creates a fully walled grid with the provided dimensions.
    #[must_use]
    pub fn fully_walled(columns: u32, rows: u32) -> Self {
        let horizontal_len = to_usize(rows.saturating_add(1)) * to_usize(columns);
        let vertical_len = to_usize(rows) * to_usize(columns.saturating_add(1));
        Self {
            columns,
            rows,
            horizontal: vec![true; horizontal_len],
            vertical: vec![true; vertical_len],
        }
    }

    /// Number of cell columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of cell rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the horizontal segment at `(row, column)` is walled.
    ///
    /// Lookups outside the matrix report no wall.
    #[must_use]
    pub fn horizontal_wall(&self, row: i64, column: i64) -> bool {
        self.horizontal_index(row, column)
            .and_then(|index| self.horizontal.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether the vertical segment at `(row, column)` is walled.
    ///
    /// Lookups outside the matrix report no wall.
    #[must_use]
    pub fn vertical_wall(&self, row: i64, column: i64) -> bool {
        self.vertical_index(row, column)
            .and_then(|index| self.vertical.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether the provided segment is walled.
    #[must_use]
    pub fn has_wall(&self, segment: WallSegment) -> bool {
        let row = i64::from(segment.row());
        let column = i64::from(segment.column());
        match segment.orientation() {
            WallOrientation::Horizontal => self.horizontal_wall(row, column),
            WallOrientation::Vertical => self.vertical_wall(row, column),
        }
    }

    /// Reports whether the segment belongs to the impermeable outer ring.
    #[must_use]
    pub const fn is_boundary(&self, segment: WallSegment) -> bool {
        match segment.orientation() {
            WallOrientation::Horizontal => segment.row() == 0 || segment.row() == self.rows,
            WallOrientation::Vertical => segment.column() == 0 || segment.column() == self.columns,
        }
    }

    /// Opens the provided interior segment.
    ///
    /// Returns `false` without modifying the grid when the segment lies on
    /// the boundary ring or outside the matrices.
    pub fn clear(&mut self, segment: WallSegment) -> bool {
        if self.is_boundary(segment) {
            return false;
        }
        let row = i64::from(segment.row());
        let column = i64::from(segment.column());
        let slot = match segment.orientation() {
            WallOrientation::Horizontal => self
                .horizontal_index(row, column)
                .and_then(|index| self.horizontal.get_mut(index)),
            WallOrientation::Vertical => self
                .vertical_index(row, column)
                .and_then(|index| self.vertical.get_mut(index)),
        };
        match slot {
            Some(slot) => {
                *slot = false;
                true
            }
            None => false,
        }
    }

    /// Enumerates every open segment of the grid in matrix order.
    #[must_use]
    pub fn open_segments(&self) -> Vec<WallSegment> {
        let mut open = Vec::new();
        for row in 0..=self.rows {
            for column in 0..self.columns {
                let segment = WallSegment::horizontal(row, column);
                if !self.has_wall(segment) {
                    open.push(segment);
                }
            }
        }
        for row in 0..self.rows {
            for column in 0..=self.columns {
                let segment = WallSegment::vertical(row, column);
                if !self.has_wall(segment) {
                    open.push(segment);
                }
            }
        }
        open
    }

    /// Reports whether every boundary segment is walled.
    #[must_use]
    pub fn boundary_intact(&self) -> bool {
        let rows = i64::from(self.rows);
        let columns = i64::from(self.columns);
        let horizontal = (0..columns)
            .all(|column| self.horizontal_wall(0, column) && self.horizontal_wall(rows, column));
        let vertical =
            (0..rows).all(|row| self.vertical_wall(row, 0) && self.vertical_wall(row, columns));
        horizontal && vertical
    }

    /// Cell at which maze carving starts and agents spawn.
    #[must_use]
    pub const fn center_cell(&self) -> CellCoord {
        CellCoord::new(self.columns / 2, self.rows / 2)
    }

    /// Total size of the grid in world units.
    #[must_use]
    pub fn extent(&self) -> Vec2 {
        Vec2::new(
            self.columns as f32 * CELL_SIZE,
            self.rows as f32 * CELL_SIZE,
        )
    }

    /// Centre of the map, used as the polar origin for agent positions.
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        self.extent() * 0.5
    }

    /// World-space centre of the provided cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            (cell.column() as f32 + 0.5) * CELL_SIZE,
            (cell.row() as f32 + 0.5) * CELL_SIZE,
        )
    }

    fn horizontal_index(&self, row: i64, column: i64) -> Option<usize> {
        if row < 0 || column < 0 || row > i64::from(self.rows) || column >= i64::from(self.columns)
        {
            return None;
        }
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        Some(row * to_usize(self.columns) + column)
    }

    fn vertical_index(&self, row: i64, column: i64) -> Option<usize> {
        if row < 0 || column < 0 || row >= i64::from(self.rows) || column > i64::from(self.columns)
        {
            return None;
        }
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        Some(row * to_usize(self.columns.saturating_add(1)) + column)
    }
}

/// Interior segments that may be opened to thin out the maze.
///
/// The order is fixed when the maze is generated; density changes only ever
/// open a prefix of it, so raising and lowering density is monotonic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallRemovalQueue {
    segments: Vec<WallSegment>,
}

impl WallRemovalQueue {
    /// Wraps an already shuffled segment order.
    #[must_use]
    pub fn new(segments: Vec<WallSegment>) -> Self {
        Self { segments }
    }

    /// Number of queued segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Reports whether the queue holds no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Queued segments in removal order.
    #[must_use]
    pub fn segments(&self) -> &[WallSegment] {
        &self.segments
    }

    /// Leading segments that must be opened for the provided density.
    #[must_use]
    pub fn prefix_for(&self, density: crate::WallDensity) -> &[WallSegment] {
        let retained = f64::from(density.percent()) / 100.0;
        let count = (self.segments.len() as f64 * (1.0 - retained)).floor() as usize;
        &self.segments[..count.min(self.segments.len())]
    }
}

fn to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(0)
}
