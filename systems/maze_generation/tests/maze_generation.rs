use std::collections::{HashSet, VecDeque};

use ant_maze_core::{GridTopology, WallDensity, WallSegment};
use ant_maze_system_maze_generation::{apply_density, MazeGenerator};

fn density(percent: u8) -> WallDensity {
    WallDensity::new(percent).expect("valid density")
}

fn reachable_cells(topology: &GridTopology) -> usize {
    let columns = topology.columns();
    let rows = topology.rows();
    let start = topology.center_cell();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    let _ = seen.insert((start.column(), start.row()));
    queue.push_back((start.column(), start.row()));

    while let Some((column, row)) = queue.pop_front() {
        let mut neighbors = Vec::new();
        if row > 0 && !topology.has_wall(WallSegment::horizontal(row, column)) {
            neighbors.push((column, row - 1));
        }
        if row + 1 < rows && !topology.has_wall(WallSegment::horizontal(row + 1, column)) {
            neighbors.push((column, row + 1));
        }
        if column > 0 && !topology.has_wall(WallSegment::vertical(row, column)) {
            neighbors.push((column - 1, row));
        }
        if column + 1 < columns && !topology.has_wall(WallSegment::vertical(row, column + 1)) {
            neighbors.push((column + 1, row));
        }
        for neighbor in neighbors {
            if seen.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    seen.len()
}

#[test]
fn full_density_maze_connects_every_cell() {
    for (columns, rows) in [(10, 10), (17, 9), (1, 12), (25, 2)] {
        let mut generator = MazeGenerator::new(0xA11C_E5ED);
        let maze = generator.generate(columns, rows).expect("valid dimensions");
        let topology = apply_density(&maze.topology, &maze.removal_queue, density(100));

        assert_eq!(topology, maze.topology, "full density must not open walls");
        assert_eq!(
            reachable_cells(&topology),
            (columns * rows) as usize,
            "{columns}x{rows} maze is not connected"
        );
        assert_eq!(
            topology.open_segments().len(),
            (columns * rows - 1) as usize,
            "{columns}x{rows} carve must open exactly one passage per spanning-tree edge"
        );
    }
}

#[test]
fn lowering_density_only_opens_more_walls() {
    let mut generator = MazeGenerator::new(42);
    let maze = generator.generate(20, 14).expect("valid dimensions");

    let mut previous: HashSet<WallSegment> = HashSet::new();
    for percent in (0..=100).rev().step_by(5) {
        let topology = apply_density(&maze.topology, &maze.removal_queue, density(percent));
        let open: HashSet<WallSegment> = topology.open_segments().into_iter().collect();
        assert!(
            previous.is_subset(&open),
            "density {percent} closed a wall opened at a higher density"
        );
        previous = open;
    }
}

#[test]
fn boundary_ring_survives_every_density() {
    let mut generator = MazeGenerator::new(7);
    let maze = generator.generate(12, 8).expect("valid dimensions");

    for percent in 0..=100 {
        let topology = apply_density(&maze.topology, &maze.removal_queue, density(percent));
        assert!(topology.boundary_intact(), "density {percent} breached the boundary");
    }
    assert!(maze
        .removal_queue
        .segments()
        .iter()
        .all(|segment| !maze.topology.is_boundary(*segment)));
}

#[test]
fn zero_density_opens_every_queued_wall() {
    let mut generator = MazeGenerator::new(99);
    let maze = generator.generate(9, 9).expect("valid dimensions");
    let topology = apply_density(&maze.topology, &maze.removal_queue, density(0));

    for segment in maze.removal_queue.segments() {
        assert!(!topology.has_wall(*segment), "{segment:?} still walled");
    }
}

#[test]
fn reapplying_same_density_is_idempotent() {
    let mut generator = MazeGenerator::new(3);
    let maze = generator.generate(15, 11).expect("valid dimensions");

    let first = apply_density(&maze.topology, &maze.removal_queue, density(37));
    let second = apply_density(&maze.topology, &maze.removal_queue, density(37));
    assert_eq!(first, second);
}

#[test]
fn fixed_seed_reproduces_wall_matrix() {
    let first = MazeGenerator::new(0x5EED)
        .generate(10, 10)
        .expect("valid dimensions");
    let second = MazeGenerator::new(0x5EED)
        .generate(10, 10)
        .expect("valid dimensions");

    assert_eq!(first, second);
    assert_eq!(
        apply_density(&first.topology, &first.removal_queue, density(100)),
        apply_density(&second.topology, &second.removal_queue, density(100)),
    );
}

#[test]
fn successive_generations_reseed_the_layout() {
    let mut generator = MazeGenerator::new(11);
    let first = generator.generate(12, 12).expect("valid dimensions");
    let second = generator.generate(12, 12).expect("valid dimensions");
    assert_ne!(first.topology, second.topology);
}

#[test]
fn zero_dimensions_are_rejected() {
    let mut generator = MazeGenerator::new(0);
    assert!(generator.generate(0, 5).is_err());
    assert!(generator.generate(5, 0).is_err());
}
