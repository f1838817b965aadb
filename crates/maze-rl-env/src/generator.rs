//! Procedural maze generation and element placement
//!
//! Mazes are carved on the odd-coordinate lattice of a wall-filled grid, so
//! every generated maze is a perfect maze: all floor cells are connected and
//! there are no cycles. Placement then drops the start and exit markers,
//! keys and collectibles onto the carved floor.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cell::{Cell, CollectibleKind, KeyKind};
use crate::error::{MazeError, Result};
use crate::grid::{Direction, Grid, Position};

/// Collectibles placed at most when the count is derived from free space
const MAX_DERIVED_COLLECTIBLES: usize = 25;

/// Share of the remaining floor cells used for derived collectible counts
const COLLECTIBLE_DENSITY: f64 = 0.15;

/// Spanning-tree algorithm used to carve passages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    /// Randomized depth-first search (recursive backtracker)
    #[default]
    DepthFirst,
    /// Randomized Prim's algorithm
    Prim,
}

/// Maze generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Columns, normalized to an odd number of at least 3
    pub width: usize,
    /// Rows, normalized to an odd number of at least 3
    pub height: usize,
    /// Carving algorithm
    pub strategy: GenerationStrategy,
    /// Keys to place; kinds cycle through the shuffled key catalog
    pub num_keys: usize,
    /// Collectibles to place; derived from the free space when `None`
    pub num_collectibles: Option<usize>,
    /// Seed for reproducible mazes
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: 21,
            height: 21,
            strategy: GenerationStrategy::default(),
            num_keys: KeyKind::ALL.len(),
            num_collectibles: None,
            seed: None,
        }
    }
}

/// What element placement actually put on the grid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementReport {
    /// Start marker, if placed
    pub start: Option<Position>,
    /// Exit marker, if placed
    pub exit: Option<Position>,
    /// Keys asked for
    pub keys_requested: usize,
    /// Keys that fit
    pub keys_placed: usize,
    /// Collectibles asked for or derived
    pub collectibles_requested: usize,
    /// Collectibles that fit
    pub collectibles_placed: usize,
}

impl PlacementReport {
    /// Items that were requested but did not fit
    #[must_use]
    pub fn shortfall(&self) -> usize {
        (self.keys_requested - self.keys_placed) + (self.collectibles_requested - self.collectibles_placed)
    }

    /// Everything requested was placed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

/// A generated grid together with its placement report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMaze {
    /// Carved and populated grid
    pub grid: Grid,
    /// What placement managed to put down
    pub report: PlacementReport,
}

impl GeneratedMaze {
    /// Write the grid in the maze text format
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.grid.save(path).await
    }
}

/// Seedable maze generator
pub struct MazeGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl MazeGenerator {
    /// Create a generator; unseeded configs draw from system entropy
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self { config, rng }
    }

    /// Generator settings
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Carve a perfect maze and place all markers and items
    pub fn generate(&mut self) -> Result<GeneratedMaze> {
        let mut grid = self.carve();
        let (start, exit) = place_markers(&mut grid, &mut self.rng)?;
        let mut report = place_items(
            &mut grid,
            self.config.num_keys,
            self.config.num_collectibles,
            &mut self.rng,
        );
        report.start = Some(start);
        report.exit = Some(exit);

        tracing::debug!(
            rows = grid.rows(),
            cols = grid.cols(),
            strategy = ?self.config.strategy,
            keys = report.keys_placed,
            collectibles = report.collectibles_placed,
            "generated maze"
        );
        Ok(GeneratedMaze { grid, report })
    }

    /// Carve passages only; the result contains walls and floor
    pub fn carve(&mut self) -> Grid {
        let rows = normalize_dimension(self.config.height);
        let cols = normalize_dimension(self.config.width);
        let mut grid = Grid::filled(rows, cols, Cell::Wall);

        match self.config.strategy {
            GenerationStrategy::DepthFirst => carve_depth_first(&mut grid, &mut self.rng),
            GenerationStrategy::Prim => carve_prim(&mut grid, &mut self.rng),
        }
        grid
    }
}

/// Odd size of at least 3
fn normalize_dimension(size: usize) -> usize {
    let size = size.max(3);
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

/// (wall between, lattice cell beyond) pairs of a lattice cell, interior only
fn lattice_neighbors(grid: &Grid, pos: Position) -> Vec<(Position, Position)> {
    Direction::ALL
        .into_iter()
        .filter_map(|direction| {
            let wall = pos.offset(direction)?;
            let beyond = wall.offset(direction)?;
            let interior = beyond.row >= 1
                && beyond.col >= 1
                && beyond.row + 1 < grid.rows()
                && beyond.col + 1 < grid.cols();
            interior.then_some((wall, beyond))
        })
        .collect()
}

fn is_uncarved(grid: &Grid, pos: Position) -> bool {
    grid.get(pos) == Some(Cell::Wall)
}

fn carve_depth_first<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R) {
    let origin = Position::new(1, 1);
    grid.set(origin, Cell::Floor);
    let mut stack = vec![origin];

    while let Some(&current) = stack.last() {
        let candidates: Vec<_> = lattice_neighbors(grid, current)
            .into_iter()
            .filter(|&(_, beyond)| is_uncarved(grid, beyond))
            .collect();

        if let Some(&(wall, next)) = candidates.choose(rng) {
            grid.set(wall, Cell::Floor);
            grid.set(next, Cell::Floor);
            stack.push(next);
        } else {
            stack.pop();
        }
    }
}

fn carve_prim<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R) {
    let lattice_rows = grid.rows() / 2;
    let lattice_cols = grid.cols() / 2;
    let origin = Position::new(
        2 * rng.gen_range(0..lattice_rows) + 1,
        2 * rng.gen_range(0..lattice_cols) + 1,
    );
    grid.set(origin, Cell::Floor);
    let mut frontier = lattice_neighbors(grid, origin);

    while !frontier.is_empty() {
        let (wall, beyond) = frontier.swap_remove(rng.gen_range(0..frontier.len()));
        if !is_uncarved(grid, beyond) {
            continue;
        }
        grid.set(wall, Cell::Floor);
        grid.set(beyond, Cell::Floor);
        frontier.extend(
            lattice_neighbors(grid, beyond)
                .into_iter()
                .filter(|&(_, cell)| is_uncarved(grid, cell)),
        );
    }
}

/// Put the start and exit markers on two distinct floor cells.
///
/// Opposite interior corners are preferred; otherwise two random floor cells
/// are used.
pub fn place_markers<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R) -> Result<(Position, Position)> {
    let floors = grid.positions(|c| c == Cell::Floor);
    if floors.len() < 2 {
        return Err(MazeError::InsufficientSpace { available: floors.len() });
    }

    let (bottom, right) = (grid.rows().saturating_sub(2), grid.cols().saturating_sub(2));
    let corners = [
        (Position::new(1, 1), Position::new(bottom, right)),
        (Position::new(1, right), Position::new(bottom, 1)),
    ];
    let corner_pairs: Vec<_> = corners
        .into_iter()
        .flat_map(|(a, b)| [(a, b), (b, a)])
        .filter(|&(a, b)| a != b && grid.get(a) == Some(Cell::Floor) && grid.get(b) == Some(Cell::Floor))
        .collect();

    let (start, exit) = if let Some(&pair) = corner_pairs.choose(rng) {
        pair
    } else {
        let mut picked = floors.choose_multiple(rng, 2).copied();
        match (picked.next(), picked.next()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(MazeError::InsufficientSpace { available: floors.len() }),
        }
    };

    grid.set(start, Cell::Start);
    grid.set(exit, Cell::Exit);
    Ok((start, exit))
}

/// Collectible count used when none is requested explicitly
#[must_use]
pub fn derived_collectible_count(remaining: usize) -> usize {
    if remaining == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let derived = (COLLECTIBLE_DENSITY * remaining as f64).round() as usize;
    derived.clamp(1, MAX_DERIVED_COLLECTIBLES).min(remaining)
}

/// Scatter keys and collectibles over the free floor cells.
///
/// Cells are drawn without replacement; anything that does not fit is
/// reported, never an error.
pub fn place_items<R: Rng + ?Sized>(
    grid: &mut Grid,
    num_keys: usize,
    num_collectibles: Option<usize>,
    rng: &mut R,
) -> PlacementReport {
    let mut pool = grid.positions(|c| c == Cell::Floor);
    pool.shuffle(rng);
    let mut free = pool.into_iter();

    let mut key_kinds = KeyKind::ALL;
    key_kinds.shuffle(rng);

    let mut report = PlacementReport {
        keys_requested: num_keys,
        ..PlacementReport::default()
    };

    for &kind in key_kinds.iter().cycle().take(num_keys) {
        let Some(pos) = free.next() else { break };
        grid.set(pos, Cell::Key(kind));
        report.keys_placed += 1;
    }

    report.collectibles_requested =
        num_collectibles.unwrap_or_else(|| derived_collectible_count(free.len()));
    for _ in 0..report.collectibles_requested {
        let Some(pos) = free.next() else { break };
        let kind = CollectibleKind::ALL[rng.gen_range(0..CollectibleKind::ALL.len())];
        grid.set(pos, Cell::Collectible(kind));
        report.collectibles_placed += 1;
    }

    if !report.is_complete() {
        tracing::warn!(
            keys = report.keys_placed,
            keys_requested = report.keys_requested,
            collectibles = report.collectibles_placed,
            collectibles_requested = report.collectibles_requested,
            "not enough floor cells for every item"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashSet, VecDeque};

    fn seeded(width: usize, height: usize, strategy: GenerationStrategy, seed: u64) -> MazeGenerator {
        MazeGenerator::new(GeneratorConfig {
            width,
            height,
            strategy,
            seed: Some(seed),
            ..GeneratorConfig::default()
        })
    }

    fn reachable_from(grid: &Grid, origin: Position) -> HashSet<Position> {
        let mut seen = HashSet::from([origin]);
        let mut queue = VecDeque::from([origin]);
        while let Some(pos) = queue.pop_front() {
            for direction in Direction::ALL {
                if grid.can_move(pos, direction) {
                    if let Some(next) = grid.neighbor(pos, direction) {
                        if seen.insert(next) {
                            queue.push_back(next);
                        }
                    }
                }
            }
        }
        seen
    }

    #[test]
    fn test_dimensions_are_normalized() {
        assert_eq!(normalize_dimension(0), 3);
        assert_eq!(normalize_dimension(4), 5);
        assert_eq!(normalize_dimension(7), 7);

        let grid = seeded(10, 2, GenerationStrategy::DepthFirst, 1).carve();
        assert_eq!((grid.rows(), grid.cols()), (3, 11));
    }

    #[test]
    fn test_carved_mazes_are_spanning_trees() {
        for strategy in [GenerationStrategy::DepthFirst, GenerationStrategy::Prim] {
            let grid = seeded(15, 11, strategy, 42).carve();
            let lattice = (grid.rows() / 2) * (grid.cols() / 2);
            let open = grid.count(|c| c == Cell::Floor);
            assert_eq!(open, lattice + (lattice - 1), "{strategy:?}");

            let all_open: HashSet<_> = grid.positions(|c| c == Cell::Floor).into_iter().collect();
            assert_eq!(reachable_from(&grid, Position::new(1, 1)), all_open, "{strategy:?}");
        }
    }

    #[test]
    fn test_border_stays_wall() {
        let grid = seeded(13, 13, GenerationStrategy::Prim, 3).carve();
        for (pos, cell) in grid.iter() {
            if pos.row == 0 || pos.col == 0 || pos.row == 12 || pos.col == 12 {
                assert_eq!(cell, Cell::Wall, "border cell {pos}");
            }
        }
    }

    #[test]
    fn test_same_seed_same_maze() {
        let a = seeded(21, 21, GenerationStrategy::DepthFirst, 9).generate().unwrap();
        let b = seeded(21, 21, GenerationStrategy::DepthFirst, 9).generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_markers_prefer_opposite_corners() {
        let maze = seeded(11, 11, GenerationStrategy::DepthFirst, 5).generate().unwrap();
        let start = maze.report.start.unwrap();
        let exit = maze.report.exit.unwrap();
        assert_eq!(start.row + exit.row, 10);
        assert_eq!(start.col + exit.col, 10);
        assert_eq!(maze.grid.count(|c| c == Cell::Start), 1);
        assert_eq!(maze.grid.count(|c| c == Cell::Exit), 1);
    }

    #[test]
    fn test_markers_fall_back_to_random_floor() {
        let mut grid = Grid::parse("WWWWW\nW W W\nWWWWW\n").unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let (start, exit) = place_markers(&mut grid, &mut rng).unwrap();
        assert_ne!(start, exit);
        assert_eq!(grid.get(start), Some(Cell::Start));
        assert_eq!(grid.get(exit), Some(Cell::Exit));
    }

    #[test]
    fn test_insufficient_space() {
        let mut grid = Grid::parse("WWW\nW W\nWWW\n").unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let err = place_markers(&mut grid, &mut rng).unwrap_err();
        assert!(matches!(err, MazeError::InsufficientSpace { available: 1 }));
    }

    #[test]
    fn test_placement_reports_shortfall() {
        let mut grid = Grid::parse("WWWWWW\nW    W\nWWWWWW\n").unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        place_markers(&mut grid, &mut rng).unwrap();
        let report = place_items(&mut grid, 3, Some(4), &mut rng);
        assert_eq!(report.keys_placed, 2);
        assert_eq!(report.collectibles_placed, 0);
        assert_eq!(report.shortfall(), 5);
        assert_eq!(grid.count(|c| c == Cell::Floor), 0);
    }

    #[test]
    fn test_keys_cycle_through_catalog() {
        let maze = MazeGenerator::new(GeneratorConfig {
            num_keys: 6,
            num_collectibles: Some(0),
            seed: Some(11),
            ..GeneratorConfig::default()
        })
        .generate()
        .unwrap();
        for kind in KeyKind::ALL {
            assert_eq!(maze.grid.count(|c| c == Cell::Key(kind)), 2);
        }
    }

    #[test]
    fn test_derived_collectible_count() {
        assert_eq!(derived_collectible_count(0), 0);
        assert_eq!(derived_collectible_count(1), 1);
        assert_eq!(derived_collectible_count(20), 3);
        assert_eq!(derived_collectible_count(1000), 25);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn strategy() -> impl proptest::strategy::Strategy<Value = GenerationStrategy> {
            prop_oneof![Just(GenerationStrategy::DepthFirst), Just(GenerationStrategy::Prim)]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn every_open_cell_is_reachable_from_start(
                width in 11usize..31,
                height in 11usize..31,
                seed in any::<u64>(),
                strategy in strategy(),
            ) {
                let maze = seeded(width, height, strategy, seed).generate().unwrap();
                let start = maze.report.start.unwrap();
                let open: HashSet<_> = maze.grid.positions(|c| !c.is_wall()).into_iter().collect();
                prop_assert_eq!(reachable_from(&maze.grid, start), open);
            }

            #[test]
            fn carved_passages_equal_lattice_cells_minus_one(
                width in 3usize..25,
                height in 3usize..25,
                seed in any::<u64>(),
                strategy in strategy(),
            ) {
                let grid = seeded(width, height, strategy, seed).carve();
                let lattice = (grid.rows() / 2) * (grid.cols() / 2);
                let passages = grid
                    .positions(|c| c == Cell::Floor)
                    .into_iter()
                    .filter(|p| p.row % 2 != p.col % 2)
                    .count();
                prop_assert_eq!(passages, lattice - 1);
            }
        }
    }
}
