//! Local view window encoding used as the agent's observation

use maze_rl_core::{BoxObservationSpace, DiscreteAction, VectorObservation};

use crate::cell::Cell;
use crate::grid::{Direction, Grid, Position};

/// Numeric codes of the observation vector
pub mod codes {
    /// Open cell
    pub const FLOOR: f32 = 0.0;
    /// Wall or outside the grid
    pub const WALL: f32 = 1.0;
    /// Player
    pub const PLAYER: f32 = 2.0;
    /// Exit door
    pub const EXIT: f32 = 3.0;
    /// Any key
    pub const KEY: f32 = 4.0;
    /// Any collectible
    pub const COLLECTIBLE: f32 = 5.0;
}

/// Square window of `2 * radius + 1` cells per side centred on the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    radius: usize,
}

impl ViewWindow {
    /// Radii below 1 are raised to 1 so the four neighbours are always visible
    #[must_use]
    pub fn new(radius: usize) -> Self {
        Self { radius: radius.max(1) }
    }

    /// Cells visible in each direction
    #[must_use]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Window side length
    #[must_use]
    pub fn side(&self) -> usize {
        2 * self.radius + 1
    }

    /// Length of the encoded vector
    #[must_use]
    pub fn dim(&self) -> usize {
        self.side() * self.side()
    }

    /// Observation space covering every code
    #[must_use]
    pub fn space(&self) -> BoxObservationSpace {
        let dim = self.dim();
        BoxObservationSpace {
            low: vec![codes::FLOOR; dim],
            high: vec![codes::COLLECTIBLE; dim],
            shape: vec![dim],
        }
    }

    /// Encode the window around `center`, row-major; outside cells read as wall
    #[must_use]
    pub fn encode(&self, grid: &Grid, center: Position) -> VectorObservation {
        let side = self.side();
        let mut data = Vec::with_capacity(self.dim());
        for dr in 0..side {
            for dc in 0..side {
                let cell = (center.row + dr)
                    .checked_sub(self.radius)
                    .zip((center.col + dc).checked_sub(self.radius))
                    .and_then(|(row, col)| grid.get(Position::new(row, col)));
                data.push(cell.map_or(codes::WALL, code));
            }
        }
        VectorObservation::new(data)
    }

    /// Index of the cell adjacent to the centre in `direction`
    #[must_use]
    pub fn neighbor_index(&self, direction: Direction) -> usize {
        let side = self.side();
        let center = self.radius * side + self.radius;
        match direction {
            Direction::Up => center - side,
            Direction::Down => center + side,
            Direction::Left => center - 1,
            Direction::Right => center + 1,
        }
    }

    /// Whether the observation shows a wall next to the player in `direction`.
    /// Observations of the wrong length count as blocked.
    #[must_use]
    pub fn is_blocked(&self, features: &[f32], direction: Direction) -> bool {
        features
            .get(self.neighbor_index(direction))
            .map_or(true, |&value| (value - codes::WALL).abs() < f32::EPSILON)
    }

    /// Directions whose neighbour is not a wall, in index order
    #[must_use]
    pub fn open_directions(&self, features: &[f32]) -> Vec<Direction> {
        (0..Direction::COUNT)
            .filter_map(Direction::from_index)
            .filter(|&d| !self.is_blocked(features, d))
            .collect()
    }
}

/// Observation code of a single cell
#[must_use]
pub fn code(cell: Cell) -> f32 {
    match cell {
        Cell::Floor => codes::FLOOR,
        Cell::Wall => codes::WALL,
        Cell::Start => codes::PLAYER,
        Cell::Exit => codes::EXIT,
        Cell::Key(_) => codes::KEY,
        Cell::Collectible(_) => codes::COLLECTIBLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_rl_core::{Observation, ObservationSpace};

    #[test]
    fn test_encode_centres_on_player_and_pads_with_wall() {
        let grid = Grid::parse("S G\nWEU\n").unwrap();
        let window = ViewWindow::new(1);
        let obs = window.encode(&grid, Position::new(0, 0));
        #[rustfmt::skip]
        let expected = vec![
            1.0, 1.0, 1.0,
            1.0, 2.0, 0.0,
            1.0, 1.0, 3.0,
        ];
        assert_eq!(obs.data, expected);

        let obs = window.encode(&grid, Position::new(0, 1));
        assert_eq!(obs.data[5], codes::COLLECTIBLE);
        assert_eq!(obs.data[8], codes::KEY);
    }

    #[test]
    fn test_zero_radius_is_raised() {
        let window = ViewWindow::new(0);
        assert_eq!(window.radius(), 1);
        assert_eq!(window.dim(), 9);
    }

    #[test]
    fn test_neighbors_and_blocking() {
        let window = ViewWindow::new(2);
        assert_eq!(window.dim(), 25);
        assert_eq!(window.neighbor_index(Direction::Up), 7);
        assert_eq!(window.neighbor_index(Direction::Down), 17);
        assert_eq!(window.neighbor_index(Direction::Left), 11);
        assert_eq!(window.neighbor_index(Direction::Right), 13);

        let grid = Grid::parse("WWWWW\nWS  W\nW W W\nWWWWW\n").unwrap();
        let obs = window.encode(&grid, Position::new(1, 1));
        assert_eq!(window.open_directions(obs.features()), vec![Direction::Down, Direction::Right]);
        assert!(window.is_blocked(&[], Direction::Up));
    }

    #[test]
    fn test_space_contains_encodings() {
        let grid = Grid::parse("WWWW\nWSGW\nWUEW\nWWWW\n").unwrap();
        let window = ViewWindow::new(3);
        let obs = window.encode(&grid, Position::new(1, 1));
        assert!(window.space().contains(&obs));
        assert_eq!(obs.shape(), vec![49]);
    }
}
