//! Grid storage, movement directions and the maze text format

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use maze_rl_core::{Action, DiscreteAction};

use crate::cell::Cell;
use crate::error::{MazeError, Result};

/// Row/column coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row from the top
    pub row: usize,
    /// Column from the left
    pub col: usize,
}

impl Position {
    /// Position at `row`, `col`
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Position one unit step away, `None` when it would go below zero
    #[must_use]
    pub fn offset(self, direction: Direction) -> Option<Self> {
        let (dr, dc) = direction.delta();
        Some(Self {
            row: self.row.checked_add_signed(dr)?,
            col: self.col.checked_add_signed(dc)?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The four unit moves; indices are stable and used as network outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Row - 1
    Up,
    /// Row + 1
    Down,
    /// Column - 1
    Left,
    /// Column + 1
    Right,
}

impl Direction {
    /// All moves in index order
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// (row, col) delta
    #[must_use]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Opposite move
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl Action for Direction {
    fn to_vec(&self) -> Vec<f64> {
        let mut one_hot = vec![0.0; Self::COUNT];
        one_hot[self.index()] = 1.0;
        one_hot
    }
}

impl DiscreteAction for Direction {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Rectangular, row-major cell matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Grid of the given size with every cell set to `cell`
    #[must_use]
    pub fn filled(rows: usize, cols: usize, cell: Cell) -> Self {
        Self {
            rows,
            cols,
            cells: vec![cell; rows * cols],
        }
    }

    /// Build from row vectors, rejecting empty or ragged input
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if cols == 0 {
            return Err(MazeError::MalformedGrid("grid is empty".to_string()));
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(MazeError::MalformedGrid(format!(
                "row {index} has length {}, expected {cols}",
                row.len()
            )));
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Parse the maze text format: one line per row, one symbol per column.
    /// Blank lines are skipped and a trailing `\r` is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            let row = line
                .chars()
                .enumerate()
                .map(|(col, symbol)| {
                    Cell::from_symbol(symbol).ok_or_else(|| {
                        MazeError::MalformedGrid(format!(
                            "unknown symbol {symbol:?} at line {}, column {col}",
                            line_no + 1
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    /// Serialize to the maze text format, newline-terminated rows
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.rows * (self.cols + 1));
        for row in self.cells.chunks(self.cols) {
            text.extend(row.iter().map(|c| c.symbol()));
            text.push('\n');
        }
        text
    }

    /// Read and parse a maze file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse(&text)
    }

    /// Write the grid as a maze file, creating parent directories
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_text()).await?;
        tracing::debug!(path = %path.display(), rows = self.rows, cols = self.cols, "saved maze");
        Ok(())
    }

    /// Number of rows
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Inside the grid bounds
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Cell at `pos`, `None` out of bounds
    #[must_use]
    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.contains(pos).then(|| self.cells[pos.row * self.cols + pos.col])
    }

    /// Overwrite a cell; positions outside the grid are ignored
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if self.contains(pos) {
            self.cells[pos.row * self.cols + pos.col] = cell;
        }
    }

    /// In-bounds neighbour in the given direction
    #[must_use]
    pub fn neighbor(&self, pos: Position, direction: Direction) -> Option<Position> {
        pos.offset(direction).filter(|p| self.contains(*p))
    }

    /// Whether a move from `pos` would stay in bounds and avoid walls
    #[must_use]
    pub fn can_move(&self, pos: Position, direction: Direction) -> bool {
        self.neighbor(pos, direction)
            .and_then(|p| self.get(p))
            .is_some_and(|c| !c.is_wall())
    }

    /// All cells with their positions, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &cell)| (Position::new(i / cols, i % cols), cell))
    }

    /// Positions whose cell matches the predicate, row-major
    pub fn positions(&self, mut predicate: impl FnMut(Cell) -> bool) -> Vec<Position> {
        self.iter()
            .filter(|&(_, cell)| predicate(cell))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Number of cells matching `predicate`
    pub fn count(&self, mut predicate: impl FnMut(Cell) -> bool) -> usize {
        self.cells.iter().filter(|&&c| predicate(c)).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
