//! Error types for maze generation and loading

use thiserror::Error;

use maze_rl_core::RLError;

/// Errors raised while generating, parsing or loading a maze
#[derive(Error, Debug)]
pub enum MazeError {
    /// Fewer than two floor cells for the start and exit markers
    #[error("Insufficient space: need at least 2 floor cells for start and exit, found {available}")]
    InsufficientSpace {
        /// Floor cells available
        available: usize,
    },

    /// Grid is empty, ragged or contains unknown symbols
    #[error("Malformed grid: {0}")]
    MalformedGrid(String),

    /// Start or exit marker missing (or present more than once)
    #[error("Expected exactly one '{marker}' marker, found {found}")]
    MissingMarker {
        /// Marker symbol, `S` or `E`
        marker: char,
        /// How many were found
        found: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MazeError> for RLError {
    fn from(err: MazeError) -> Self {
        match err {
            MazeError::Io(io) => RLError::Io(io),
            other => RLError::Environment(other.to_string()),
        }
    }
}

/// Result type alias for maze operations
pub type Result<T> = std::result::Result<T, MazeError>;
