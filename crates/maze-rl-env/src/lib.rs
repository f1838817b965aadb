//! Maze generation and the maze reinforcement learning environment
//!
//! This crate provides:
//! - The cell catalog and the maze text format
//! - Perfect-maze generation (depth-first and Prim) with element placement
//! - `MazeEnv`, the scoring and reward model driven one move at a time
//! - The local view window used as the agent's observation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cell;
pub mod config;
pub mod error;
pub mod generator;
pub mod grid;
pub mod maze;
pub mod observation;
pub mod wrappers;

pub use cell::{Cell, CollectibleKind, KeyKind};
pub use config::{MazeEnvConfig, RewardConfig, ScoringConfig};
pub use error::{MazeError, Result};
pub use generator::{
    derived_collectible_count, place_items, place_markers, GeneratedMaze, GenerationStrategy,
    GeneratorConfig, MazeGenerator, PlacementReport,
};
pub use grid::{Direction, Grid, Position};
pub use maze::{EventSink, MazeEnv, MazeEvent, MazeStatus, PlayerState, StepOutcome};
pub use observation::{codes, ViewWindow};
pub use wrappers::TimeLimit;

// Re-export core types
pub use maze_rl_core::{Environment, EnvironmentConfig, Reward, Step, StepInfo, VectorObservation};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Direction, Grid, MazeEnv, MazeEnvConfig, MazeGenerator, MazeStatus, TimeLimit,
    };
    pub use maze_rl_core::prelude::*;
}
