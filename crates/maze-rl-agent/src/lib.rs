//! Learning agents for the maze environment
//!
//! This crate provides:
//! - `QNetwork`, a small ndarray MLP trained with Adam
//! - `DQNAgent`, epsilon-greedy control with a target network
//! - `RandomAgent`, the uniform baseline
//! - Gzip-compressed bincode checkpoints

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checkpoint;
pub mod dqn;
pub mod network;
pub mod random;

// Re-export agents
pub use dqn::{DQNAgent, DQNConfig, LoadOutcome};
pub use random::RandomAgent;

pub use checkpoint::{Checkpoint, CheckpointError, FORMAT_VERSION};
pub use network::QNetwork;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{DQNAgent, DQNConfig, LoadOutcome, RandomAgent};
    pub use maze_rl_core::prelude::*;
}
