//! Core reinforcement learning traits and types for the maze agent
//!
//! This crate provides the environment/agent contract shared by the maze
//! environment and the learning agents: steps, transitions, rewards,
//! observation and action spaces.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod agent;
pub mod environment;
pub mod error;
pub mod observation;
pub mod reward;
pub mod state;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use action::{Action, ActionSpace, DiscreteAction, DiscreteSpace};
pub use agent::{Agent, AgentConfig, AgentMetrics, PreviousAction};
pub use environment::{Environment, EnvironmentConfig, Episode, Step, StepInfo, TrackedEnvironment};
pub use error::{RLError, Result};
pub use observation::{BoxObservationSpace, Observation, ObservationSpace, VectorObservation};
pub use reward::Reward;
pub use state::State;
pub use trajectory::{Trajectory, Transition};
pub use value::ActionValueFunction;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, Agent, Environment, Observation, ObservationSpace, PreviousAction,
        Result, Reward, State, Step, Transition,
    };
}
