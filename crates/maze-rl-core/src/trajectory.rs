//! Transitions and episode trajectories

use serde::{Deserialize, Serialize};

use crate::Reward;

/// Single transition in a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition<O, A> {
    /// Current observation
    pub observation: O,
    /// Action taken
    pub action: A,
    /// Reward received
    pub reward: Reward,
    /// Next observation
    pub next_observation: O,
    /// Whether episode ended
    pub done: bool,
}

impl<O, A> Transition<O, A> {
    /// Build a transition
    pub fn new(observation: O, action: A, reward: Reward, next_observation: O, done: bool) -> Self {
        Self {
            observation,
            action,
            reward,
            next_observation,
            done,
        }
    }
}

/// Complete trajectory of an episode
#[derive(Debug, Clone)]
pub struct Trajectory<O, A> {
    /// Sequence of transitions
    pub transitions: Vec<Transition<O, A>>,
    /// Total reward
    pub total_reward: f64,
    /// Episode ID
    pub episode_id: String,
}

impl<O, A> Trajectory<O, A> {
    /// Create a new empty trajectory
    pub fn new(episode_id: String) -> Self {
        Self {
            transitions: Vec::new(),
            total_reward: 0.0,
            episode_id,
        }
    }

    /// Add a transition to the trajectory
    pub fn push(&mut self, transition: Transition<O, A>) {
        self.total_reward += transition.reward.0;
        self.transitions.push(transition);
    }

    /// Get the length of the trajectory
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if trajectory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Whether the last transition ended the episode
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.transitions.last().is_some_and(|t| t.done)
    }

    /// Compute returns (cumulative discounted rewards)
    #[must_use]
    pub fn returns(&self, gamma: f64) -> Vec<f64> {
        let mut returns = vec![0.0; self.len()];
        let mut running_return = 0.0;

        for i in (0..self.len()).rev() {
            if self.transitions[i].done {
                running_return = 0.0;
            }
            running_return = self.transitions[i].reward.0 + gamma * running_return;
            returns[i] = running_return;
        }

        returns
    }
}
