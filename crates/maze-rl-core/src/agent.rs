//! Agent traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Action, Observation, Transition};

/// Configuration for agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Discount factor
    pub gamma: f64,
    /// Sync the target estimator every N learning steps
    pub target_sync_interval: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            gamma: 0.99,
            target_sync_interval: 1,
        }
    }
}

/// The action an agent took on the previous tick and whether it had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviousAction<A> {
    /// Action taken
    pub action: A,
    /// The environment rejected the action (e.g. walked into a wall)
    pub blocked: bool,
}

/// Core agent trait
#[async_trait]
pub trait Agent: Send + Sync {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;

    /// Select an action given an observation and the outcome of the previous action
    fn choose_action(
        &mut self,
        observation: &Self::Observation,
        previous: Option<PreviousAction<Self::Action>>,
    ) -> Self::Action;

    /// Learn from one observed transition, returning the training loss
    fn learn(&mut self, _transition: &Transition<Self::Observation, Self::Action>) -> crate::Result<f64> {
        Ok(0.0) // Default: no learning
    }

    /// Notify the agent that an episode finished with the given total reward
    fn end_episode(&mut self, _total_reward: f64) {}

    /// Save the agent
    async fn save(&self, path: &std::path::Path) -> crate::Result<()>;

    /// Load the agent
    async fn load(&mut self, path: &std::path::Path) -> crate::Result<()>;

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Total steps taken
    pub total_steps: usize,
    /// Total episodes
    pub total_episodes: usize,
    /// Average reward per episode
    pub avg_episode_reward: f64,
    /// Loss value
    pub loss: Option<f64>,
    /// Current exploration rate
    pub epsilon: Option<f64>,
}

impl AgentMetrics {
    /// Fold a finished episode into the running average
    pub fn record_episode(&mut self, total_reward: f64) {
        self.total_episodes += 1;
        let n = self.total_episodes as f64;
        self.avg_episode_reward += (total_reward - self.avg_episode_reward) / n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_episode_average() {
        let mut metrics = AgentMetrics::default();
        metrics.record_episode(10.0);
        metrics.record_episode(-2.0);
        metrics.record_episode(4.0);
        assert_eq!(metrics.total_episodes, 3);
        assert!((metrics.avg_episode_reward - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_agent_config_defaults_fill_missing_fields() {
        let config: AgentConfig = serde_json::from_str(r#"{"gamma": 0.9}"#).unwrap();
        assert!((config.gamma - 0.9).abs() < 1e-12);
        assert_eq!(config.target_sync_interval, 1);

        let config: AgentConfig = serde_json::from_str(r#"{"target_sync_interval": 5}"#).unwrap();
        assert_eq!(config.target_sync_interval, 5);
    }
}
