//! Scoring, reward shaping and environment configuration

use serde::{Deserialize, Serialize};

use maze_rl_core::EnvironmentConfig;

/// Integer game score rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score at the start of every episode
    pub starting_score: i64,
    /// Deducted for every successful move
    pub step_penalty: i64,
    /// Deducted for walking into a wall or off the grid
    pub wall_hit_penalty: i64,
    /// Added when a new key is picked up
    pub key_bonus: i64,
    /// Added when the exit is opened
    pub exit_bonus: i64,
    /// Episode is lost once the score falls to or below this value
    pub loss_threshold: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            starting_score: 50,
            step_penalty: 1,
            wall_hit_penalty: 5,
            key_bonus: 25,
            exit_bonus: 250,
            loss_threshold: -100,
        }
    }
}

/// Reward signal shaping for learning agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Every successful move
    pub step: f64,
    /// Walking into a wall or off the grid
    pub wall_hit: f64,
    /// Picking up a key kind not yet held
    pub key: f64,
    /// Base reward for a collectible; half its time bonus is added on top
    pub collectible: f64,
    /// Added to the step reward when entering an already visited cell
    pub revisit: f64,
    /// Stepping onto the exit without the required key
    pub exit_without_key: f64,
    /// Opening the exit
    pub exit_success: f64,
    /// Replaces any other reward when the score crosses the loss threshold
    pub loss: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            step: -0.01,
            wall_hit: -10.0,
            key: 50.0,
            collectible: 10.0,
            revisit: -20.0,
            exit_without_key: -500.0,
            exit_success: 1000.0,
            loss: -1000.0,
        }
    }
}

/// Everything a [`crate::MazeEnv`] needs besides the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeEnvConfig {
    /// Seed and step limit
    pub env: EnvironmentConfig,
    /// Radius of the square observation window around the player (at least 1)
    pub view_radius: usize,
    /// Draw the required key only from kinds lying on the grid instead of
    /// the whole catalog
    pub required_key_from_grid: bool,
    /// Game score rules
    pub scoring: ScoringConfig,
    /// Learning rewards
    pub rewards: RewardConfig,
}

impl Default for MazeEnvConfig {
    fn default() -> Self {
        Self {
            env: EnvironmentConfig::default(),
            view_radius: 2,
            required_key_from_grid: false,
            scoring: ScoringConfig::default(),
            rewards: RewardConfig::default(),
        }
    }
}

impl MazeEnvConfig {
    /// Number of values in an observation vector
    #[must_use]
    pub fn observation_dim(&self) -> usize {
        let side = 2 * self.view_radius.max(1) + 1;
        side * side
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: MazeEnvConfig = serde_json::from_str(
            r#"{"view_radius": 3, "scoring": {"starting_score": 100}, "env": {"seed": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.view_radius, 3);
        assert_eq!(config.observation_dim(), 49);
        assert_eq!(config.scoring.starting_score, 100);
        assert_eq!(config.scoring.wall_hit_penalty, 5);
        assert_eq!(config.env.seed, Some(7));
        assert!(!config.required_key_from_grid);
        assert_eq!(config.rewards, RewardConfig::default());
    }

    #[test]
    fn test_reward_ordering() {
        let r = RewardConfig::default();
        assert!(r.step.abs() < r.wall_hit.abs());
        assert!(r.wall_hit.abs() < r.key);
        assert!(r.key.abs() < r.exit_without_key.abs());
        assert!(r.revisit.abs() < r.exit_without_key.abs());
        assert!(r.exit_without_key.abs() < r.exit_success);
        assert!(r.exit_without_key.abs() < r.loss.abs());
    }
}
