//! Deep Q-Network (DQN) agent implementation

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

use maze_rl_core::{
    ActionValueFunction, Agent, AgentConfig, AgentMetrics, DiscreteAction, Observation,
    PreviousAction, Transition, VectorObservation,
};
use maze_rl_env::{Direction, ViewWindow};

use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::network::QNetwork;

/// DQN-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DQNConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Initial exploration rate
    pub epsilon_start: f64,
    /// Multiplicative decay applied after every learning step
    pub epsilon_decay: f64,
    /// Exploration floor
    pub epsilon_min: f64,
    /// Epsilon is multiplied by this factor after a successful load
    pub load_epsilon_factor: f64,
    /// Radius of the observation window the agent is fed
    pub view_radius: usize,
    /// Hidden layer width
    pub hidden_dim: usize,
    /// Seed for weight initialisation and exploration
    pub seed: Option<u64>,
}

impl Default for DQNConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            epsilon_start: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
            load_epsilon_factor: 0.5,
            view_radius: 2,
            hidden_dim: 128,
            seed: None,
        }
    }
}

/// What [`DQNAgent::load_checkpoint`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Parameters restored from the file
    Restored,
    /// No file at the path; the current network is kept
    Missing,
    /// File unreadable or incompatible; a fresh network was initialised
    Reinitialized,
}

/// Epsilon-greedy DQN agent over the maze view window
pub struct DQNAgent {
    config: DQNConfig,
    window: ViewWindow,
    online: QNetwork,
    target: QNetwork,
    epsilon: f64,
    learn_steps: usize,
    rng: StdRng,
    metrics: AgentMetrics,
}

impl DQNAgent {
    /// Create a new DQN agent
    #[must_use]
    pub fn new(config: DQNConfig) -> Self {
        let mut rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let window = ViewWindow::new(config.view_radius);
        let online = Self::fresh_network(&config, window, &mut rng);
        let target = online.clone();

        Self {
            epsilon: config.epsilon_start,
            config,
            window,
            online,
            target,
            learn_steps: 0,
            rng,
            metrics: AgentMetrics::default(),
        }
    }

    fn fresh_network(config: &DQNConfig, window: ViewWindow, rng: &mut StdRng) -> QNetwork {
        QNetwork::new(
            window.dim(),
            config.hidden_dim,
            Direction::COUNT,
            config.base.learning_rate,
            rng,
        )
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &DQNConfig {
        &self.config
    }

    /// Current exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Number of learning steps taken so far
    #[must_use]
    pub fn learn_steps(&self) -> usize {
        self.learn_steps
    }

    /// Online estimator
    #[must_use]
    pub fn network(&self) -> &QNetwork {
        &self.online
    }

    fn random_direction(&mut self, pool: &[Direction]) -> Direction {
        if pool.is_empty() {
            Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())]
        } else {
            pool[self.rng.gen_range(0..pool.len())]
        }
    }

    /// Epsilon-greedy choice among moves the observation shows as open.
    ///
    /// The greedy branch walks actions by descending Q-value and skips the
    /// reversal of a move that just hit a wall, unless that reversal is the
    /// only open move.
    pub fn select(&mut self, features: &[f32], previous: Option<PreviousAction<Direction>>) -> Direction {
        let open = self.window.open_directions(features);

        if self.rng.gen::<f64>() < self.epsilon {
            return self.random_direction(&open);
        }

        let q = match self.online.q_values(features) {
            Ok(q) => q,
            Err(err) => {
                tracing::warn!(error = %err, "cannot score observation, acting randomly");
                return self.random_direction(&open);
            }
        };

        let mut ranked: Vec<Direction> = Direction::ALL.to_vec();
        ranked.sort_by(|a, b| q[b.index()].total_cmp(&q[a.index()]));
        let candidates: Vec<Direction> = ranked.into_iter().filter(|d| open.contains(d)).collect();

        let avoid = previous.filter(|p| p.blocked).map(|p| p.action.reverse());
        candidates
            .iter()
            .copied()
            .find(|&d| Some(d) != avoid)
            .or_else(|| candidates.first().copied())
            .unwrap_or_else(|| self.random_direction(&[]))
    }

    /// One temporal-difference update; returns the squared error
    pub fn update(
        &mut self,
        state: &[f32],
        action: Direction,
        reward: f64,
        next_state: &[f32],
        done: bool,
    ) -> maze_rl_core::Result<f64> {
        #[allow(clippy::cast_possible_truncation)]
        let target = if done {
            reward as f32
        } else {
            let (_, best_next) = self.target.best_action_value(next_state)?;
            (reward + self.config.base.gamma * f64::from(best_next)) as f32
        };

        let loss = f64::from(self.online.train_step(state, action.index(), target)?);

        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
        self.learn_steps += 1;
        if self.learn_steps % self.config.base.target_sync_interval.max(1) == 0 {
            self.target.copy_weights_from(&self.online)?;
        }

        self.metrics.loss = Some(loss);
        Ok(loss)
    }

    /// Persist the online network
    pub async fn save_checkpoint(&self, path: &Path) -> Result<(), CheckpointError> {
        Checkpoint::from_network(&self.online).save(path).await
    }

    /// Restore the online network from `path`. Never fails: missing files
    /// keep the current network and unusable ones reinitialise it.
    pub async fn load_checkpoint(&mut self, path: &Path) -> LoadOutcome {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "no checkpoint found, starting fresh");
            return LoadOutcome::Missing;
        }

        let restored = match Checkpoint::load(path).await {
            Ok(checkpoint) => checkpoint.restore_into(&mut self.online),
            Err(err) => Err(err),
        };

        match restored {
            Ok(()) => {
                self.sync_target();
                self.epsilon = (self.epsilon * self.config.load_epsilon_factor).max(self.config.epsilon_min);
                tracing::info!(path = %path.display(), epsilon = self.epsilon, "restored checkpoint");
                LoadOutcome::Restored
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unusable checkpoint, reinitialising network");
                self.online = Self::fresh_network(&self.config, self.window, &mut self.rng);
                self.sync_target();
                LoadOutcome::Reinitialized
            }
        }
    }

    fn sync_target(&mut self) {
        self.target = self.online.clone();
    }
}

#[async_trait]
impl Agent for DQNAgent {
    type Observation = VectorObservation;
    type Action = Direction;

    fn choose_action(
        &mut self,
        observation: &Self::Observation,
        previous: Option<PreviousAction<Self::Action>>,
    ) -> Self::Action {
        self.metrics.total_steps += 1;
        self.select(observation.features(), previous)
    }

    fn learn(&mut self, transition: &Transition<Self::Observation, Self::Action>) -> maze_rl_core::Result<f64> {
        self.update(
            transition.observation.features(),
            transition.action,
            transition.reward.0,
            transition.next_observation.features(),
            transition.done,
        )
    }

    fn end_episode(&mut self, total_reward: f64) {
        self.metrics.record_episode(total_reward);
    }

    async fn save(&self, path: &Path) -> maze_rl_core::Result<()> {
        Ok(self.save_checkpoint(path).await?)
    }

    async fn load(&mut self, path: &Path) -> maze_rl_core::Result<()> {
        self.load_checkpoint(path).await;
        Ok(())
    }

    fn metrics(&self) -> AgentMetrics {
        AgentMetrics {
            epsilon: Some(self.epsilon),
            ..self.metrics.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_rl_core::Reward;
    use maze_rl_env::{codes, Grid, Position};

    fn agent(epsilon: f64) -> DQNAgent {
        DQNAgent::new(DQNConfig {
            epsilon_start: epsilon,
            epsilon_min: 0.0,
            view_radius: 1,
            hidden_dim: 16,
            seed: Some(5),
            ..DQNConfig::default()
        })
    }

    fn window_at(text: &str, row: usize, col: usize) -> Vec<f32> {
        let grid = Grid::parse(text).unwrap();
        ViewWindow::new(1).encode(&grid, Position::new(row, col)).data
    }

    /// Make `direction` the clear favourite of the online network
    fn prefer(agent: &mut DQNAgent, features: &[f32], direction: Direction) {
        for _ in 0..300 {
            for d in Direction::ALL {
                let target = if d == direction { 10.0 } else { -10.0 };
                agent.online.train_step(features, d.index(), target).unwrap();
            }
        }
    }

    #[test]
    fn test_exploration_only_picks_open_moves() {
        let mut agent = agent(1.0);
        let features = window_at("WWW\nWS \nW W\n", 1, 1);
        for _ in 0..50 {
            let d = agent.select(&features, None);
            assert!(matches!(d, Direction::Down | Direction::Right));
        }
    }

    #[test]
    fn test_boxed_in_falls_back_to_any_move() {
        let mut agent = agent(0.0);
        let features = vec![codes::WALL; 9];
        let d = agent.select(&features, None);
        assert!(Direction::ALL.contains(&d));
    }

    #[test]
    fn test_greedy_skips_walls_and_blocked_reversal() {
        let mut agent = agent(0.0);
        let features = window_at("WWW\nWS \nW W\n", 1, 1);
        prefer(&mut agent, &features, Direction::Up);

        // Up is a wall, so the best open move wins
        let greedy = agent.select(&features, None);
        assert!(matches!(greedy, Direction::Down | Direction::Right));

        // Reversing a move that just hit a wall is skipped while another move is open
        let blocked = PreviousAction { action: greedy.reverse(), blocked: true };
        let chosen = agent.select(&features, Some(blocked));
        assert_ne!(chosen, greedy);
        assert!(matches!(chosen, Direction::Down | Direction::Right));

        // Unblocked previous moves do not restrict the choice
        let free = PreviousAction { action: greedy.reverse(), blocked: false };
        assert_eq!(agent.select(&features, Some(free)), greedy);
    }

    #[test]
    fn test_only_remaining_reversal_is_taken() {
        let mut agent = agent(0.0);
        let features = window_at("WWW\nWS \nWWW\n", 1, 1);
        let blocked = PreviousAction { action: Direction::Left, blocked: true };
        assert_eq!(agent.select(&features, Some(blocked)), Direction::Right);
    }

    #[test]
    fn test_epsilon_decays_to_floor() {
        let mut agent = DQNAgent::new(DQNConfig {
            epsilon_start: 1.0,
            epsilon_decay: 0.5,
            epsilon_min: 0.1,
            view_radius: 1,
            hidden_dim: 8,
            seed: Some(1),
            ..DQNConfig::default()
        });
        let features = vec![0.0; 9];
        for _ in 0..3 {
            agent.update(&features, Direction::Up, 1.0, &features, false).unwrap();
        }
        assert!((agent.epsilon() - 0.125).abs() < 1e-12);
        agent.update(&features, Direction::Up, 1.0, &features, true).unwrap();
        assert!((agent.epsilon() - 0.1).abs() < 1e-12);
        assert_eq!(agent.learn_steps(), 4);
    }

    #[test]
    fn test_target_sync_interval() {
        let mut agent = DQNAgent::new(DQNConfig {
            base: AgentConfig {
                target_sync_interval: 3,
                ..AgentConfig::default()
            },
            view_radius: 1,
            hidden_dim: 8,
            seed: Some(2),
            ..DQNConfig::default()
        });
        let features = vec![1.0; 9];
        for _ in 0..2 {
            agent.update(&features, Direction::Down, 5.0, &features, true).unwrap();
        }
        assert_ne!(agent.target.parameters(), agent.online.parameters());
        agent.update(&features, Direction::Down, 5.0, &features, true).unwrap();
        assert_eq!(agent.target.parameters(), agent.online.parameters());
    }

    #[test]
    fn test_learn_through_agent_trait() {
        let mut agent = agent(0.5);
        let obs = VectorObservation::new(window_at("WWW\nWS \nW W\n", 1, 1));
        let next = VectorObservation::new(window_at("WWWW\nW  W\nW  W\n", 1, 2));
        let transition = Transition::new(obs.clone(), Direction::Right, Reward(-0.01), next, false);

        let loss = agent.learn(&transition).unwrap();
        assert!(loss.is_finite());
        agent.choose_action(&obs, None);
        agent.end_episode(3.0);

        let metrics = agent.metrics();
        assert_eq!(metrics.total_steps, 1);
        assert_eq!(metrics.total_episodes, 1);
        assert_eq!(metrics.loss, Some(loss));
        assert_eq!(metrics.epsilon, Some(agent.epsilon()));
    }

    #[test]
    fn test_config_from_json() {
        let config: DQNConfig =
            serde_json::from_str(r#"{"learning_rate": 0.01, "epsilon_decay": 0.9, "hidden_dim": 64}"#).unwrap();
        assert!((config.base.learning_rate - 0.01).abs() < 1e-12);
        assert!((config.epsilon_decay - 0.9).abs() < 1e-12);
        assert_eq!(config.hidden_dim, 64);
        assert_eq!(config.view_radius, 2);
    }
}
