//! Random agent for baseline comparisons

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

use maze_rl_core::{Agent, AgentMetrics, Observation, PreviousAction, VectorObservation};
use maze_rl_env::{Direction, ViewWindow};

/// Agent that picks a uniformly random open move, or any move when boxed in
pub struct RandomAgent {
    window: ViewWindow,
    rng: StdRng,
    metrics: AgentMetrics,
}

impl RandomAgent {
    /// Create a random agent reading observations of the given view radius
    #[must_use]
    pub fn new(view_radius: usize, seed: Option<u64>) -> Self {
        Self {
            window: ViewWindow::new(view_radius),
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
            metrics: AgentMetrics::default(),
        }
    }
}

#[async_trait]
impl Agent for RandomAgent {
    type Observation = VectorObservation;
    type Action = Direction;

    fn choose_action(
        &mut self,
        observation: &Self::Observation,
        _previous: Option<PreviousAction<Self::Action>>,
    ) -> Self::Action {
        self.metrics.total_steps += 1;
        let open = self.window.open_directions(observation.features());
        let pool: &[Direction] = if open.is_empty() { &Direction::ALL } else { &open };
        pool[self.rng.gen_range(0..pool.len())]
    }

    fn end_episode(&mut self, total_reward: f64) {
        self.metrics.record_episode(total_reward);
    }

    async fn save(&self, _path: &Path) -> maze_rl_core::Result<()> {
        // Nothing learned, nothing to persist
        Ok(())
    }

    async fn load(&mut self, _path: &Path) -> maze_rl_core::Result<()> {
        Ok(())
    }

    fn metrics(&self) -> AgentMetrics {
        self.metrics.clone()
    }
}
