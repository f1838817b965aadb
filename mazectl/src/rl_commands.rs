// Training and play loops for mazectl

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use maze_rl_agent::{DQNAgent, DQNConfig, LoadOutcome, RandomAgent};
use maze_rl_core::{Agent, Environment, PreviousAction, TrackedEnvironment, Trajectory, Transition};
use maze_rl_env::{MazeEnv, MazeEnvConfig, MazeEvent, MazeStatus, TimeLimit};

/// Training run configuration, read from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub episodes: usize,
    /// Step limit per episode
    pub max_steps: usize,
    /// Checkpoint to resume from and save to
    pub checkpoint: Option<PathBuf>,
    /// Save every N episodes (0 saves only at the end)
    pub checkpoint_interval: usize,
    /// Log a progress line every N episodes
    pub log_interval: usize,
    pub env: MazeEnvConfig,
    pub agent: DQNConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            episodes: 100,
            max_steps: 1000,
            checkpoint: None,
            checkpoint_interval: 10,
            log_interval: 10,
            env: MazeEnvConfig::default(),
            agent: DQNConfig::default(),
        }
    }
}

impl TrainConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid config {}", path.display()))
    }
}

type MazeRunner = TrackedEnvironment<TimeLimit<MazeEnv>>;

fn maze(env: &MazeRunner) -> &MazeEnv {
    &env.env.env
}

fn hit_wall(env: &MazeRunner) -> bool {
    maze(env)
        .last_events()
        .iter()
        .any(|event| matches!(event, MazeEvent::WallHit { .. }))
}

/// Per-run tallies printed at the end
#[derive(Debug, Default)]
struct RunStats {
    won: usize,
    lost: usize,
    truncated: usize,
    total_reward: f64,
}

impl RunStats {
    fn record(&mut self, status: MazeStatus, truncated: bool, reward: f64) {
        match status {
            MazeStatus::Won => self.won += 1,
            MazeStatus::Lost => self.lost += 1,
            MazeStatus::Active if truncated => self.truncated += 1,
            MazeStatus::Active => {}
        }
        self.total_reward += reward;
    }

    fn print(&self, episodes: usize) {
        #[allow(clippy::cast_precision_loss)]
        let average = self.total_reward / episodes.max(1) as f64;
        println!("\n📊 {episodes} episodes");
        println!("   Won: {}", self.won);
        println!("   Lost: {}", self.lost);
        println!("   Truncated: {}", self.truncated);
        println!("   Average reward: {average:.2}");
    }
}

pub async fn train(maze_path: &Path, config: TrainConfig) -> Result<()> {
    let env = MazeEnv::load_file(maze_path, config.env.clone())
        .await
        .with_context(|| format!("Failed to load maze {}", maze_path.display()))?;

    let agent_config = DQNConfig {
        view_radius: env.config().view_radius,
        ..config.agent.clone()
    };
    let mut agent = DQNAgent::new(agent_config);

    if let Some(path) = &config.checkpoint {
        match agent.load_checkpoint(path).await {
            LoadOutcome::Restored => println!("📂 Resumed from {}", path.display()),
            LoadOutcome::Missing => println!("🆕 No checkpoint at {}, starting fresh", path.display()),
            LoadOutcome::Reinitialized => println!("⚠️  Checkpoint unusable, starting fresh"),
        }
    }

    println!("🤖 Training DQN agent");
    println!("   Maze: {}", maze_path.display());
    println!("   Episodes: {}", config.episodes);
    println!("   Max steps: {}", config.max_steps);

    let mut env = TrackedEnvironment::new(TimeLimit::new(env, config.max_steps));
    let mut stats = RunStats::default();

    for episode in 1..=config.episodes {
        let (mut observation, _info) = env.reset()?;
        let episode_id = env.episode_info().map(|e| e.id).unwrap_or_default();
        let mut trajectory = Trajectory::new(episode_id);
        let mut previous = None;
        let mut last_loss = 0.0;

        let truncated = loop {
            let action = agent.choose_action(&observation, previous);
            let step = env.step(action)?;

            let transition = Transition::new(
                observation,
                action,
                step.reward,
                step.observation.clone(),
                step.done,
            );
            last_loss = agent.learn(&transition)?;
            trajectory.push(transition);

            previous = Some(PreviousAction {
                action,
                blocked: hit_wall(&env),
            });
            observation = step.observation;

            if step.done || step.truncated {
                break step.truncated;
            }
        };

        let total_reward = trajectory.total_reward;
        agent.end_episode(total_reward);
        let status = maze(&env).status();
        stats.record(status, truncated, total_reward);

        if config.log_interval > 0 && episode % config.log_interval == 0 {
            tracing::info!(
                episode,
                status = ?status,
                score = maze(&env).score(),
                id = %trajectory.episode_id,
                steps = trajectory.len(),
                reward = total_reward,
                discounted_return = trajectory.returns(agent.config().base.gamma).first().copied().unwrap_or(0.0),
                loss = last_loss,
                epsilon = agent.epsilon(),
                "training progress"
            );
        }

        if let Some(path) = &config.checkpoint {
            if config.checkpoint_interval > 0 && episode % config.checkpoint_interval == 0 {
                agent
                    .save_checkpoint(path)
                    .await
                    .with_context(|| format!("Failed to save checkpoint {}", path.display()))?;
            }
        }
    }

    if let Some(path) = &config.checkpoint {
        agent
            .save_checkpoint(path)
            .await
            .with_context(|| format!("Failed to save checkpoint {}", path.display()))?;
        println!("💾 Saved checkpoint to {}", path.display());
    }

    stats.print(config.episodes);
    println!("   Final epsilon: {:.4}", agent.epsilon());
    println!("\n✅ Training complete");
    Ok(())
}

pub async fn play(maze_path: &Path, episodes: usize, max_steps: usize, seed: Option<u64>) -> Result<()> {
    let mut env_config = MazeEnvConfig::default();
    env_config.env.seed = seed;
    let env = MazeEnv::load_file(maze_path, env_config)
        .await
        .with_context(|| format!("Failed to load maze {}", maze_path.display()))?;

    let mut agent = RandomAgent::new(env.config().view_radius, seed);
    let mut env = TrackedEnvironment::new(TimeLimit::new(env, max_steps));
    let mut stats = RunStats::default();

    println!("🎲 Random agent on {}", maze_path.display());

    for episode in 1..=episodes {
        let (mut observation, _info) = env.reset()?;
        let mut total_reward = 0.0;

        let truncated = loop {
            let action = agent.choose_action(&observation, None);
            let step = env.step(action)?;
            total_reward += step.reward.0;
            observation = step.observation;
            if step.done || step.truncated {
                break step.truncated;
            }
        };

        agent.end_episode(total_reward);
        let maze_env = maze(&env);
        stats.record(maze_env.status(), truncated, total_reward);
        println!(
            "Episode {episode}: {:?}, score {}, reward {total_reward:.2}, steps {}, keys {}/{}, collectibles {}/{}",
            maze_env.status(),
            maze_env.score(),
            env.step_count,
            maze_env.collected_keys(),
            maze_env.total_keys(),
            maze_env.collected_collectibles(),
            maze_env.total_collectibles(),
        );
    }

    stats.print(episodes);
    Ok(())
}
