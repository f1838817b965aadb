use maze_rl_agent::{Checkpoint, DQNAgent, DQNConfig, LoadOutcome, RandomAgent};
use maze_rl_core::{Agent, Environment, PreviousAction, TrackedEnvironment, Transition};
use maze_rl_env::{MazeEnv, MazeEnvConfig, MazeEvent, MazeStatus, TimeLimit};
use tempfile::tempdir;

const CORRIDOR: &str = "WWWWWWWW\nWS U   W\nWWWWW EW\nWWWWWWWW\n";

fn small_agent(seed: u64) -> DQNAgent {
    DQNAgent::new(DQNConfig {
        view_radius: 1,
        hidden_dim: 16,
        seed: Some(seed),
        ..DQNConfig::default()
    })
}

fn corridor_env(seed: u64) -> MazeEnv {
    let mut config = MazeEnvConfig::default();
    config.env.seed = Some(seed);
    config.view_radius = 1;
    MazeEnv::from_text(CORRIDOR, config).unwrap()
}

/// Run one episode, returning the final status and the number of steps
fn run_episode<A>(agent: &mut A, env: &mut TrackedEnvironment<TimeLimit<MazeEnv>>, learn: bool) -> (MazeStatus, usize)
where
    A: Agent<Observation = maze_rl_core::VectorObservation, Action = maze_rl_env::Direction>,
{
    let (mut observation, _) = env.reset().unwrap();
    let mut previous = None;
    let mut total_reward = 0.0;
    loop {
        let action = agent.choose_action(&observation, previous);
        let step = env.step(action).unwrap();
        total_reward += step.reward.0;
        if learn {
            let transition = Transition::new(
                observation.clone(),
                action,
                step.reward,
                step.observation.clone(),
                step.done,
            );
            agent.learn(&transition).unwrap();
        }
        let blocked = env
            .env
            .env
            .last_events()
            .iter()
            .any(|e| matches!(e, MazeEvent::WallHit { .. }));
        previous = Some(PreviousAction { action, blocked });
        observation = step.observation;
        if step.done || step.truncated {
            break;
        }
    }
    agent.end_episode(total_reward);
    (env.env.env.status(), env.step_count)
}

#[test]
fn test_training_run_updates_every_step() {
    let mut agent = small_agent(11);
    let mut env = TrackedEnvironment::new(TimeLimit::new(corridor_env(3), 200));

    let mut steps = 0;
    for _ in 0..5 {
        let (_, taken) = run_episode(&mut agent, &mut env, true);
        assert!(taken <= 200);
        steps += taken;
    }

    assert_eq!(agent.learn_steps(), steps);
    assert!(agent.epsilon() < 1.0);
    assert!(agent.epsilon() >= agent.config().epsilon_min);

    let metrics = agent.metrics();
    assert_eq!(metrics.total_episodes, 5);
    assert_eq!(metrics.total_steps, steps);
    assert!(metrics.loss.is_some_and(f64::is_finite));
}

#[test]
fn test_random_baseline_finishes_episodes() {
    let mut agent = RandomAgent::new(1, Some(8));
    let mut env = TrackedEnvironment::new(TimeLimit::new(corridor_env(4), 300));

    for _ in 0..3 {
        let (status, steps) = run_episode(&mut agent, &mut env, false);
        assert!(steps > 0);
        assert!(status.is_terminal() || steps == 300);
    }
    assert_eq!(agent.metrics().total_episodes, 3);
}

#[tokio::test]
async fn test_checkpoint_restores_network_and_halves_epsilon() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("dqn.ckpt");

    let mut trained = small_agent(1);
    let mut env = TrackedEnvironment::new(TimeLimit::new(corridor_env(5), 50));
    run_episode(&mut trained, &mut env, true);
    trained.save(&path).await.unwrap();

    let mut fresh = small_agent(2);
    assert_ne!(fresh.network().parameters(), trained.network().parameters());

    assert_eq!(fresh.load_checkpoint(&path).await, LoadOutcome::Restored);
    assert_eq!(fresh.network().parameters(), trained.network().parameters());
    assert!((fresh.epsilon() - 0.5).abs() < 1e-12);

    let checkpoint = Checkpoint::load(&path).await.unwrap();
    assert_eq!(checkpoint.shape(), (9, 16, 4));
}

#[tokio::test]
async fn test_missing_checkpoint_keeps_network() {
    let dir = tempdir().unwrap();
    let mut agent = small_agent(3);
    let before = agent.network().parameters();

    let outcome = agent.load_checkpoint(&dir.path().join("absent.ckpt")).await;
    assert_eq!(outcome, LoadOutcome::Missing);
    assert_eq!(agent.network().parameters(), before);
    assert!((agent.epsilon() - 1.0).abs() < 1e-12);

    // Loading through the trait never fails either
    agent.load(&dir.path().join("absent.ckpt")).await.unwrap();
}

#[tokio::test]
async fn test_unusable_checkpoint_reinitialises() {
    let dir = tempdir().unwrap();

    let garbage = dir.path().join("garbage.ckpt");
    tokio::fs::write(&garbage, b"not a checkpoint").await.unwrap();
    let mut agent = small_agent(4);
    let before = agent.network().parameters();
    assert_eq!(agent.load_checkpoint(&garbage).await, LoadOutcome::Reinitialized);
    assert_ne!(agent.network().parameters(), before);
    assert!((agent.epsilon() - 1.0).abs() < 1e-12);

    // Saved by a wider network
    let wide = dir.path().join("wide.ckpt");
    DQNAgent::new(DQNConfig {
        view_radius: 1,
        hidden_dim: 32,
        seed: Some(6),
        ..DQNConfig::default()
    })
    .save_checkpoint(&wide)
    .await
    .unwrap();
    assert_eq!(agent.load_checkpoint(&wide).await, LoadOutcome::Reinitialized);
    assert_eq!(agent.network().hidden_dim(), 16);
}
