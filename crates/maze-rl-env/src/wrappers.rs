//! Environment wrappers

use maze_rl_core::{ActionSpace, Environment, ObservationSpace, Step, StepInfo};

/// Time limit wrapper
///
/// Marks the step that reaches `max_steps` as truncated. `done` is left as
/// reported by the inner environment so learners do not treat the cut-off as
/// a terminal state.
pub struct TimeLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps
    pub max_steps: usize,
    /// Current step count
    pub steps: usize,
}

impl<E> TimeLimit<E> {
    /// Create a new time limit wrapper
    pub fn new(env: E, max_steps: usize) -> Self {
        Self {
            env,
            max_steps,
            steps: 0,
        }
    }
}

impl<E> Environment for TimeLimit<E>
where
    E: Environment,
{
    type Observation = E::Observation;
    type Action = E::Action;
    type State = E::State;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    fn reset(&mut self) -> maze_rl_core::Result<(Self::Observation, StepInfo)> {
        self.steps = 0;
        self.env.reset()
    }

    fn step(&mut self, action: Self::Action) -> maze_rl_core::Result<Step<Self::Observation, Self::State>> {
        self.steps += 1;
        let mut step = self.env.step(action)?;

        if self.steps >= self.max_steps && !step.done {
            step.truncated = true;
            step.info.insert("time_limit", self.max_steps);
        }

        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, MazeEnv, MazeEnvConfig};

    #[test]
    fn test_truncates_at_limit() {
        let env = MazeEnv::from_text("WWWWW\nWS EW\nWWWWW\n", MazeEnvConfig::default()).unwrap();
        let mut env = TimeLimit::new(env, 3);
        env.reset().unwrap();

        assert!(!env.step(Direction::Up).unwrap().truncated);
        assert!(!env.step(Direction::Up).unwrap().truncated);
        let last = env.step(Direction::Up).unwrap();
        assert!(last.truncated);
        assert!(!last.done);

        env.reset().unwrap();
        assert_eq!(env.steps, 0);
    }

    #[test]
    fn test_terminal_step_is_not_truncated() {
        let env = MazeEnv::from_text("WWWWW\nWSEUW\nWWWWW\n", MazeEnvConfig::default()).unwrap();
        let mut env = TimeLimit::new(env, 3);
        env.reset().unwrap();
        env.step(Direction::Right).unwrap();
        env.step(Direction::Right).unwrap();
        let exit = env.step(Direction::Left).unwrap();
        assert!(exit.done);
        assert!(!exit.truncated);
    }
}
