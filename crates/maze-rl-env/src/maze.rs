//! The maze environment: grid ownership, scoring, reward shaping and events

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use maze_rl_core::{
    ActionSpace, DiscreteSpace, Environment, ObservationSpace, Reward, State, Step, StepInfo,
    VectorObservation,
};

use crate::cell::{Cell, CollectibleKind, KeyKind};
use crate::config::MazeEnvConfig;
use crate::error::{MazeError, Result};
use crate::generator::place_items;
use crate::grid::{Direction, Grid, Position};
use crate::observation::ViewWindow;

/// Episode status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MazeStatus {
    /// Episode in progress
    #[default]
    Active,
    /// Exit opened with the required key
    Won,
    /// Score fell to the loss threshold
    Lost,
}

impl MazeStatus {
    /// `Won` or `Lost`
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, MazeStatus::Active)
    }
}

/// Per-episode player state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current cell, never a wall
    pub position: Position,
    /// Key kinds picked up this episode
    pub collected_keys: BTreeSet<KeyKind>,
    /// Collectibles picked up this episode
    pub collectibles: usize,
    /// Game score; may go negative
    pub score: i64,
    /// Seconds credited by collectibles
    pub time_bonus: i64,
    /// Episode status
    pub status: MazeStatus,
}

impl PlayerState {
    fn new(position: Position, score: i64) -> Self {
        Self {
            position,
            collected_keys: BTreeSet::new(),
            collectibles: 0,
            score,
            time_bonus: 0,
            status: MazeStatus::Active,
        }
    }
}

impl State for PlayerState {
    #[allow(clippy::cast_precision_loss)]
    fn features(&self) -> Vec<f64> {
        vec![
            self.position.row as f64,
            self.position.col as f64,
            self.collected_keys.len() as f64,
            self.collectibles as f64,
            self.score as f64,
            self.time_bonus as f64,
        ]
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Something that happened during a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MazeEvent {
    /// Step requested after the episode ended
    Ignored,
    /// Move blocked by a wall or the grid edge
    WallHit {
        /// Player position, unchanged
        position: Position,
        /// Requested move
        direction: Direction,
    },
    /// Player moved one cell
    Moved {
        /// Previous cell
        from: Position,
        /// New cell
        to: Position,
        /// The new cell had been entered before this episode
        revisit: bool,
    },
    /// A key kind not yet held was picked up
    KeyCollected {
        /// Kind picked up
        kind: KeyKind,
    },
    /// A collectible was picked up
    CollectibleCollected {
        /// Kind picked up
        kind: CollectibleKind,
        /// Points added to the score
        points: i64,
        /// Seconds added to the time bonus
        time_bonus: i64,
    },
    /// Player reached the exit without the required key
    ExitLocked {
        /// Key kind that opens the exit
        required: KeyKind,
    },
    /// Exit opened
    Won {
        /// Score after the exit bonus
        score: i64,
    },
    /// Score reached the loss threshold
    Lost {
        /// Final score
        score: i64,
    },
}

/// Observer notified of every [`MazeEvent`]
pub trait EventSink {
    /// Called once per event, in order
    fn on_event(&mut self, event: &MazeEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&MazeEvent),
{
    fn on_event(&mut self, event: &MazeEvent) {
        self(event);
    }
}

/// Reward and termination of one applied move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Shaped reward
    pub reward: f64,
    /// Episode ended with this move
    pub done: bool,
}

/// Maze environment
///
/// Owns the grid and player state; both change only through [`MazeEnv::apply`]
/// (or [`Environment::step`]). Resets restore the grid from the snapshot
/// taken when the maze was loaded.
pub struct MazeEnv {
    config: MazeEnvConfig,
    window: ViewWindow,
    pristine: Grid,
    pristine_has_items: bool,
    grid: Grid,
    start: Position,
    exit: Position,
    player: PlayerState,
    required_key: KeyKind,
    total_keys: usize,
    total_collectibles: usize,
    visited: HashSet<Position>,
    rng: StdRng,
    sinks: Vec<Box<dyn EventSink>>,
    last_events: Vec<MazeEvent>,
}

impl MazeEnv {
    /// Create an environment for a grid with exactly one start and one exit
    pub fn new(grid: Grid, config: MazeEnvConfig) -> Result<Self> {
        let (start, exit) = locate_markers(&grid)?;
        let rng = config.env.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let mut env = Self {
            window: ViewWindow::new(config.view_radius),
            pristine_has_items: grid.count(Cell::is_item) > 0,
            pristine: grid.clone(),
            grid,
            start,
            exit,
            player: PlayerState::new(start, config.scoring.starting_score),
            required_key: KeyKind::Ruby,
            total_keys: 0,
            total_collectibles: 0,
            visited: HashSet::new(),
            rng,
            sinks: Vec::new(),
            last_events: Vec::new(),
            config,
        };
        env.begin_episode();
        Ok(env)
    }

    /// Parse a maze in the text format
    pub fn from_text(text: &str, config: MazeEnvConfig) -> Result<Self> {
        Self::new(Grid::parse(text)?, config)
    }

    /// Read a maze file
    pub async fn load_file(path: impl AsRef<Path>, config: MazeEnvConfig) -> Result<Self> {
        let path = path.as_ref();
        let grid = Grid::load(path).await?;
        tracing::debug!(path = %path.display(), "loaded maze file");
        Self::new(grid, config)
    }

    /// Replace the maze. On error the current maze and episode are kept.
    pub fn load(&mut self, grid: Grid) -> Result<()> {
        let (start, exit) = locate_markers(&grid)?;
        self.pristine_has_items = grid.count(Cell::is_item) > 0;
        self.pristine = grid;
        self.start = start;
        self.exit = exit;
        self.begin_episode();
        Ok(())
    }

    /// Restore the pristine grid and start a new episode
    pub fn reset_for_training(&mut self) -> VectorObservation {
        self.begin_episode();
        self.observation()
    }

    /// Register an observer for step events
    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    fn begin_episode(&mut self) {
        let mut grid = self.pristine.clone();
        if !self.pristine_has_items {
            let report = place_items(&mut grid, KeyKind::ALL.len(), None, &mut self.rng);
            tracing::debug!(
                keys = report.keys_placed,
                collectibles = report.collectibles_placed,
                "placed items on empty maze"
            );
        }

        let present: Vec<KeyKind> = KeyKind::ALL
            .into_iter()
            .filter(|&kind| grid.count(|c| c == Cell::Key(kind)) > 0)
            .collect();
        let choices = if self.config.required_key_from_grid && !present.is_empty() {
            present
        } else {
            KeyKind::ALL.to_vec()
        };
        self.required_key = choices[self.rng.gen_range(0..choices.len())];
        tracing::debug!(required_key = %self.required_key, "new episode");

        self.total_keys = grid.count(|c| matches!(c, Cell::Key(_)));
        self.total_collectibles = grid.count(|c| matches!(c, Cell::Collectible(_)));
        self.grid = grid;
        self.player = PlayerState::new(self.start, self.config.scoring.starting_score);
        self.visited = HashSet::from([self.start]);
        self.last_events.clear();
    }

    /// Apply one move and return its reward
    pub fn apply(&mut self, direction: Direction) -> StepOutcome {
        let mut events = Vec::new();
        let outcome = self.resolve(direction, &mut events);
        for event in &events {
            for sink in &mut self.sinks {
                sink.on_event(event);
            }
        }
        self.last_events = events;
        outcome
    }

    fn resolve(&mut self, direction: Direction, events: &mut Vec<MazeEvent>) -> StepOutcome {
        if self.player.status.is_terminal() {
            events.push(MazeEvent::Ignored);
            return StepOutcome { reward: 0.0, done: true };
        }

        let scoring = &self.config.scoring;
        let rewards = &self.config.rewards;
        let from = self.player.position;
        let target = self
            .grid
            .neighbor(from, direction)
            .filter(|&p| self.grid.get(p).is_some_and(|c| !c.is_wall()));

        let mut reward;
        match target {
            None => {
                self.player.score -= scoring.wall_hit_penalty;
                reward = rewards.wall_hit;
                events.push(MazeEvent::WallHit { position: from, direction });
            }
            Some(to) => {
                self.player.score -= scoring.step_penalty;
                reward = rewards.step;
                let revisit = self.visited.contains(&to);
                if revisit {
                    reward += rewards.revisit;
                }

                let entered = self.grid.get(to).unwrap_or(Cell::Floor);
                let left_behind = if from == self.exit { Cell::Exit } else { Cell::Floor };
                self.grid.set(from, left_behind);
                self.grid.set(to, Cell::Start);
                self.player.position = to;
                self.visited.insert(to);
                events.push(MazeEvent::Moved { from, to, revisit });

                match entered {
                    Cell::Key(kind) => {
                        if self.player.collected_keys.insert(kind) {
                            self.player.score += scoring.key_bonus;
                            reward += rewards.key;
                            events.push(MazeEvent::KeyCollected { kind });
                        }
                    }
                    Cell::Collectible(kind) => {
                        self.player.collectibles += 1;
                        self.player.score += kind.points();
                        self.player.time_bonus += kind.time_bonus();
                        #[allow(clippy::cast_precision_loss)]
                        let bonus = 0.5 * kind.time_bonus() as f64;
                        reward += rewards.collectible + bonus;
                        events.push(MazeEvent::CollectibleCollected {
                            kind,
                            points: kind.points(),
                            time_bonus: kind.time_bonus(),
                        });
                    }
                    Cell::Exit => {
                        if self.player.collected_keys.contains(&self.required_key) {
                            self.player.score += scoring.exit_bonus;
                            reward += rewards.exit_success;
                            self.player.status = MazeStatus::Won;
                            events.push(MazeEvent::Won { score: self.player.score });
                            tracing::debug!(score = self.player.score, "maze solved");
                        } else {
                            reward += rewards.exit_without_key;
                            events.push(MazeEvent::ExitLocked { required: self.required_key });
                        }
                    }
                    Cell::Floor | Cell::Start | Cell::Wall => {}
                }
            }
        }

        if self.player.score <= scoring.loss_threshold {
            self.player.status = MazeStatus::Lost;
            reward = rewards.loss;
            events.push(MazeEvent::Lost { score: self.player.score });
            tracing::debug!(score = self.player.score, "score fell below loss threshold");
        }

        StepOutcome {
            reward,
            done: self.player.status.is_terminal(),
        }
    }

    /// Window around the player
    #[must_use]
    pub fn observation(&self) -> VectorObservation {
        self.window.encode(&self.grid, self.player.position)
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &MazeEnvConfig {
        &self.config
    }

    /// Observation window
    #[must_use]
    pub fn window(&self) -> ViewWindow {
        self.window
    }

    /// Current grid, with the player marked as the start cell
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Full player state
    #[must_use]
    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// Player cell
    #[must_use]
    pub fn player_position(&self) -> Position {
        self.player.position
    }

    /// Exit cell
    #[must_use]
    pub fn exit_position(&self) -> Position {
        self.exit
    }

    /// Distinct key kinds held
    #[must_use]
    pub fn collected_keys(&self) -> usize {
        self.player.collected_keys.len()
    }

    /// Keys on the grid at the start of the episode
    #[must_use]
    pub fn total_keys(&self) -> usize {
        self.total_keys
    }

    /// Collectibles picked up
    #[must_use]
    pub fn collected_collectibles(&self) -> usize {
        self.player.collectibles
    }

    /// Collectibles on the grid at the start of the episode
    #[must_use]
    pub fn total_collectibles(&self) -> usize {
        self.total_collectibles
    }

    /// Game score
    #[must_use]
    pub fn score(&self) -> i64 {
        self.player.score
    }

    /// Seconds earned from collectibles
    #[must_use]
    pub fn time_bonus(&self) -> i64 {
        self.player.time_bonus
    }

    /// Episode status
    #[must_use]
    pub fn status(&self) -> MazeStatus {
        self.player.status
    }

    /// The episode has been won or lost
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.player.status.is_terminal()
    }

    /// Key kind that opens the exit this episode
    #[must_use]
    pub fn required_key(&self) -> KeyKind {
        self.required_key
    }

    /// Events produced by the most recent step
    #[must_use]
    pub fn last_events(&self) -> &[MazeEvent] {
        &self.last_events
    }

    fn summary(&self) -> StepInfo {
        StepInfo::default()
            .with("score", self.player.score)
            .with("time_bonus", self.player.time_bonus)
            .with("keys", self.collected_keys())
            .with("collectibles", self.player.collectibles)
            .with("required_key", self.required_key.name())
            .with(
                "status",
                serde_json::to_value(self.player.status).unwrap_or(serde_json::Value::Null),
            )
    }
}

impl Environment for MazeEnv {
    type Observation = VectorObservation;
    type Action = Direction;
    type State = PlayerState;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(self.window.space())
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(DiscreteSpace::<Direction>::new())
    }

    fn reset(&mut self) -> maze_rl_core::Result<(Self::Observation, StepInfo)> {
        let observation = self.reset_for_training();
        let info = self
            .summary()
            .with("total_keys", self.total_keys)
            .with("total_collectibles", self.total_collectibles);
        Ok((observation, info))
    }

    fn step(&mut self, action: Direction) -> maze_rl_core::Result<Step<Self::Observation, Self::State>> {
        let outcome = self.apply(action);
        let mut info = self.summary();
        info.insert("events", serde_json::to_value(&self.last_events)?);

        Ok(Step {
            observation: self.observation(),
            reward: Reward(outcome.reward),
            done: outcome.done,
            truncated: false,
            info,
            state: Some(self.player.clone()),
        })
    }
}

/// Positions of the single start and exit markers
fn locate_markers(grid: &Grid) -> Result<(Position, Position)> {
    let single = |cell: Cell| -> Result<Position> {
        let found = grid.positions(|c| c == cell);
        match found.as_slice() {
            [pos] => Ok(*pos),
            _ => Err(MazeError::MissingMarker {
                marker: cell.symbol(),
                found: found.len(),
            }),
        }
    };
    Ok((single(Cell::Start)?, single(Cell::Exit)?))
}
