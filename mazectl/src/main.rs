// Maze control CLI
// Generate mazes, inspect them, train the DQN agent and run the random baseline

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use maze_rl_env::{
    Cell, CollectibleKind, GenerationStrategy, GeneratorConfig, Grid, KeyKind, MazeEnv,
    MazeEnvConfig, MazeGenerator,
};

mod rl_commands;

#[derive(Parser)]
#[command(name = "mazectl")]
#[command(about = "Maze generation and reinforcement learning CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    DepthFirst,
    Prim,
}

impl From<Strategy> for GenerationStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::DepthFirst => GenerationStrategy::DepthFirst,
            Strategy::Prim => GenerationStrategy::Prim,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new maze
    Generate {
        /// Columns (bumped to the next odd number)
        #[arg(long, default_value = "21")]
        width: usize,

        /// Rows (bumped to the next odd number)
        #[arg(long, default_value = "21")]
        height: usize,

        /// Carving algorithm
        #[arg(short, long, value_enum, default_value = "depth-first")]
        strategy: Strategy,

        /// Number of keys to place
        #[arg(long, default_value = "3")]
        keys: usize,

        /// Number of collectibles (derived from free space when omitted)
        #[arg(long)]
        collectibles: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a maze file and print it with its item counts
    Show {
        /// Maze file
        maze: PathBuf,
    },

    /// Train the DQN agent on a maze
    Train {
        /// Maze file
        maze: PathBuf,

        /// JSON training configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of episodes (overrides the config file)
        #[arg(long)]
        episodes: Option<usize>,

        /// Checkpoint path (overrides the config file)
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Play episodes with the random baseline agent
    Play {
        /// Maze file
        maze: PathBuf,

        /// Number of episodes
        #[arg(long, default_value = "10")]
        episodes: usize,

        /// Step limit per episode
        #[arg(long, default_value = "1000")]
        max_steps: usize,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            width,
            height,
            strategy,
            keys,
            collectibles,
            seed,
            output,
        } => {
            let config = GeneratorConfig {
                width,
                height,
                strategy: strategy.into(),
                num_keys: keys,
                num_collectibles: collectibles,
                seed,
            };
            generate(config, output).await?;
        }

        Commands::Show { maze } => {
            show(&maze).await?;
        }

        Commands::Train {
            maze,
            config,
            episodes,
            checkpoint,
        } => {
            let mut train_config = match config {
                Some(path) => rl_commands::TrainConfig::load(&path).await?,
                None => rl_commands::TrainConfig::default(),
            };
            if let Some(episodes) = episodes {
                train_config.episodes = episodes;
            }
            if checkpoint.is_some() {
                train_config.checkpoint = checkpoint;
            }
            rl_commands::train(&maze, train_config).await?;
        }

        Commands::Play {
            maze,
            episodes,
            max_steps,
            seed,
        } => {
            rl_commands::play(&maze, episodes, max_steps, seed).await?;
        }
    }

    Ok(())
}

async fn generate(config: GeneratorConfig, output: Option<PathBuf>) -> Result<()> {
    let maze = MazeGenerator::new(config)
        .generate()
        .context("Failed to generate maze")?;

    match output {
        Some(path) => {
            maze.save(&path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Maze written to {}", path.display());
            println!("   Size: {}x{}", maze.grid.cols(), maze.grid.rows());
            println!(
                "   Keys: {}/{}",
                maze.report.keys_placed, maze.report.keys_requested
            );
            println!(
                "   Collectibles: {}/{}",
                maze.report.collectibles_placed, maze.report.collectibles_requested
            );
            if !maze.report.is_complete() {
                println!("   ⚠️  {} items did not fit", maze.report.shortfall());
            }
        }
        None => print!("{}", maze.grid),
    }

    Ok(())
}

async fn show(path: &std::path::Path) -> Result<()> {
    let grid = Grid::load(path)
        .await
        .with_context(|| format!("Failed to read maze {}", path.display()))?;
    print!("{grid}");

    println!("\n📋 {} ({}x{})", path.display(), grid.cols(), grid.rows());
    for kind in KeyKind::ALL {
        let count = grid.count(|c| c == Cell::Key(kind));
        if count > 0 {
            println!("   {kind} key ({}): {count}", kind.symbol());
        }
    }
    for kind in CollectibleKind::ALL {
        let count = grid.count(|c| c == Cell::Collectible(kind));
        if count > 0 {
            println!(
                "   {:?} collectible ({}): {count} x {} points",
                kind,
                kind.symbol(),
                kind.points()
            );
        }
    }

    match MazeEnv::new(grid, MazeEnvConfig::default()) {
        Ok(env) => println!(
            "✅ Playable: start {}, exit {}",
            env.player_position(),
            env.exit_position()
        ),
        Err(err) => println!("❌ Not playable: {err}"),
    }

    Ok(())
}
