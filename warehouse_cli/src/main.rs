use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warehouse_core::{
    RenderMode, WarehouseConfig, WarehouseEnv,
    agent::{GreedyPolicy, Policy, RandomPolicy},
    layout::load_layout_from_string,
    runner::run_episode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    Random,
    Greedy,
}

#[derive(Parser, Debug)]
#[command(version, about = "Runs warehouse episodes with a baseline policy", long_about = None)]
struct Args {
    /// JSON file with a WarehouseConfig; flags below override it
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Fixed layout file; replaces random placement
    #[arg(short, long, value_name = "LAYOUT_FILE")]
    layout: Option<PathBuf>,

    #[arg(long)]
    grid_size: Option<usize>,

    #[arg(long)]
    robots: Option<usize>,

    #[arg(long)]
    items: Option<usize>,

    /// Seed for placement and the random policy
    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(short, long, default_value_t = 1)]
    episodes: usize,

    #[arg(short, long, value_enum, default_value_t = PolicyKind::Greedy)]
    policy: PolicyKind,

    /// Print the grid after every tick
    #[arg(short, long)]
    render: bool,
}

impl Args {
    /// Builds the environment config: file first, then flag overrides.
    fn warehouse_config(&self) -> Result<WarehouseConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => WarehouseConfig::default(),
        };
        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(robots) = self.robots {
            config.n_robots = robots;
        }
        if let Some(items) = self.items {
            config.n_items = items;
        }
        if self.render {
            config.render_mode = RenderMode::Terminal;
        }
        Ok(config)
    }

    fn environment(&self) -> Result<WarehouseEnv> {
        let config = self.warehouse_config()?;
        let env = match (&self.layout, self.seed) {
            (Some(path), _) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read layout file {}", path.display()))?;
                let layout = load_layout_from_string(&text)
                    .with_context(|| format!("Failed to load layout {}", path.display()))?;
                WarehouseEnv::from_layout(config, layout)?
            }
            (None, Some(seed)) => WarehouseEnv::with_seed(config, seed)?,
            (None, None) => WarehouseEnv::new(config)?,
        };
        Ok(env)
    }

    fn policy(&self) -> Box<dyn Policy> {
        match self.policy {
            PolicyKind::Random => Box::new(RandomPolicy::new(self.seed.unwrap_or_else(rand::random))),
            PolicyKind::Greedy => Box::new(GreedyPolicy::new()),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args = Args::parse();
    let mut env = args.environment()?;
    let mut policy = args.policy();

    let mut returns = Vec::with_capacity(args.episodes);
    for episode in 0..args.episodes {
        // Only the first reset is seeded; later episodes continue the stream.
        let seed = if episode == 0 { args.seed } else { None };
        let summary = run_episode(&mut env, policy.as_mut(), seed)?;
        println!(
            "Episode {}: total rewards {} in {} steps ({} of {} delivered)",
            episode + 1,
            summary.total_reward,
            summary.steps,
            summary.delivered,
            env.items().len()
        );
        returns.push(summary.total_reward);
    }

    if !returns.is_empty() {
        let mean = returns.iter().sum::<f32>() / returns.len() as f32;
        info!(episodes = returns.len(), mean_return = mean, "Run complete");
    }
    Ok(())
}
