use serde::Serialize;
use tracing::info;

use crate::{agent::Policy, environment::WarehouseEnv, error::WarehouseError};

/// Outcome of one full episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub total_reward: f32,
    pub steps: usize,
    pub delivered: usize,
    /// Whether the episode ended by the step limit with items undelivered.
    pub timed_out: bool,
}

/// Drives one episode from reset until it terminates or truncates, rendering
/// every tick according to the environment's render mode.
pub fn run_episode(
    env: &mut WarehouseEnv,
    policy: &mut dyn Policy,
    seed: Option<u64>,
) -> Result<EpisodeSummary, WarehouseError> {
    env.reset(seed);
    env.render();

    let mut total_reward = 0.0;
    loop {
        let actions = policy.act(&env.view());
        let outcome = env.step(&actions)?;
        total_reward += outcome.reward;
        env.render();
        if outcome.terminated || outcome.truncated {
            break;
        }
    }

    let delivered = env.items().iter().filter(|item| item.delivered).count();
    let summary = EpisodeSummary {
        total_reward,
        steps: env.steps(),
        delivered,
        timed_out: !env.all_delivered(),
    };
    info!(
        total_reward = summary.total_reward,
        steps = summary.steps,
        delivered = summary.delivered,
        "Episode finished"
    );
    Ok(summary)
}
