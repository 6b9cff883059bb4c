use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::WarehouseError;

/// How `WarehouseEnv::render` presents the episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    None,
    /// Character grid printed to standard output.
    Terminal,
    /// Accepted for compatibility; renders nothing.
    Human,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(RenderMode::None),
            "terminal" => Ok(RenderMode::Terminal),
            "human" => Ok(RenderMode::Human),
            other => Err(format!("Unknown render mode '{}'.", other)),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderMode::None => "none",
            RenderMode::Terminal => "terminal",
            RenderMode::Human => "human",
        };
        f.write_str(name)
    }
}

/// Reward shaping applied by `WarehouseEnv::step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Granted per successful pickup.
    pub pickup: f32,
    /// Granted per successful delivery.
    pub delivery: f32,
    /// Added once per tick if two or more robots share a cell.
    pub collision: f32,
    /// Added once per tick unconditionally.
    pub step: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            pickup: 10.0,
            delivery: 50.0,
            collision: -20.0,
            step: -1.0,
        }
    }
}

/// Construction parameters for a warehouse episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Side length of the square grid.
    pub grid_size: usize,
    pub n_robots: usize,
    pub n_items: usize,
    pub render_mode: RenderMode,
    pub rewards: RewardConfig,
    /// Report hitting the step limit as `truncated` instead of `terminated`.
    pub truncate_on_step_limit: bool,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        WarehouseConfig {
            grid_size: 6,
            n_robots: 2,
            n_items: 2,
            render_mode: RenderMode::None,
            rewards: RewardConfig::default(),
            truncate_on_step_limit: false,
        }
    }
}

impl WarehouseConfig {
    /// Number of distinct cells an episode needs: one per robot plus a pickup
    /// and a dropoff per item.
    pub fn required_cells(&self) -> usize {
        self.n_items
            .saturating_mul(2)
            .saturating_add(self.n_robots)
    }

    /// Episode step bound, `2 · grid_size²`, saturating at `usize::MAX`.
    pub fn max_steps(&self) -> usize {
        self.grid_size
            .saturating_mul(self.grid_size)
            .saturating_mul(2)
    }

    /// Checks that a random episode can be placed on the grid.
    pub fn validate(&self) -> Result<(), WarehouseError> {
        if self.grid_size == 0 {
            return Err(WarehouseError::InvalidGridSize(self.grid_size));
        }
        let available = self
            .grid_size
            .checked_mul(self.grid_size)
            .ok_or(WarehouseError::InvalidGridSize(self.grid_size))?;
        let required = self.required_cells();
        if available < required {
            return Err(WarehouseError::GridTooSmall {
                grid_size: self.grid_size,
                required,
                available,
            });
        }
        Ok(())
    }
}
