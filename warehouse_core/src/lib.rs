use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod layout;
pub mod map;
pub mod runner;

pub use config::{RenderMode, RewardConfig, WarehouseConfig};
pub use environment::{Action, Item, Robot, StepOutcome, WarehouseEnv, WarehouseView};
pub use error::WarehouseError;

/// Unique identifier for entities (robots, items). Doubles as the index into
/// the owning list.
pub type EntityId = usize;

/// Represents a 2D coordinate. `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns manhattan distance between two positions
    pub fn manhattan_distance(&self, other: &Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Offsets by `(dx, dy)`, clamping each axis to `0..grid_size`.
    pub fn offset_clamped(self, dx: isize, dy: isize, grid_size: usize) -> Position {
        let last = grid_size.saturating_sub(1);
        Position {
            x: self.x.saturating_add_signed(dx).min(last),
            y: self.y.saturating_add_signed(dy).min(last),
        }
    }
}
