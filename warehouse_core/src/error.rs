use crate::layout::LayoutError;

/// Precondition violations surfaced by the warehouse engine.
///
/// In-range actions that have no effect (a pickup on an empty cell, a drop
/// away from the dropoff) are not errors; they are no-ops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarehouseError {
    #[error("Grid size must be at least 1, got {0}")]
    InvalidGridSize(usize),
    #[error(
        "Grid of size {grid_size} has {available} cells but {required} are needed for robots, pickups and dropoffs"
    )]
    GridTooSmall {
        grid_size: usize,
        required: usize,
        available: usize,
    },
    #[error("Expected one action per robot ({expected}), got {actual}")]
    ActionCountMismatch { expected: usize, actual: usize },
    #[error("Action code {0} is not in 0..=5")]
    InvalidAction(usize),
    #[error("Invalid layout: {0}")]
    Layout(#[from] LayoutError),
}
