//! Fixed warehouse layouts described as text.
//!
//! A layout is `n` rows of `n` whitespace-separated tokens:
//!
//! ```text
//! R  .  P0
//! .  .  .
//! D0 .  R
//! ```
//!
//! `.` is an empty cell, `R` a robot (ids follow row-major order), `P<n>` the
//! pickup of item `n` and `D<n>` its dropoff.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Position;

/// Errors produced while parsing a layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Layout string is empty.")]
    Empty,
    #[error("Layout must be square: row {row} has {found} cells, expected {expected}.")]
    NotSquare {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown layout code '{token}' at position ({x}, {y}).")]
    UnknownToken { token: String, x: usize, y: usize },
    #[error("Item {0} has more than one pickup cell.")]
    DuplicatePickup(usize),
    #[error("Item {0} has more than one dropoff cell.")]
    DuplicateDropoff(usize),
    #[error("Item {0} is missing its pickup cell.")]
    MissingPickup(usize),
    #[error("Item {0} is missing its dropoff cell.")]
    MissingDropoff(usize),
    #[error("Position ({x}, {y}) is out of bounds for grid size {grid_size}.")]
    OutOfBounds { x: usize, y: usize, grid_size: usize },
    #[error("Position ({x}, {y}) is used more than once.")]
    Overlap { x: usize, y: usize },
    #[error("Item id {id} at position ({x}, {y}) cannot fit on the grid.")]
    ItemIdOutOfRange { id: usize, x: usize, y: usize },
}

/// Starting positions for every robot and item of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub grid_size: usize,
    pub robots: Vec<Position>,
    /// `(pickup, dropoff)` per item, indexed by item id.
    pub items: Vec<(Position, Position)>,
}

impl Layout {
    /// Every position in the order the engine places them: robots first, then
    /// pickup and dropoff per item.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.robots.iter().copied().chain(
            self.items
                .iter()
                .flat_map(|&(pickup, dropoff)| [pickup, dropoff]),
        )
    }

    /// Checks that every position is on the grid and no two coincide.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut used = HashSet::new();
        for pos in self.positions() {
            if pos.x >= self.grid_size || pos.y >= self.grid_size {
                return Err(LayoutError::OutOfBounds {
                    x: pos.x,
                    y: pos.y,
                    grid_size: self.grid_size,
                });
            }
            if !used.insert(pos) {
                return Err(LayoutError::Overlap { x: pos.x, y: pos.y });
            }
        }
        Ok(())
    }
}

enum Token {
    Empty,
    Robot,
    Pickup(usize),
    Dropoff(usize),
}

fn parse_token(token: &str) -> Option<Token> {
    match token {
        "." => Some(Token::Empty),
        "R" => Some(Token::Robot),
        _ => {
            let (kind, id) = token.split_at_checked(1)?;
            if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let id: usize = id.parse().ok()?;
            match kind {
                "P" => Some(Token::Pickup(id)),
                "D" => Some(Token::Dropoff(id)),
                _ => None,
            }
        }
    }
}

/// Parses a layout from its text representation.
pub fn load_layout_from_string(layout: &str) -> Result<Layout, LayoutError> {
    let lines: Vec<&str> = layout
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(LayoutError::Empty);
    }

    let grid_size = lines.len();
    // Ids are contiguous from 0 and each item takes two cells.
    let max_items = grid_size.saturating_mul(grid_size) / 2;
    let mut robots = Vec::new();
    let mut pickups: Vec<Option<Position>> = Vec::new();
    let mut dropoffs: Vec<Option<Position>> = Vec::new();

    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != grid_size {
            return Err(LayoutError::NotSquare {
                row: y,
                expected: grid_size,
                found: tokens.len(),
            });
        }
        for (x, raw) in tokens.iter().enumerate() {
            let pos = Position { x, y };
            let token = parse_token(raw).ok_or_else(|| LayoutError::UnknownToken {
                token: raw.to_string(),
                x,
                y,
            })?;
            if let Token::Pickup(id) | Token::Dropoff(id) = token {
                if id >= max_items {
                    return Err(LayoutError::ItemIdOutOfRange { id, x, y });
                }
            }
            match token {
                Token::Empty => {}
                Token::Robot => robots.push(pos),
                Token::Pickup(id) => {
                    if pickups.len() <= id {
                        pickups.resize(id + 1, None);
                    }
                    if pickups[id].replace(pos).is_some() {
                        return Err(LayoutError::DuplicatePickup(id));
                    }
                }
                Token::Dropoff(id) => {
                    if dropoffs.len() <= id {
                        dropoffs.resize(id + 1, None);
                    }
                    if dropoffs[id].replace(pos).is_some() {
                        return Err(LayoutError::DuplicateDropoff(id));
                    }
                }
            }
        }
    }

    let n_items = pickups.len().max(dropoffs.len());
    let mut items = Vec::with_capacity(n_items);
    for id in 0..n_items {
        let pickup = pickups
            .get(id)
            .copied()
            .flatten()
            .ok_or(LayoutError::MissingPickup(id))?;
        let dropoff = dropoffs
            .get(id)
            .copied()
            .flatten()
            .ok_or(LayoutError::MissingDropoff(id))?;
        items.push((pickup, dropoff));
    }

    Ok(Layout {
        grid_size,
        robots,
        items,
    })
}
