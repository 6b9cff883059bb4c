use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// A square 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// The engine keeps no persistent cell entities, so grids are built on demand
/// as scratch buffers (render glyphs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    size: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a `size` x `size` grid with every cell set to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `size * size` overflows `usize`.
    pub fn filled(size: usize, value: T) -> Self
    where
        T: Clone,
    {
        let len = size.checked_mul(size).expect("Grid size overflow");
        Grid {
            size,
            cells: vec![value; len],
        }
    }

    /// Returns the side length of the grid.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn coords_to_index(&self, x: usize, y: usize) -> Option<usize> {
        if self.is_valid(x, y) {
            Some(y * self.size + x)
        } else {
            None
        }
    }

    /// Checks if the given coordinates are within the grid boundaries.
    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    /// Gets an immutable reference to the cell at the given coordinates.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.coords_to_index(x, y).and_then(|index| self.cells.get(index))
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator over the rows of the grid, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks(0) panics, and an empty grid has no rows anyway
        self.cells.chunks(self.size.max(1))
    }
}

/// Indexing using Position coordinates for access
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Position) -> &Self::Output {
        match self.coords_to_index(index.x, index.y) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size {}",
                index.x, index.y, self.size
            ),
        }
    }
}

/// Indexing using Position coordinates for mutable access
impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, index: Position) -> &mut Self::Output {
        let size = self.size;
        match self.coords_to_index(index.x, index.y) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size {}",
                index.x, index.y, size
            ),
        }
    }
}
