//! Cell hash used to find merge candidates without a linear scan
//!
//! Keys are Morton codes of the cell coordinates, so nearby cells hash to
//! nearby keys.

use nalgebra::Vector2;
use rustc_hash::{FxBuildHasher, FxHashMap};

/// Uniform-grid hash over the local east/north plane for neighbour lookups
///
/// Cells are as wide as the query radius, so every point within that radius
/// of a query position sits in the 3×3 block of cells around it.
pub struct SpatialIndex {
    cells: FxHashMap<u64, Vec<u32>>,
    cell_size: f64,
}

impl SpatialIndex {
    /// Create an empty index with square cells of `cell_size` meters,
    /// pre-sized for roughly `capacity` occupied cells
    pub fn with_capacity(cell_size: f64, capacity: usize) -> Self {
        SpatialIndex {
            cells: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            cell_size,
        }
    }

    fn cell_coords(&self, pos: Vector2<f64>) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Insert an element at `position`
    pub fn insert(&mut self, id: u32, position: Vector2<f64>) {
        let (ix, iy) = self.cell_coords(position);
        self.cells
            .entry(morton_encode(ix, iy))
            .or_default()
            .push(id);
    }

    /// Elements in the 3×3 block of cells around `position`, in no particular order
    pub fn neighbours(&self, position: Vector2<f64>) -> impl Iterator<Item = u32> + '_ {
        let (ix, iy) = self.cell_coords(position);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| morton_encode(ix + dx, iy + dy)))
            .filter_map(|key| self.cells.get(&key))
            .flatten()
            .copied()
    }

    /// Get number of occupied cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Interleave the bits of two cell coordinates into one key
fn morton_encode(x: i32, y: i32) -> u64 {
    // Reinterpret so negative cells keep distinct keys
    let x = u64::from(x as u32);
    let y = u64::from(y as u32);

    let mut result = 0u64;
    for i in 0..32 {
        result |= ((x & (1 << i)) << i) | ((y & (1 << i)) << (i + 1));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbours_cover_query_radius() {
        let mut index = SpatialIndex::with_capacity(35.0, 4);
        index.insert(0, Vector2::new(0.0, 0.0));
        index.insert(1, Vector2::new(34.0, -20.0));
        index.insert(2, Vector2::new(-30.0, 30.0));
        index.insert(3, Vector2::new(200.0, 0.0));

        let mut found: Vec<u32> = index.neighbours(Vector2::new(1.0, 1.0)).collect();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);
    }

    #[test]
    fn test_negative_cells_are_distinct() {
        let mut index = SpatialIndex::with_capacity(10.0, 1);
        index.insert(7, Vector2::new(-500.0, -500.0));
        assert_eq!(index.neighbours(Vector2::new(500.0, 500.0)).count(), 0);
        assert_eq!(index.neighbours(Vector2::new(-495.0, -505.0)).count(), 1);
    }

    #[test]
    fn test_morton_interleaves_bits() {
        assert_eq!(morton_encode(0, 0), 0);
        assert_eq!(morton_encode(1, 0), 0b01);
        assert_eq!(morton_encode(0, 1), 0b10);
        assert_eq!(morton_encode(3, 3), 0b1111);
        assert_ne!(morton_encode(-1, 0), morton_encode(0, -1));
    }

    #[test]
    fn test_cells_are_shared_by_close_points() {
        let mut index = SpatialIndex::with_capacity(5.0, 16);
        index.insert(1, Vector2::new(2.0, 2.0));
        index.insert(2, Vector2::new(3.0, 1.0));
        index.insert(3, Vector2::new(12.0, 2.0));
        assert_eq!(index.cell_count(), 2);
        let mut found: Vec<u32> = index.neighbours(Vector2::new(-3.0, 0.0)).collect();
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }
}
