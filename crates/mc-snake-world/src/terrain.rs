//! Block solidity queries and an in-memory block grid.
//!
//! A flat arena mirrors the Bedrock flat world: a solid floor layer with the
//! walking layer directly above it.

use std::collections::HashSet;

use crate::pos::GridCell;

/// Read-only view of block solidity.
pub trait TerrainQuery {
    /// Whether the block at `cell` obstructs movement.
    fn is_solid(&self, cell: GridCell) -> bool;

    /// Whether the full 3x3 footprint one layer below `cell` is solid.
    fn is_solid_3x3_below(&self, cell: GridCell) -> bool {
        let below = cell.below();
        (-1..=1).all(|dx| {
            (-1..=1).all(|dz| self.is_solid(GridCell::new(below.x + dx, below.y, below.z + dz)))
        })
    }

    /// Whether any of the four horizontal neighbours of `cell` is solid.
    fn has_solid_neighbor(&self, cell: GridCell) -> bool {
        cell.horizontal_neighbors()
            .into_iter()
            .any(|n| self.is_solid(n))
    }
}

/// Sparse set of solid blocks. Everything not in the set is air.
#[derive(Debug, Clone, Default)]
pub struct BlockGrid {
    solid: HashSet<GridCell>,
}

impl BlockGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// A solid floor at `floor_y` spanning the inclusive XZ rectangle.
    pub fn flat_platform(min_x: i32, min_z: i32, max_x: i32, max_z: i32, floor_y: i32) -> Self {
        let mut grid = Self::new();
        grid.fill(
            GridCell::new(min_x, floor_y, min_z),
            GridCell::new(max_x, floor_y, max_z),
        );
        grid
    }

    pub fn set_solid(&mut self, cell: GridCell) {
        self.solid.insert(cell);
    }

    pub fn clear(&mut self, cell: GridCell) {
        self.solid.remove(&cell);
    }

    /// Make every block in the inclusive box solid.
    pub fn fill(&mut self, a: GridCell, b: GridCell) {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for z in a.z.min(b.z)..=a.z.max(b.z) {
                    self.solid.insert(GridCell::new(x, y, z));
                }
            }
        }
    }

    /// A one-block-high wall around the perimeter of the inclusive XZ rectangle at height `y`.
    pub fn wall_ring(&mut self, min_x: i32, min_z: i32, max_x: i32, max_z: i32, y: i32) {
        for x in min_x..=max_x {
            self.solid.insert(GridCell::new(x, y, min_z));
            self.solid.insert(GridCell::new(x, y, max_z));
        }
        for z in min_z..=max_z {
            self.solid.insert(GridCell::new(min_x, y, z));
            self.solid.insert(GridCell::new(max_x, y, z));
        }
    }

    pub fn solid_count(&self) -> usize {
        self.solid.len()
    }
}

impl TerrainQuery for BlockGrid {
    fn is_solid(&self, cell: GridCell) -> bool {
        self.solid.contains(&cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_layout() {
        let grid = BlockGrid::flat_platform(0, 0, 4, 4, 63);
        assert_eq!(grid.solid_count(), 25);
        assert!(grid.is_solid(GridCell::new(0, 63, 0)));
        assert!(grid.is_solid(GridCell::new(4, 63, 4)));
        assert!(!grid.is_solid(GridCell::new(2, 64, 2)));
        assert!(!grid.is_solid(GridCell::new(5, 63, 0)));
    }

    #[test]
    fn footprint_below_centre_and_edge() {
        let grid = BlockGrid::flat_platform(0, 0, 4, 4, 63);
        assert!(grid.is_solid_3x3_below(GridCell::new(2, 64, 2)));
        assert!(grid.is_solid_3x3_below(GridCell::new(1, 64, 1)));
        // Edge cells hang over air on one side.
        assert!(!grid.is_solid_3x3_below(GridCell::new(0, 64, 2)));
        assert!(!grid.is_solid_3x3_below(GridCell::new(4, 64, 4)));
    }

    #[test]
    fn solid_neighbor_detection() {
        let mut grid = BlockGrid::flat_platform(0, 0, 4, 4, 63);
        assert!(!grid.has_solid_neighbor(GridCell::new(2, 64, 2)));
        grid.set_solid(GridCell::new(3, 64, 2));
        assert!(grid.has_solid_neighbor(GridCell::new(2, 64, 2)));
        grid.clear(GridCell::new(3, 64, 2));
        // Diagonals do not count.
        grid.set_solid(GridCell::new(3, 64, 3));
        assert!(!grid.has_solid_neighbor(GridCell::new(2, 64, 2)));
    }

    #[test]
    fn wall_ring_perimeter_only() {
        let mut grid = BlockGrid::new();
        grid.wall_ring(0, 0, 4, 4, 64);
        assert_eq!(grid.solid_count(), 16);
        assert!(grid.is_solid(GridCell::new(0, 64, 2)));
        assert!(grid.is_solid(GridCell::new(4, 64, 4)));
        assert!(!grid.is_solid(GridCell::new(2, 64, 2)));
    }
}
