//! Named arena regions.

use std::collections::HashMap;

use rand::Rng;

use crate::error::WorldError;
use crate::pos::GridCell;

/// An inclusive axis-aligned box of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub min: GridCell,
    pub max: GridCell,
}

impl Region {
    /// Build a region from two corners in any order.
    pub fn from_corners(a: GridCell, b: GridCell) -> Self {
        Self {
            min: GridCell::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: GridCell::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        (self.min.x..=self.max.x).contains(&cell.x)
            && (self.min.y..=self.max.y).contains(&cell.y)
            && (self.min.z..=self.max.z).contains(&cell.z)
    }

    /// Number of blocks along X.
    pub fn width(&self) -> u32 {
        self.min.x.abs_diff(self.max.x) + 1
    }

    /// Number of blocks along Z.
    pub fn depth(&self) -> u32 {
        self.min.z.abs_diff(self.max.z) + 1
    }

    /// Cell nearest the horizontal centre, on the lowest layer.
    pub fn center_cell(&self) -> GridCell {
        GridCell::new(
            self.min.x + (self.max.x - self.min.x) / 2,
            self.min.y,
            self.min.z + (self.max.z - self.min.z) / 2,
        )
    }

    /// A uniformly random cell of the region at height `y`.
    pub fn random_cell(&self, rng: &mut impl Rng, y: i32) -> GridCell {
        GridCell::new(
            rng.gen_range(self.min.x..=self.max.x),
            y,
            rng.gen_range(self.min.z..=self.max.z),
        )
    }
}

/// Lookup of region corners by name.
pub trait RegionBounds {
    fn region(&self, name: &str) -> Option<Region>;
}

/// In-memory region table.
#[derive(Debug, Default, Clone)]
pub struct RegionRegistry {
    regions: HashMap<String, Region>,
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a region. Corners must already be ordered min <= max.
    pub fn register(&mut self, name: &str, min: GridCell, max: GridCell) -> Result<(), WorldError> {
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return Err(WorldError::InvertedRegion {
                name: name.to_string(),
                min: (min.x, min.y, min.z),
                max: (max.x, max.y, max.z),
            });
        }
        if self.regions.contains_key(name) {
            return Err(WorldError::DuplicateRegion(name.to_string()));
        }
        self.regions.insert(name.to_string(), Region { min, max });
        Ok(())
    }

    /// Fetch a region or fail with [`WorldError::UnknownRegion`].
    pub fn require(&self, name: &str) -> Result<Region, WorldError> {
        self.region(name)
            .ok_or_else(|| WorldError::UnknownRegion(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl RegionBounds for RegionRegistry {
    fn region(&self, name: &str) -> Option<Region> {
        self.regions.get(name).copied()
    }
}
