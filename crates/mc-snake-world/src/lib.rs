//! Block-grid world primitives: positions, directions, terrain queries, regions, and hitbox collision.

pub mod direction;
pub mod error;
pub mod physics;
pub mod pos;
pub mod region;
pub mod terrain;

pub use direction::Direction;
pub use error::WorldError;
pub use pos::{GridCell, Vec3};
pub use region::{Region, RegionBounds, RegionRegistry};
pub use terrain::{BlockGrid, TerrainQuery};
