//! Entity hitbox constants and block collision for ridden segments and chasers.

use crate::pos::{GridCell, Vec3};
use crate::terrain::TerrainQuery;

/// Segment mount hitbox width (Bedrock pig: 0.9 blocks).
pub const SEGMENT_WIDTH: f32 = 0.9;

/// Segment mount hitbox height (Bedrock pig: 0.9 blocks).
pub const SEGMENT_HEIGHT: f32 = 0.9;

/// Wolf hitbox width (Bedrock: 0.6 blocks).
pub const CHASER_WIDTH: f32 = 0.6;

/// Wolf hitbox height (Bedrock: 0.85 blocks).
pub const CHASER_HEIGHT: f32 = 0.85;

/// Entity collision box dimensions, centred horizontally on the feet position.
#[derive(Debug, Clone, Copy)]
pub struct Hitbox {
    pub width: f32,
    pub height: f32,
}

impl Hitbox {
    pub const SEGMENT: Hitbox = Hitbox {
        width: SEGMENT_WIDTH,
        height: SEGMENT_HEIGHT,
    };

    pub const CHASER: Hitbox = Hitbox {
        width: CHASER_WIDTH,
        height: CHASER_HEIGHT,
    };

    /// Iterate all block positions this hitbox overlaps when its feet are at `pos`.
    ///
    /// A small epsilon (0.001) is subtracted from max bounds so that an entity
    /// touching the edge of a block does not collide with the next one.
    pub fn intersecting_blocks(&self, pos: Vec3) -> impl Iterator<Item = GridCell> {
        const EPS: f32 = 0.001;
        let half = self.width / 2.0;
        let bx_min = (pos.x - half).floor() as i32;
        let bx_max = (pos.x + half - EPS).floor() as i32;
        let by_min = pos.y.floor() as i32;
        let by_max = (pos.y + self.height - EPS).floor() as i32;
        let bz_min = (pos.z - half).floor() as i32;
        let bz_max = (pos.z + half - EPS).floor() as i32;

        let mut results = Vec::new();
        for bx in bx_min..=bx_max {
            for by in by_min..=by_max {
                for bz in bz_min..=bz_max {
                    results.push(GridCell::new(bx, by, bz));
                }
            }
        }
        results.into_iter()
    }

    pub fn collides<T: TerrainQuery + ?Sized>(&self, terrain: &T, pos: Vec3) -> bool {
        self.intersecting_blocks(pos).any(|c| terrain.is_solid(c))
    }
}

/// Apply one tick of horizontal `velocity` to `pos`.
///
/// X and Z are resolved separately; an axis whose move would overlap a solid
/// block is cancelled, leaving the entity where it was on that axis. Vertical
/// velocity is ignored.
pub fn resolve_move<T: TerrainQuery + ?Sized>(
    terrain: &T,
    pos: Vec3,
    velocity: Vec3,
    hitbox: Hitbox,
) -> Vec3 {
    let mut out = pos;

    let moved_x = Vec3::new(out.x + velocity.x, out.y, out.z);
    if velocity.x != 0.0 && !hitbox.collides(terrain, moved_x) {
        out = moved_x;
    }

    let moved_z = Vec3::new(out.x, out.y, out.z + velocity.z);
    if velocity.z != 0.0 && !hitbox.collides(terrain, moved_z) {
        out = moved_z;
    }

    out
}
