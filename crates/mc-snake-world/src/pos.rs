//! Integer block positions and continuous entity positions.

use std::ops::{Add, Mul, Sub};

use crate::direction::Direction;

/// A continuous position or displacement (blocks).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Vec3) -> f32 {
        (other - self).length()
    }

    /// Distance in the XZ plane, ignoring height.
    pub fn distance_xz(self, other: Vec3) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Unit vector in the same direction. A zero vector yields NaN components.
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        Vec3::new(self.x / len, self.y / len, self.z / len)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Round each component to `decimals` decimal places.
    pub fn rounded(self, decimals: i32) -> Vec3 {
        let scale = 10f32.powi(decimals);
        Vec3::new(
            (self.x * scale).round() / scale,
            (self.y * scale).round() / scale,
            (self.z * scale).round() / scale,
        )
    }

    /// Shift one block in `dir`, keeping the height.
    pub fn step(self, dir: Direction) -> Vec3 {
        let (dx, dz) = dir.offset();
        Vec3::new(self.x + dx as f32, self.y, self.z + dz as f32)
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// One block position. Ordered lexicographically by (x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block containing a continuous position.
    pub fn containing(pos: Vec3) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
            z: pos.z.floor() as i32,
        }
    }

    /// Horizontal centre of the block at its floor height.
    pub fn center(self) -> Vec3 {
        Vec3::new(self.x as f32 + 0.5, self.y as f32, self.z as f32 + 0.5)
    }

    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dz) = dir.offset();
        Self::new(self.x + dx, self.y, self.z + dz)
    }

    pub fn below(self) -> Self {
        Self::new(self.x, self.y - 1, self.z)
    }

    /// The four axis-aligned neighbours at the same height, in N, E, S, W order.
    pub fn horizontal_neighbors(self) -> [GridCell; 4] {
        Direction::ALL.map(|dir| self.offset(dir))
    }

    /// |dx| + |dz|; height is ignored.
    pub fn manhattan_xz(self, other: GridCell) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }
}
