//! Cardinal facing directions.

use rand::Rng;

/// One of the four horizontal cardinal directions.
///
/// Yaw follows the Bedrock convention: 0 = south (+Z), 90 = west (-X),
/// 180 = north (-Z), 270 = east (+X).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit `(dx, dz)` step for this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn yaw(self) -> f32 {
        match self {
            Direction::South => 0.0,
            Direction::West => 90.0,
            Direction::North => 180.0,
            Direction::East => 270.0,
        }
    }

    /// Snap a look yaw (any range, degrees) to the nearest cardinal direction.
    ///
    /// Returns `None` for non-finite input.
    pub fn from_yaw(yaw: f32) -> Option<Direction> {
        if !yaw.is_finite() {
            return None;
        }
        let normalized = yaw.rem_euclid(360.0);
        let quadrant = ((normalized + 45.0) / 90.0).floor() as i32 % 4;
        Some(match quadrant {
            0 => Direction::South,
            1 => Direction::West,
            2 => Direction::North,
            _ => Direction::East,
        })
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn random(rng: &mut impl Rng) -> Direction {
        Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
    }
}
