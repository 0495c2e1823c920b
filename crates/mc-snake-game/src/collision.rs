//! Collision predicates and game-end evaluation.

use mc_snake_world::{GridCell, TerrainQuery, Vec3};

use crate::movement::{MovementController, MovementState};

/// Lead-to-segment distance (blocks) below which the snake has hit itself.
pub const SELF_COLLISION_TOLERANCE: f32 = 0.1;

/// Decimal places kept when comparing lead positions across ticks.
const WALL_CHECK_DECIMALS: i32 = 2;

/// The lead did not advance: its rounded position is unchanged since the last tick.
pub fn wall_collision(previous_lead: Vec3, current_lead: Vec3) -> bool {
    previous_lead.rounded(WALL_CHECK_DECIMALS) == current_lead.rounded(WALL_CHECK_DECIMALS)
}

/// Any trailing segment is within `tolerance` of the lead.
pub fn self_collision(lead: Vec3, trailing: &[Vec3], tolerance: f32) -> bool {
    trailing.iter().any(|p| p.distance(lead) < tolerance)
}

/// The block beneath the lead is not solid.
pub fn ground_collision<T: TerrainQuery + ?Sized>(terrain: &T, lead: Vec3) -> bool {
    !terrain.is_solid(GridCell::containing(lead).below())
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    WallCollision,
    SelfCollision,
    FellOffArena,
    CaughtByChaser,
    Dismounted,
    Disconnected,
    Stopped,
}

impl EndReason {
    pub fn message(self) -> &'static str {
        match self {
            EndReason::WallCollision => "Ran into a wall",
            EndReason::SelfCollision => "Ran into your own tail",
            EndReason::FellOffArena => "Fell off the arena",
            EndReason::CaughtByChaser => "Caught by the wolf",
            EndReason::Dismounted => "Left the snake",
            EndReason::Disconnected => "Disconnected",
            EndReason::Stopped => "Game stopped",
        }
    }
}

/// Host-side facts about the player riding the snake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerStatus {
    pub online: bool,
    pub mounted: bool,
    pub stop_requested: bool,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            online: true,
            mounted: true,
            stop_requested: false,
        }
    }
}

/// Collision predicate values for one snake after this tick's movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionSnapshot {
    pub wall: bool,
    pub self_hit: bool,
    pub off_ground: bool,
    pub caught: bool,
}

impl CollisionSnapshot {
    /// Evaluate the predicates against the positions observed after the host
    /// applied this tick's motion. `positions` is lead first.
    pub fn capture<T: TerrainQuery + ?Sized>(
        terrain: &T,
        controller: &MovementController,
        positions: &[Vec3],
        caught: bool,
    ) -> Self {
        let Some(&lead) = positions.first() else {
            return Self::default();
        };

        let wall = controller.state() == MovementState::Moving
            && controller
                .last_known_positions()
                .first()
                .is_some_and(|&previous| wall_collision(previous, lead));

        // A segment that has never been handed a waypoint is still sitting
        // where it spawned, which can be right behind the lead.
        let trailing: Vec<Vec3> = positions
            .iter()
            .enumerate()
            .skip(1)
            .filter(|&(index, _)| controller.assigned_waypoint(index).is_some())
            .map(|(_, &p)| p)
            .collect();

        Self {
            wall,
            self_hit: self_collision(lead, &trailing, SELF_COLLISION_TOLERANCE),
            off_ground: ground_collision(terrain, lead),
            caught,
        }
    }
}

/// Decide whether a session must end, and why.
///
/// Player presence is checked before physical collisions so that a
/// disconnect is never reported as a crash.
pub fn evaluate_end_conditions(
    snapshot: &CollisionSnapshot,
    status: &PlayerStatus,
) -> Option<EndReason> {
    if !status.online {
        return Some(EndReason::Disconnected);
    }
    if status.stop_requested {
        return Some(EndReason::Stopped);
    }
    if !status.mounted {
        return Some(EndReason::Dismounted);
    }
    if snapshot.wall {
        return Some(EndReason::WallCollision);
    }
    if snapshot.off_ground {
        return Some(EndReason::FellOffArena);
    }
    if snapshot.self_hit {
        return Some(EndReason::SelfCollision);
    }
    if snapshot.caught {
        return Some(EndReason::CaughtByChaser);
    }
    None
}
