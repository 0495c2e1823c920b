//! ECS components for snake segment entities.

use bevy_ecs::prelude::*;
use mc_snake_world::physics::Hitbox;
use mc_snake_world::Vec3;

use crate::session::PlayerId;

/// Position in the world (feet).
#[derive(Component, Debug, Clone, Copy)]
pub struct Position(pub Vec3);

/// Velocity to apply on the next physics step, in blocks per tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct Velocity(pub Vec3);

/// Facing yaw in degrees.
#[derive(Component, Debug, Clone, Copy)]
pub struct Rotation {
    pub yaw: f32,
}

/// Axis-aligned bounding box used by the physics step.
#[derive(Component, Debug, Clone, Copy)]
pub struct BoundingBox(pub Hitbox);

/// Which snake a segment belongs to, and where in the body it sits.
#[derive(Component, Debug, Clone, Copy)]
pub struct Segment {
    pub player: PlayerId,
    /// 0 is the lead.
    pub index: usize,
}
