//! A snake: its segment entities, movement controller, and score.

use bevy_ecs::entity::Entity;
use mc_snake_world::Vec3;

use crate::movement::MovementController;

pub struct Snake {
    /// Lead first, then trailing segments in order.
    segments: Vec<Entity>,
    pub controller: MovementController,
    score: u32,
}

impl Snake {
    pub fn new(lead: Entity, controller: MovementController) -> Self {
        Self {
            segments: vec![lead],
            controller,
            score: 0,
        }
    }

    pub fn segments(&self) -> &[Entity] {
        &self.segments
    }

    /// Total segments including the lead.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn add_score(&mut self, points: u32) {
        self.score += points;
    }

    /// Where the next tail segment must be spawned, registering it with the
    /// controller. Call [`Snake::attach_tail`] with the spawned entity.
    pub fn prepare_growth(&mut self) -> Option<Vec3> {
        self.controller.grow()
    }

    pub fn attach_tail(&mut self, entity: Entity) {
        self.segments.push(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{MovementSettings, SegmentMotion};
    use bevy_ecs::world::World;
    use mc_snake_world::Direction;

    #[test]
    fn growth_appends_tail() {
        let mut world = World::new();
        let lead = world.spawn_empty().id();
        let mut snake = Snake::new(
            lead,
            MovementController::new(MovementSettings::default(), Direction::North),
        );
        assert_eq!(snake.len(), 1);
        assert!(snake.prepare_growth().is_none(), "no movement tick yet");

        let mut sink: Vec<(usize, SegmentMotion)> = Vec::new();
        snake.controller.step(&[Vec3::new(0.5, 64.0, 0.5)], &mut sink);
        let spawn = snake.prepare_growth().unwrap();
        assert_eq!(spawn, Vec3::new(0.5, 64.0, 0.5));

        let tail = world.spawn_empty().id();
        snake.attach_tail(tail);
        assert_eq!(snake.len(), 2);
        assert_eq!(snake.segments()[0], lead);
        assert_eq!(snake.segments()[1], tail);
        assert_eq!(snake.controller.segment_count(), 1);
    }

    #[test]
    fn score_accumulates() {
        let mut world = World::new();
        let lead = world.spawn_empty().id();
        let mut snake = Snake::new(
            lead,
            MovementController::new(MovementSettings::default(), Direction::East),
        );
        snake.add_score(1);
        snake.add_score(2);
        assert_eq!(snake.score(), 3);
    }
}
