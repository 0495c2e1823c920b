//! Steering input: latest cardinal direction per player.

use std::collections::HashMap;

use mc_snake_world::Direction;

use crate::session::PlayerId;

/// Source of the most recent steering direction for each player.
pub trait InputSource {
    fn latest_direction(&self, player: PlayerId) -> Option<Direction>;
}

/// Latest validated steer per player, fed from raw input events.
#[derive(Debug, Default, Clone)]
pub struct InputBuffer {
    latest: HashMap<PlayerId, Direction>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a steer input. Only forward input counts; the direction is the
    /// player's look yaw snapped to the nearest cardinal.
    ///
    /// Returns the direction recorded, if any.
    pub fn record_steer(&mut self, player: PlayerId, forward: f32, yaw: f32) -> Option<Direction> {
        if forward <= 0.0 {
            return None;
        }
        let dir = Direction::from_yaw(yaw)?;
        self.latest.insert(player, dir);
        Some(dir)
    }

    pub fn set(&mut self, player: PlayerId, dir: Direction) {
        self.latest.insert(player, dir);
    }

    /// Forget a player (session ended or player left).
    pub fn remove(&mut self, player: PlayerId) {
        self.latest.remove(&player);
    }
}

impl InputSource for InputBuffer {
    fn latest_direction(&self, player: PlayerId) -> Option<Direction> {
        self.latest.get(&player).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_input_sets_direction() {
        let mut input = InputBuffer::new();
        assert_eq!(input.record_steer(7, 0.98, 268.0), Some(Direction::East));
        assert_eq!(input.latest_direction(7), Some(Direction::East));
    }

    #[test]
    fn non_forward_input_ignored() {
        let mut input = InputBuffer::new();
        input.set(7, Direction::North);
        assert_eq!(input.record_steer(7, 0.0, 90.0), None);
        assert_eq!(input.record_steer(7, -1.0, 90.0), None);
        assert_eq!(input.latest_direction(7), Some(Direction::North));
    }

    #[test]
    fn players_are_independent() {
        let mut input = InputBuffer::new();
        input.record_steer(1, 1.0, 0.0);
        input.record_steer(2, 1.0, 180.0);
        assert_eq!(input.latest_direction(1), Some(Direction::South));
        assert_eq!(input.latest_direction(2), Some(Direction::North));
        input.remove(1);
        assert_eq!(input.latest_direction(1), None);
    }
}
