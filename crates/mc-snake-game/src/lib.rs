//! Snake game logic: movement, pathfinding, collisions, placement, sessions, and the ECS world.

pub mod chaser;
pub mod collision;
pub mod components;
pub mod error;
pub mod game_world;
pub mod input;
pub mod location;
pub mod movement;
pub mod pathfinding;
pub mod session;
pub mod snake;

pub use error::GameError;
pub use game_world::{GameEvent, GameSettings, GameWorld};
pub use session::PlayerId;
