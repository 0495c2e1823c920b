//! Hostile mob that hunts the snake's lead across the arena.

use std::collections::VecDeque;

use mc_snake_world::physics::{resolve_move, Hitbox};
use mc_snake_world::{GridCell, TerrainQuery, Vec3};

use crate::pathfinding::{move_toward_flat, yaw_toward, GridPathfinder};

#[derive(Debug, Clone, Copy)]
pub struct ChaserSettings {
    pub speed_blocks_per_second: f32,
    pub ticks_per_second: f32,
    /// Ticks between path recomputations.
    pub repath_interval_ticks: u32,
    /// XZ distance to the lead at which the snake is caught.
    pub catch_distance: f32,
}

impl Default for ChaserSettings {
    fn default() -> Self {
        Self {
            speed_blocks_per_second: 3.0,
            ticks_per_second: 10.0,
            repath_interval_ticks: 10,
            catch_distance: 0.8,
        }
    }
}

impl ChaserSettings {
    pub fn blocks_per_tick(&self) -> f32 {
        self.speed_blocks_per_second / self.ticks_per_second
    }
}

#[derive(Debug, Clone)]
pub struct Chaser {
    position: Vec3,
    yaw: f32,
    /// Remaining cells to walk, next first. Excludes the cell it stands in.
    path: VecDeque<GridCell>,
    ticks_until_repath: u32,
    settings: ChaserSettings,
}

impl Chaser {
    pub fn new(spawn: GridCell, settings: ChaserSettings) -> Self {
        Self {
            position: spawn.center(),
            yaw: 0.0,
            path: VecDeque::new(),
            ticks_until_repath: 0,
            settings,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn path(&self) -> &VecDeque<GridCell> {
        &self.path
    }

    /// Advance one tick toward `lead`. Returns the new position.
    pub fn tick<T: TerrainQuery + ?Sized>(
        &mut self,
        terrain: &T,
        pathfinder: &GridPathfinder,
        lead: Vec3,
    ) -> Vec3 {
        if self.ticks_until_repath == 0 {
            self.repath(terrain, pathfinder, lead);
            self.ticks_until_repath = self.settings.repath_interval_ticks;
        } else {
            self.ticks_until_repath -= 1;
        }

        while let Some(&next) = self.path.front() {
            if self.position.distance_xz(next.center()) < 0.1 {
                self.path.pop_front();
            } else {
                break;
            }
        }

        let goal = match self.path.front() {
            Some(cell) => cell.center(),
            // Sharing a cell with the lead: close in directly.
            None if GridCell::containing(self.position) == GridCell::containing(lead) => lead,
            None => return self.position,
        };

        let speed = self
            .settings
            .blocks_per_tick()
            .min(self.position.distance_xz(goal));
        let velocity = move_toward_flat(self.position, goal, speed);
        if velocity == Vec3::ZERO {
            return self.position;
        }

        self.yaw = yaw_toward(self.position, goal);
        self.position = resolve_move(terrain, self.position, velocity, Hitbox::CHASER);
        self.position
    }

    pub fn caught(&self, lead: Vec3) -> bool {
        self.position.distance_xz(lead) < self.settings.catch_distance
    }

    fn repath<T: TerrainQuery + ?Sized>(
        &mut self,
        terrain: &T,
        pathfinder: &GridPathfinder,
        lead: Vec3,
    ) {
        let start = GridCell::containing(self.position);
        let goal = GridCell::containing(lead);
        self.path = pathfinder
            .find_path(terrain, start, goal)
            .into_iter()
            .skip(1)
            .collect();
    }
}
