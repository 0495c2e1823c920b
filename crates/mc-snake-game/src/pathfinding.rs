//! A* pathfinding over the horizontal block grid, plus flat steering helpers.
//!
//! The search runs on a single walking layer: neighbours are the four
//! axis-aligned cells at the same height, each step costs 1, and the
//! Manhattan heuristic ignores Y. Whether a cell can be stood on is decided
//! by a [`FootingPolicy`]:
//!
//! - [`FootingPolicy::SingleBlock`] drives the chasing mob, which only needs
//!   the block directly underneath.
//! - [`FootingPolicy::Solid3x3`] validates apple and spawn reachability, where
//!   a candidate must not sit on a ledge.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use mc_snake_world::{GridCell, TerrainQuery, Vec3};
use tracing::debug;

use crate::error::GameError;

/// Default cap on node expansions per search.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Rule deciding whether the block beneath a cell can carry an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FootingPolicy {
    /// The single block directly below must be solid.
    #[default]
    SingleBlock,
    /// The whole 3x3 footprint below must be solid.
    Solid3x3,
}

impl FootingPolicy {
    pub fn supports<T: TerrainQuery + ?Sized>(self, terrain: &T, cell: GridCell) -> bool {
        match self {
            FootingPolicy::SingleBlock => terrain.is_solid(cell.below()),
            FootingPolicy::Solid3x3 => terrain.is_solid_3x3_below(cell),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PathfinderConfig {
    /// Node expansions allowed before the search gives up with no path.
    pub max_iterations: usize,
    pub footing: FootingPolicy,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            footing: FootingPolicy::SingleBlock,
        }
    }
}

/// Open-set entry. Lives only for the duration of one search.
///
/// Ordered so that `BinaryHeap` pops the lowest f-score first; ties go to the
/// lowest h-score, then to the lowest cell in (x, y, z) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchNode {
    cell: GridCell,
    g_score: u32,
    h_score: u32,
    f_score: u32,
}

impl SearchNode {
    fn new(cell: GridCell, g_score: u32, h_score: u32) -> Self {
        Self {
            cell,
            g_score,
            h_score,
            f_score: g_score + h_score,
        }
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.h_score.cmp(&self.h_score))
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Grid A* with a configurable footing rule and iteration cap.
#[derive(Debug, Clone)]
pub struct GridPathfinder {
    config: PathfinderConfig,
}

impl GridPathfinder {
    pub fn new(config: PathfinderConfig) -> Result<Self, GameError> {
        if config.max_iterations == 0 {
            return Err(GameError::InvalidConfig(
                "pathfinder max_iterations must be at least 1".into(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    /// Manhattan distance in the XZ plane.
    pub fn heuristic(a: GridCell, b: GridCell) -> u32 {
        a.manhattan_xz(b)
    }

    /// Walkable horizontal neighbours of `cell`: not solid, and supported
    /// below according to the configured footing policy.
    pub fn neighbors<T: TerrainQuery + ?Sized>(&self, terrain: &T, cell: GridCell) -> Vec<GridCell> {
        cell.horizontal_neighbors()
            .into_iter()
            .filter(|&n| !terrain.is_solid(n) && self.config.footing.supports(terrain, n))
            .collect()
    }

    /// Shortest path from `start` to `goal`, both inclusive, ordered start to goal.
    ///
    /// Returns an empty path when the goal is unreachable, lies on another
    /// layer, or the iteration cap runs out first.
    pub fn find_path<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        start: GridCell,
        goal: GridCell,
    ) -> Vec<GridCell> {
        if start.y != goal.y {
            debug!("No path: start {start:?} and goal {goal:?} are on different layers");
            return Vec::new();
        }

        let mut open = BinaryHeap::new();
        let mut g_score: HashMap<GridCell, u32> = HashMap::new();
        let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
        let mut closed: HashSet<GridCell> = HashSet::new();

        g_score.insert(start, 0);
        open.push(SearchNode::new(start, 0, Self::heuristic(start, goal)));

        let mut iterations = 0usize;
        while let Some(current) = open.pop() {
            // Stale duplicate of an already-expanded cell.
            if closed.contains(&current.cell) {
                continue;
            }

            if current.cell == goal {
                return reconstruct_path(&came_from, current.cell);
            }

            iterations += 1;
            if iterations > self.config.max_iterations {
                debug!(
                    "Path search {start:?} -> {goal:?} hit the {} iteration cap",
                    self.config.max_iterations
                );
                return Vec::new();
            }

            closed.insert(current.cell);

            for next in self.neighbors(terrain, current.cell) {
                if closed.contains(&next) {
                    continue;
                }
                let tentative = current.g_score + 1;
                if tentative < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                    came_from.insert(next, current.cell);
                    g_score.insert(next, tentative);
                    open.push(SearchNode::new(next, tentative, Self::heuristic(next, goal)));
                }
            }
        }

        Vec::new()
    }

    pub fn path_exists<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        start: GridCell,
        goal: GridCell,
    ) -> bool {
        !self.find_path(terrain, start, goal).is_empty()
    }
}

fn reconstruct_path(came_from: &HashMap<GridCell, GridCell>, goal: GridCell) -> Vec<GridCell> {
    let mut path = vec![goal];
    let mut cursor = goal;
    while let Some(&prev) = came_from.get(&cursor) {
        path.push(prev);
        cursor = prev;
    }
    path.reverse();
    path
}

/// Whether two continuous positions fall in the same block.
pub fn same_block(a: Vec3, b: Vec3) -> bool {
    GridCell::containing(a) == GridCell::containing(b)
}

/// Move toward a target position on the flat plane.
///
/// Returns the horizontal velocity to apply this tick to move toward `goal`
/// at `speed` (blocks/tick).
pub fn move_toward_flat(current: Vec3, goal: Vec3, speed: f32) -> Vec3 {
    let dist = current.distance_xz(goal);

    if dist < 0.1 {
        return Vec3::ZERO;
    }

    let norm_x = (goal.x - current.x) / dist;
    let norm_z = (goal.z - current.z) / dist;
    Vec3::new(norm_x * speed, 0.0, norm_z * speed)
}

/// Compute the yaw angle (0..360 degrees) from one position facing another.
///
/// Convention: 0 = south (+Z), 90 = west (-X), 180 = north (-Z), 270 = east (+X).
/// This matches Minecraft Bedrock's yaw convention.
pub fn yaw_toward(from: Vec3, to: Vec3) -> f32 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    let yaw = (-dx).atan2(dz).to_degrees();
    ((yaw % 360.0) + 360.0) % 360.0
}
