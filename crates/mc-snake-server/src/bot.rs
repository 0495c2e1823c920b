//! Bot riders: steer each snake toward its nearest apple.
//!
//! Bots run as their own task. They watch a snapshot of every snake
//! published after each tick and answer with steer input, the same shape a
//! real rider's movement packets would take.

use mc_snake_game::location::SharedTerrain;
use mc_snake_game::pathfinding::GridPathfinder;
use mc_snake_game::PlayerId;
use mc_snake_world::{Direction, GridCell, TerrainQuery, Vec3};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Raw steer input, as a mounted player would send it.
#[derive(Debug, Clone, Copy)]
pub struct SteerInput {
    pub player: PlayerId,
    pub forward: f32,
    pub yaw: f32,
}

/// What a bot sees of its snake after a tick.
#[derive(Debug, Clone)]
pub struct BotView {
    pub player: PlayerId,
    pub lead: Vec3,
    /// Where the lead is heading; turns take effect there.
    pub target: Option<Vec3>,
    pub heading: Direction,
    pub apples: Vec<GridCell>,
    pub body: Vec<GridCell>,
}

/// Pick a heading for the snake: along a path to the nearest apple when one
/// exists, otherwise any step that keeps it on solid ground.
pub fn choose_direction<T: TerrainQuery + ?Sized>(
    terrain: &T,
    pathfinder: &GridPathfinder,
    view: &BotView,
) -> Option<Direction> {
    let from = GridCell::containing(view.target.unwrap_or(view.lead));
    let safe = |dir: Direction| {
        let cell = from.offset(dir);
        dir != view.heading.opposite()
            && !terrain.is_solid(cell)
            && terrain.is_solid(cell.below())
            && !view.body.contains(&cell)
    };

    let nearest = view.apples.iter().min_by_key(|a| a.manhattan_xz(from));
    if let Some(&apple) = nearest {
        let path = pathfinder.find_path(terrain, from, apple);
        if let Some(dir) = path.get(1).and_then(|&next| direction_between(from, next)) {
            if safe(dir) {
                return Some(dir);
            }
        }
    }

    if safe(view.heading) {
        return Some(view.heading);
    }
    Direction::ALL.into_iter().find(|&d| safe(d))
}

fn direction_between(from: GridCell, to: GridCell) -> Option<Direction> {
    Direction::ALL.into_iter().find(|&d| from.offset(d) == to)
}

/// Spawn the bot task. It exits when either channel closes.
pub fn spawn_bots(
    terrain: SharedTerrain,
    pathfinder: GridPathfinder,
    mut views: watch::Receiver<Vec<BotView>>,
    steer: mpsc::Sender<SteerInput>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let snapshot = views.borrow_and_update().clone();
            for view in &snapshot {
                let Some(dir) = choose_direction(&*terrain, &pathfinder, view) else {
                    debug!("Bot {} is boxed in", view.player);
                    continue;
                };
                if dir == view.heading {
                    continue;
                }
                let input = SteerInput {
                    player: view.player,
                    forward: 1.0,
                    yaw: dir.yaw(),
                };
                if steer.send(input).await.is_err() {
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_snake_game::pathfinding::PathfinderConfig;
    use mc_snake_world::BlockGrid;
    use std::sync::Arc;

    fn pathfinder() -> GridPathfinder {
        GridPathfinder::new(PathfinderConfig::default()).unwrap()
    }

    fn view(lead: GridCell, heading: Direction, apples: Vec<GridCell>) -> BotView {
        BotView {
            player: 1,
            lead: lead.center(),
            target: None,
            heading,
            apples,
            body: vec![lead],
        }
    }

    #[test]
    fn heads_for_apple() {
        let grid = BlockGrid::flat_platform(0, 0, 9, 9, 63);
        let v = view(
            GridCell::new(2, 64, 2),
            Direction::East,
            vec![GridCell::new(2, 64, 7)],
        );
        assert_eq!(choose_direction(&grid, &pathfinder(), &v), Some(Direction::South));
    }

    #[test]
    fn never_reverses() {
        let grid = BlockGrid::flat_platform(0, 0, 9, 9, 63);
        let v = view(
            GridCell::new(5, 64, 5),
            Direction::East,
            vec![GridCell::new(1, 64, 5)],
        );
        let dir = choose_direction(&grid, &pathfinder(), &v).unwrap();
        assert_ne!(dir, Direction::West);
    }

    #[test]
    fn avoids_edge_without_apples() {
        let grid = BlockGrid::flat_platform(0, 0, 9, 9, 63);
        let v = view(GridCell::new(9, 64, 5), Direction::East, Vec::new());
        let dir = choose_direction(&grid, &pathfinder(), &v).unwrap();
        assert!(matches!(dir, Direction::North | Direction::South));
    }

    #[test]
    fn decides_from_target_cell() {
        let grid = BlockGrid::flat_platform(0, 0, 9, 9, 63);
        let mut v = view(
            GridCell::new(2, 64, 2),
            Direction::East,
            vec![GridCell::new(3, 64, 6)],
        );
        v.target = Some(GridCell::new(3, 64, 2).center());
        assert_eq!(choose_direction(&grid, &pathfinder(), &v), Some(Direction::South));
    }

    #[tokio::test]
    async fn bot_task_sends_turns() {
        let terrain: SharedTerrain = Arc::new(BlockGrid::flat_platform(0, 0, 9, 9, 63));
        let (views_tx, views_rx) = watch::channel(Vec::new());
        let (steer_tx, mut steer_rx) = mpsc::channel(8);
        let handle = spawn_bots(terrain, pathfinder(), views_rx, steer_tx);

        views_tx
            .send(vec![view(
                GridCell::new(2, 64, 2),
                Direction::East,
                vec![GridCell::new(2, 64, 7)],
            )])
            .unwrap();
        let input = steer_rx.recv().await.unwrap();
        assert_eq!(input.player, 1);
        assert!(input.forward > 0.0);
        assert_eq!(Direction::from_yaw(input.yaw), Some(Direction::South));

        drop(views_tx);
        handle.await.unwrap();
    }
}
