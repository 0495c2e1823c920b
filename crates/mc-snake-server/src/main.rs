mod bot;
mod config;

use std::sync::Arc;
use std::time::Duration;

use bot::{BotView, SteerInput};
use config::SnakeConfig;
use mc_snake_game::input::InputBuffer;
use mc_snake_game::location::{find_location, LocationWorker, SharedRegions, SharedTerrain};
use mc_snake_game::pathfinding::{FootingPolicy, GridPathfinder, PathfinderConfig};
use mc_snake_game::{GameEvent, GameWorld, PlayerId};
use mc_snake_world::{BlockGrid, Direction, GridCell, Region, RegionRegistry, TerrainQuery};
use tracing::{debug, error, info, warn};

/// How far a snake could travel from `spawn` in `dir` before leaving solid ground.
fn free_run<T: TerrainQuery + ?Sized>(terrain: &T, spawn: GridCell, dir: Direction) -> u32 {
    let mut cell = spawn;
    let mut run = 0;
    loop {
        cell = cell.offset(dir);
        if terrain.is_solid(cell) || !terrain.is_solid(cell.below()) || run >= 64 {
            return run;
        }
        run += 1;
    }
}

/// Start a bot session at a random reachable cell, facing the longest open run.
fn start_bot(
    world: &mut GameWorld,
    region_name: &str,
    region: &Region,
    reach: &GridPathfinder,
    attempts: u32,
    player: PlayerId,
) {
    let terrain = world.terrain();
    let centre = region.center_cell();
    let origin = GridCell::new(centre.x, region.min.y, centre.z);
    let occupied: Vec<GridCell> = world
        .sessions()
        .iter()
        .filter_map(|s| world.segment_positions(s.player))
        .flatten()
        .map(GridCell::containing)
        .collect();

    let mut rng = rand::thread_rng();
    let Some(spawn) = find_location(
        &*terrain,
        region,
        reach,
        origin,
        &occupied,
        &mut rng,
        attempts,
        FootingPolicy::Solid3x3,
        0,
    ) else {
        warn!("No free spawn for bot {player}");
        return;
    };
    let direction = Direction::ALL
        .into_iter()
        .max_by_key(|&d| free_run(&*terrain, spawn, d));

    if let Err(e) = world.start_session(player, region_name, spawn, direction) {
        warn!("Failed to start bot {player}: {e}");
    }
}

fn bot_views(world: &GameWorld) -> Vec<BotView> {
    world
        .sessions()
        .iter()
        .filter_map(|s| {
            let positions = world.segment_positions(s.player)?;
            let &lead = positions.first()?;
            Some(BotView {
                player: s.player,
                lead,
                target: s.snake.controller.target(),
                heading: s.snake.controller.direction(),
                apples: s.apples.clone(),
                body: positions.into_iter().map(GridCell::containing).collect(),
            })
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let config = match SnakeConfig::load("snake.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load snake.toml: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("MC-Snake Server v{} starting", env!("CARGO_PKG_VERSION"));

    // Arena
    let arena = &config.arena;
    let min = GridCell::new(arena.min[0], arena.min[1], arena.min[2]);
    let max = GridCell::new(arena.max[0], arena.max[1], arena.max[2]);
    let mut grid = BlockGrid::flat_platform(min.x, min.z, max.x, max.z, arena.floor_y());
    if arena.walls {
        grid.wall_ring(min.x, min.z, max.x, max.z, min.y);
    }
    let mut registry = RegionRegistry::new();
    let region = match registry
        .register(&arena.region, min, max)
        .and_then(|_| registry.require(&arena.region))
    {
        Ok(r) => r,
        Err(e) => {
            error!("Invalid arena: {e}");
            std::process::exit(1);
        }
    };
    info!(
        "Arena '{}': {}x{} blocks, floor at y={}, walls: {}",
        arena.region,
        region.width(),
        region.depth(),
        arena.floor_y(),
        arena.walls
    );

    let terrain: SharedTerrain = Arc::new(grid);
    let regions: SharedRegions = Arc::new(registry);
    let settings = config.game_settings();

    let mut world = match GameWorld::new(Arc::clone(&terrain), Arc::clone(&regions), settings) {
        Ok(w) => w,
        Err(e) => {
            error!("Invalid game settings: {e}");
            std::process::exit(1);
        }
    };
    let (worker, mut search_results) = match LocationWorker::new(
        Arc::clone(&terrain),
        regions,
        settings.pathfinder,
        settings.search,
    ) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Invalid pathfinding settings: {e}");
            std::process::exit(1);
        }
    };
    let (bot_pathfinder, reach) = match (
        GridPathfinder::new(settings.pathfinder),
        GridPathfinder::new(PathfinderConfig {
            footing: FootingPolicy::Solid3x3,
            ..settings.pathfinder
        }),
    ) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => {
            error!("Invalid pathfinding settings: {e}");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    // Handle Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // Bots
    let (steer_tx, mut steer_rx) = tokio::sync::mpsc::channel::<SteerInput>(64);
    let (views_tx, views_rx) = tokio::sync::watch::channel(Vec::new());
    bot::spawn_bots(Arc::clone(&terrain), bot_pathfinder, views_rx, steer_tx);

    let bots: Vec<PlayerId> = (1..=u64::from(config.bots.count)).collect();
    for &player in &bots {
        start_bot(
            &mut world,
            &arena.region,
            &region,
            &reach,
            settings.search.attempts,
            player,
        );
    }
    info!("{} bot(s) riding", world.sessions().len());

    let mut input = InputBuffer::new();
    let mut respawn: Vec<PlayerId> = Vec::new();
    let tick_period = Duration::from_secs_f32(1.0 / settings.movement.ticks_per_second);
    let mut tick_interval = tokio::time::interval(tick_period);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                for player in respawn.drain(..) {
                    start_bot(&mut world, &arena.region, &region, &reach, settings.search.attempts, player);
                }

                world.tick(&input);

                for request in world.drain_search_requests() {
                    if let Err(e) = worker.dispatch(request) {
                        warn!("Placement search rejected: {e}");
                    }
                }

                for event in world.drain_events() {
                    match event {
                        GameEvent::SessionEnded { player, score, reason, .. } => {
                            info!("Player {player} finished with score {score}: {}", reason.message());
                            input.remove(player);
                            respawn.push(player);
                        }
                        GameEvent::AppleEaten { player, score, .. } => {
                            debug!("Player {player} ate an apple (score {score})");
                        }
                        GameEvent::PlacementFailed { player, kind } => {
                            info!("No room for a {kind:?} near player {player}");
                        }
                        _ => {}
                    }
                }

                let _ = views_tx.send(bot_views(&world));

                let tick = world.current_tick();
                if config.bots.duration_ticks > 0 && tick >= config.bots.duration_ticks {
                    info!("Reached {tick} ticks, stopping");
                    break;
                }
            }
            Some(steer) = steer_rx.recv() => {
                input.record_steer(steer.player, steer.forward, steer.yaw);
            }
            Some(result) = search_results.recv() => {
                world.apply_search_result(result);
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    let players = world.sessions().players();
    for player in players {
        match world.stop_session(player) {
            Ok(score) => info!("Player {player} stopped with score {score}"),
            Err(e) => warn!("Failed to stop player {player}: {e}"),
        }
    }
    info!("Server shut down.");
}
