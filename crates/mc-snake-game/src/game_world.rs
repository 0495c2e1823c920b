//! ECS game world: bevy_ecs World, snake sessions, tick pipeline, and event bus.

use std::sync::Arc;

use bevy_ecs::prelude::*;
use mc_snake_world::physics::{resolve_move, Hitbox};
use mc_snake_world::{Direction, GridCell, RegionBounds, Vec3};
use tracing::{debug, info, warn};

use crate::chaser::{Chaser, ChaserSettings};
use crate::collision::{evaluate_end_conditions, CollisionSnapshot, EndReason, PlayerStatus};
use crate::components::*;
use crate::error::GameError;
use crate::input::InputSource;
use crate::location::{SearchKind, SearchRequest, SearchResult, SearchSettings, SharedRegions, SharedTerrain};
use crate::movement::{MovementController, MovementSettings, SegmentMotion, SessionSink};
use crate::pathfinding::{FootingPolicy, GridPathfinder, PathfinderConfig};
use crate::session::{GameSession, PlayerId, SessionRegistry};
use crate::snake::Snake;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Outgoing events queued during a tick for the host to act on.
#[derive(Resource, Default)]
pub struct OutgoingEvents {
    pub events: Vec<GameEvent>,
}

/// Global tick counter.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

// ---------------------------------------------------------------------------
// Game events (ECS → host)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    SessionStarted {
        player: PlayerId,
        session_id: u64,
        region: String,
        direction: Direction,
    },
    SegmentSpawned {
        player: PlayerId,
        index: usize,
        position: Vec3,
    },
    SegmentMoved {
        player: PlayerId,
        index: usize,
        position: Vec3,
        yaw: f32,
    },
    AppleSpawned {
        player: PlayerId,
        cell: GridCell,
    },
    AppleEaten {
        player: PlayerId,
        cell: GridCell,
        score: u32,
    },
    ChaserSpawned {
        player: PlayerId,
        position: Vec3,
    },
    ChaserMoved {
        player: PlayerId,
        position: Vec3,
        yaw: f32,
    },
    /// A background placement search found nothing.
    PlacementFailed {
        player: PlayerId,
        kind: SearchKind,
    },
    SessionEnded {
        player: PlayerId,
        session_id: u64,
        score: u32,
        reason: EndReason,
    },
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct GameSettings {
    pub movement: MovementSettings,
    pub pathfinder: PathfinderConfig,
    pub search: SearchSettings,
    /// `None` disables the chasing mob.
    pub chaser: Option<ChaserSettings>,
    /// Apples kept on the field per session.
    pub apple_count: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            movement: MovementSettings::default(),
            pathfinder: PathfinderConfig::default(),
            search: SearchSettings::default(),
            chaser: None,
            apple_count: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// GameWorld
// ---------------------------------------------------------------------------

pub struct GameWorld {
    pub world: World,
    terrain: SharedTerrain,
    regions: SharedRegions,
    sessions: SessionRegistry,
    settings: GameSettings,
    chase_pathfinder: GridPathfinder,
    pending_searches: Vec<SearchRequest>,
}

impl GameWorld {
    pub fn new(
        terrain: SharedTerrain,
        regions: SharedRegions,
        settings: GameSettings,
    ) -> Result<Self, GameError> {
        let movement = &settings.movement;
        if movement.speed_blocks_per_second <= 0.0 || movement.ticks_per_second <= 0.0 {
            return Err(GameError::InvalidConfig(
                "snake speed and tick rate must be positive".into(),
            ));
        }
        let chase_pathfinder = GridPathfinder::new(PathfinderConfig {
            footing: FootingPolicy::SingleBlock,
            ..settings.pathfinder
        })?;

        let mut world = World::new();
        world.insert_resource(OutgoingEvents::default());
        world.insert_resource(TickCounter::default());

        Ok(Self {
            world,
            terrain,
            regions,
            sessions: SessionRegistry::new(),
            settings,
            chase_pathfinder,
            pending_searches: Vec::new(),
        })
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn terrain(&self) -> SharedTerrain {
        Arc::clone(&self.terrain)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn session(&self, player: PlayerId) -> Option<&GameSession> {
        self.sessions.get(player)
    }

    pub fn current_tick(&self) -> u64 {
        self.world.resource::<TickCounter>().0
    }

    /// Drain all pending outgoing events.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.world.resource_mut::<OutgoingEvents>().events)
    }

    /// Placement searches queued since the last drain, for the location worker.
    pub fn drain_search_requests(&mut self) -> Vec<SearchRequest> {
        std::mem::take(&mut self.pending_searches)
    }

    /// Current segment positions for a player's snake, lead first.
    pub fn segment_positions(&self, player: PlayerId) -> Option<Vec<Vec3>> {
        let session = self.sessions.get(player)?;
        Some(read_positions(&self.world, session.snake.segments()))
    }

    /// Start a snake for `player` in `region`, with the lead at `spawn`.
    ///
    /// A random heading is chosen when `direction` is `None`. Apple (and
    /// chaser) placement is queued for the location worker.
    pub fn start_session(
        &mut self,
        player: PlayerId,
        region: &str,
        spawn: GridCell,
        direction: Option<Direction>,
    ) -> Result<u64, GameError> {
        if self.sessions.contains(player) {
            return Err(GameError::SessionAlreadyActive(player));
        }
        let bounds = self
            .regions
            .region(region)
            .ok_or_else(|| GameError::UnknownRegion(region.to_string()))?;
        if !bounds.contains(spawn) {
            return Err(GameError::InvalidConfig(format!(
                "spawn {spawn:?} lies outside region {region}"
            )));
        }

        let direction = direction.unwrap_or_else(|| Direction::random(&mut rand::thread_rng()));
        let position = spawn.center();
        let lead = spawn_segment(&mut self.world, player, 0, position, direction.yaw());

        let id = self.sessions.allocate_id();
        let session = GameSession {
            id,
            player,
            region: region.to_string(),
            snake: Snake::new(lead, MovementController::new(self.settings.movement, direction)),
            apples: Vec::new(),
            chaser: None,
            tick: 0,
            status: PlayerStatus::default(),
        };

        for _ in 0..self.settings.apple_count {
            self.pending_searches
                .push(placement_request(&self.world, &session, SearchKind::Apple));
        }
        if self.settings.chaser.is_some() {
            self.pending_searches
                .push(placement_request(&self.world, &session, SearchKind::Chaser));
        }

        self.sessions.start(session)?;

        let mut out = self.world.resource_mut::<OutgoingEvents>();
        out.events.push(GameEvent::SessionStarted {
            player,
            session_id: id,
            region: region.to_string(),
            direction,
        });
        out.events.push(GameEvent::SegmentSpawned {
            player,
            index: 0,
            position,
        });

        info!("Snake session {id} started for player {player} in {region} heading {direction:?}");
        Ok(id)
    }

    /// End a session on request. Returns the final score.
    pub fn stop_session(&mut self, player: PlayerId) -> Result<u32, GameError> {
        self.end_session(player, EndReason::Stopped)
    }

    /// Update host-side facts about the rider. Checked on the next tick.
    pub fn set_player_status(
        &mut self,
        player: PlayerId,
        status: PlayerStatus,
    ) -> Result<(), GameError> {
        let session = self
            .sessions
            .get_mut(player)
            .ok_or(GameError::SessionNotFound(player))?;
        session.status = status;
        Ok(())
    }

    /// Place an apple directly. Returns `false` when the session already has
    /// its full set of apples or one sits on `cell`.
    pub fn place_apple(&mut self, player: PlayerId, cell: GridCell) -> Result<bool, GameError> {
        let session = self
            .sessions
            .get_mut(player)
            .ok_or(GameError::SessionNotFound(player))?;
        if session.apples.len() >= self.settings.apple_count || session.apples.contains(&cell) {
            return Ok(false);
        }
        session.apples.push(cell);
        self.world
            .resource_mut::<OutgoingEvents>()
            .events
            .push(GameEvent::AppleSpawned { player, cell });
        Ok(true)
    }

    /// Spawn the chasing mob for a session. Returns `false` if chasers are
    /// disabled or the session already has one.
    pub fn spawn_chaser(&mut self, player: PlayerId, cell: GridCell) -> Result<bool, GameError> {
        let Some(settings) = self.settings.chaser else {
            return Ok(false);
        };
        let session = self
            .sessions
            .get_mut(player)
            .ok_or(GameError::SessionNotFound(player))?;
        if session.chaser.is_some() {
            return Ok(false);
        }
        let chaser = Chaser::new(cell, settings);
        let position = chaser.position();
        session.chaser = Some(chaser);
        self.world
            .resource_mut::<OutgoingEvents>()
            .events
            .push(GameEvent::ChaserSpawned { player, position });
        Ok(true)
    }

    /// Apply a finished background search. Results for sessions that have
    /// since ended (or been replaced) are dropped. A location the snake has
    /// moved onto since the search started is refused and the search queued
    /// again. Returns whether anything was placed.
    pub fn apply_search_result(&mut self, result: SearchResult) -> bool {
        if !self.sessions.is_live(result.player, result.session_id) {
            debug!(
                "Dropping {:?} search result for ended session {} of player {}",
                result.kind, result.session_id, result.player
            );
            return false;
        }
        let Some(cell) = result.location else {
            warn!(
                "No {:?} location found for player {}",
                result.kind, result.player
            );
            self.world
                .resource_mut::<OutgoingEvents>()
                .events
                .push(GameEvent::PlacementFailed {
                    player: result.player,
                    kind: result.kind,
                });
            return false;
        };
        if let Some(session) = self.sessions.get(result.player) {
            let body = read_positions(&self.world, session.snake.segments());
            if body.iter().any(|&p| GridCell::containing(p) == cell) {
                debug!(
                    "{:?} location {cell:?} for player {} is under the snake, searching again",
                    result.kind, result.player
                );
                self.pending_searches
                    .push(placement_request(&self.world, session, result.kind));
                return false;
            }
        }
        let placed = match result.kind {
            SearchKind::Apple => self.place_apple(result.player, cell),
            SearchKind::Chaser => self.spawn_chaser(result.player, cell),
        };
        placed.unwrap_or(false)
    }

    /// Run one game tick for every session.
    pub fn tick(&mut self, input: &dyn InputSource) {
        self.world.resource_mut::<TickCounter>().0 += 1;
        let players = self.sessions.players();

        for &player in &players {
            self.step_session(player, input);
        }

        system_physics(&mut self.world, &*self.terrain);

        let mut ended = Vec::new();
        for &player in &players {
            if let Some(reason) = self.resolve_session(player) {
                ended.push((player, reason));
            }
        }
        for (player, reason) in ended {
            if let Err(e) = self.end_session(player, reason) {
                warn!("Failed to end session for player {player}: {e}");
            }
        }
    }

    /// Input and movement: hand each segment its motion for this tick.
    fn step_session(&mut self, player: PlayerId, input: &dyn InputSource) {
        let Some(session) = self.sessions.get_mut(player) else {
            return;
        };
        session.tick += 1;
        if let Some(direction) = input.latest_direction(player) {
            session.snake.controller.set_direction(direction);
        }

        let segments = session.snake.segments().to_vec();
        let positions = read_positions(&self.world, &segments);
        let mut sink = EcsSink {
            world: &mut self.world,
            segments: &segments,
        };
        session.snake.controller.step(&positions, &mut sink);
    }

    /// After physics: chaser, end conditions, apple pickup.
    fn resolve_session(&mut self, player: PlayerId) -> Option<EndReason> {
        let session = self.sessions.get_mut(player)?;
        let positions = read_positions(&self.world, session.snake.segments());
        let &lead = positions.first()?;

        let mut caught = false;
        if let Some(chaser) = session.chaser.as_mut() {
            let before = chaser.position();
            let position = chaser.tick(&*self.terrain, &self.chase_pathfinder, lead);
            caught = chaser.caught(lead);
            if position != before {
                self.world
                    .resource_mut::<OutgoingEvents>()
                    .events
                    .push(GameEvent::ChaserMoved {
                        player,
                        position,
                        yaw: chaser.yaw(),
                    });
            }
        }

        let snapshot =
            CollisionSnapshot::capture(&*self.terrain, &session.snake.controller, &positions, caught);
        if let Some(reason) = evaluate_end_conditions(&snapshot, &session.status) {
            return Some(reason);
        }

        let lead_cell = GridCell::containing(lead);
        if let Some(slot) = session.apples.iter().position(|&a| a == lead_cell) {
            let cell = session.apples.swap_remove(slot);
            session.snake.add_score(1);
            let score = session.snake.score();
            self.world
                .resource_mut::<OutgoingEvents>()
                .events
                .push(GameEvent::AppleEaten { player, cell, score });

            if let Some(position) = session.snake.prepare_growth() {
                let index = session.snake.len();
                let yaw = self
                    .world
                    .get::<Rotation>(session.snake.segments()[index - 1])
                    .map_or(0.0, |r| r.yaw);
                let tail = spawn_segment(&mut self.world, player, index, position, yaw);
                session.snake.attach_tail(tail);
                self.world
                    .resource_mut::<OutgoingEvents>()
                    .events
                    .push(GameEvent::SegmentSpawned {
                        player,
                        index,
                        position,
                    });
            }

            self.pending_searches
                .push(placement_request(&self.world, session, SearchKind::Apple));
        }
        None
    }

    fn end_session(&mut self, player: PlayerId, reason: EndReason) -> Result<u32, GameError> {
        let mut session = self.sessions.stop(player)?;
        session.snake.controller.terminate();
        for &entity in session.snake.segments() {
            self.world.despawn(entity);
        }
        let score = session.snake.score();
        self.world
            .resource_mut::<OutgoingEvents>()
            .events
            .push(GameEvent::SessionEnded {
                player,
                session_id: session.id,
                score,
                reason,
            });
        info!(
            "Snake session {} for player {player} ended after {} ticks: {} (score {score})",
            session.id,
            session.tick,
            reason.message()
        );
        Ok(score)
    }
}

// ---------------------------------------------------------------------------
// ECS helpers
// ---------------------------------------------------------------------------

/// Writes controller motion straight into segment components.
struct EcsSink<'a> {
    world: &'a mut World,
    segments: &'a [Entity],
}

impl SessionSink for EcsSink<'_> {
    fn segment_moved(&mut self, index: usize, motion: SegmentMotion) {
        let Some(&entity) = self.segments.get(index) else {
            return;
        };
        if let Some(mut vel) = self.world.get_mut::<Velocity>(entity) {
            vel.0 = motion.velocity;
        }
        if let Some(mut rot) = self.world.get_mut::<Rotation>(entity) {
            rot.yaw = motion.yaw;
        }
    }
}

fn spawn_segment(
    world: &mut World,
    player: PlayerId,
    index: usize,
    position: Vec3,
    yaw: f32,
) -> Entity {
    world
        .spawn((
            Segment { player, index },
            Position(position),
            Velocity(Vec3::ZERO),
            Rotation { yaw },
            BoundingBox(Hitbox::SEGMENT),
        ))
        .id()
}

fn read_positions(world: &World, segments: &[Entity]) -> Vec<Vec3> {
    segments
        .iter()
        .filter_map(|&e| world.get::<Position>(e).map(|p| p.0))
        .collect()
}

/// Cells a new apple or chaser must avoid: the snake's body, existing apples,
/// and the chaser.
fn placement_request(world: &World, session: &GameSession, kind: SearchKind) -> SearchRequest {
    let positions = read_positions(world, session.snake.segments());
    let mut occupied: Vec<GridCell> = positions.iter().map(|&p| GridCell::containing(p)).collect();
    occupied.extend_from_slice(&session.apples);
    if let Some(chaser) = &session.chaser {
        occupied.push(GridCell::containing(chaser.position()));
    }
    let origin = occupied
        .first()
        .copied()
        .unwrap_or_else(|| GridCell::containing(Vec3::ZERO));
    SearchRequest {
        session_id: session.id,
        player: session.player,
        kind,
        origin,
        region: session.region.clone(),
        occupied,
    }
}

/// Apply each segment's velocity through block collision, then clear it.
fn system_physics<T: mc_snake_world::TerrainQuery + ?Sized>(world: &mut World, terrain: &T) {
    let mut moves = Vec::new();
    let mut query =
        world.query::<(&Segment, &mut Position, &mut Velocity, &Rotation, &BoundingBox)>();
    for (segment, mut pos, mut vel, rot, bb) in query.iter_mut(world) {
        if vel.0 == Vec3::ZERO {
            continue;
        }
        let next = resolve_move(terrain, pos.0, vel.0, bb.0);
        vel.0 = Vec3::ZERO;
        if next != pos.0 {
            pos.0 = next;
            moves.push(GameEvent::SegmentMoved {
                player: segment.player,
                index: segment.index,
                position: next,
                yaw: rot.yaw,
            });
        }
    }
    moves.sort_by_key(|e| match e {
        GameEvent::SegmentMoved { player, index, .. } => (*player, *index),
        _ => (0, 0),
    });
    world.resource_mut::<OutgoingEvents>().events.extend(moves);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputBuffer;
    use crate::movement::FollowMode;
    use mc_snake_world::{BlockGrid, RegionRegistry};

    /// Snake speed of exactly one block per tick.
    fn one_block_per_tick() -> GameSettings {
        GameSettings {
            movement: MovementSettings {
                speed_blocks_per_second: 10.0,
                ticks_per_second: 10.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn world_with(grid: BlockGrid, max: GridCell, settings: GameSettings) -> GameWorld {
        let mut regions = RegionRegistry::new();
        regions
            .register("arena", GridCell::new(0, 64, 0), max)
            .unwrap();
        GameWorld::new(Arc::new(grid), Arc::new(regions), settings).unwrap()
    }

    fn small_arena(settings: GameSettings) -> GameWorld {
        world_with(
            BlockGrid::flat_platform(0, 0, 4, 4, 63),
            GridCell::new(4, 64, 4),
            settings,
        )
    }

    fn ended_reason(events: &[GameEvent]) -> Option<EndReason> {
        events.iter().find_map(|e| match e {
            GameEvent::SessionEnded { reason, .. } => Some(*reason),
            _ => None,
        })
    }

    #[test]
    fn game_world_new() {
        let gw = small_arena(GameSettings::default());
        assert_eq!(gw.current_tick(), 0);
        assert!(gw.sessions().is_empty());
    }

    #[test]
    fn rejects_zero_speed() {
        let settings = GameSettings {
            movement: MovementSettings {
                speed_blocks_per_second: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = GameWorld::new(
            Arc::new(BlockGrid::new()),
            Arc::new(RegionRegistry::new()),
            settings,
        );
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn start_session_spawns_lead_and_queues_apple() {
        let mut gw = small_arena(GameSettings::default());
        let id = gw
            .start_session(1, "arena", GridCell::new(2, 64, 2), Some(Direction::East))
            .unwrap();
        let events = gw.drain_events();
        assert!(matches!(
            events[0],
            GameEvent::SessionStarted { player: 1, session_id, direction: Direction::East, .. } if session_id == id
        ));
        assert_eq!(
            events[1],
            GameEvent::SegmentSpawned {
                player: 1,
                index: 0,
                position: Vec3::new(2.5, 64.0, 2.5)
            }
        );

        let requests = gw.drain_search_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].kind, SearchKind::Apple);
        assert_eq!(requests[0].origin, GridCell::new(2, 64, 2));
        assert_eq!(requests[0].region, "arena");
        assert!(gw.drain_search_requests().is_empty());
    }

    #[test]
    fn unknown_region_fails() {
        let mut gw = small_arena(GameSettings::default());
        let err = gw
            .start_session(1, "lobby", GridCell::new(2, 64, 2), None)
            .unwrap_err();
        assert!(matches!(err, GameError::UnknownRegion(name) if name == "lobby"));
        assert!(gw.sessions().is_empty());
        assert!(gw.drain_search_requests().is_empty());
    }

    #[test]
    fn second_session_for_player_rejected() {
        let mut gw = small_arena(GameSettings::default());
        gw.start_session(1, "arena", GridCell::new(2, 64, 2), None)
            .unwrap();
        let err = gw
            .start_session(1, "arena", GridCell::new(1, 64, 1), None)
            .unwrap_err();
        assert!(matches!(err, GameError::SessionAlreadyActive(1)));
    }

    #[test]
    fn eating_apple_grows_and_scores() {
        let mut gw = small_arena(one_block_per_tick());
        gw.start_session(1, "arena", GridCell::new(2, 64, 2), Some(Direction::East))
            .unwrap();
        gw.drain_search_requests();
        assert!(gw.place_apple(1, GridCell::new(4, 64, 2)).unwrap());
        gw.drain_events();

        let input = InputBuffer::new();
        gw.tick(&input);
        assert_eq!(
            gw.segment_positions(1).unwrap(),
            vec![Vec3::new(3.5, 64.0, 2.5)]
        );

        gw.tick(&input);
        let events = gw.drain_events();
        assert!(events.contains(&GameEvent::AppleEaten {
            player: 1,
            cell: GridCell::new(4, 64, 2),
            score: 1
        }));
        assert!(events.contains(&GameEvent::SegmentSpawned {
            player: 1,
            index: 1,
            position: Vec3::new(3.5, 64.0, 2.5)
        }));
        assert_eq!(
            gw.segment_positions(1).unwrap(),
            vec![Vec3::new(4.5, 64.0, 2.5), Vec3::new(3.5, 64.0, 2.5)]
        );

        let session = gw.session(1).unwrap();
        assert_eq!(session.snake.score(), 1);
        assert!(session.apples.is_empty());
        assert_eq!(session.snake.controller.segment_count(), 1);

        let requests = gw.drain_search_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].occupied.contains(&GridCell::new(4, 64, 2)));
        assert!(requests[0].occupied.contains(&GridCell::new(3, 64, 2)));
    }

    #[test]
    fn leaving_platform_ends_session() {
        let mut gw = small_arena(one_block_per_tick());
        gw.start_session(1, "arena", GridCell::new(3, 64, 2), Some(Direction::East))
            .unwrap();
        let input = InputBuffer::new();
        gw.tick(&input);
        assert!(gw.session(1).is_some());
        gw.tick(&input);
        let events = gw.drain_events();
        assert_eq!(ended_reason(&events), Some(EndReason::FellOffArena));
        assert!(gw.session(1).is_none());
        assert!(gw.segment_positions(1).is_none());
        assert_eq!(gw.world.query::<&Segment>().iter(&gw.world).count(), 0);
    }

    #[test]
    fn wall_ends_session() {
        let mut grid = BlockGrid::flat_platform(0, 0, 6, 6, 63);
        grid.wall_ring(0, 0, 6, 6, 64);
        let mut gw = world_with(grid, GridCell::new(6, 64, 6), one_block_per_tick());
        gw.start_session(1, "arena", GridCell::new(4, 64, 3), Some(Direction::East))
            .unwrap();
        let input = InputBuffer::new();
        gw.tick(&input);
        assert!(gw.session(1).is_some());
        gw.tick(&input);
        let events = gw.drain_events();
        assert_eq!(ended_reason(&events), Some(EndReason::WallCollision));
    }

    #[test]
    fn input_turns_snake() {
        let mut gw = small_arena(one_block_per_tick());
        gw.start_session(1, "arena", GridCell::new(2, 64, 1), Some(Direction::East))
            .unwrap();
        gw.drain_events();
        let mut input = InputBuffer::new();
        input.record_steer(1, 1.0, 0.0);
        gw.tick(&input);
        assert_eq!(
            gw.segment_positions(1).unwrap(),
            vec![Vec3::new(2.5, 64.0, 2.5)]
        );
        let events = gw.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::SegmentMoved { player: 1, index: 0, yaw, .. } if yaw.abs() < 1e-3
        )));
    }

    #[test]
    fn dismount_ends_on_next_tick() {
        let mut gw = small_arena(GameSettings::default());
        gw.start_session(1, "arena", GridCell::new(2, 64, 2), None)
            .unwrap();
        gw.set_player_status(
            1,
            PlayerStatus {
                mounted: false,
                ..Default::default()
            },
        )
        .unwrap();
        gw.tick(&InputBuffer::new());
        assert_eq!(ended_reason(&gw.drain_events()), Some(EndReason::Dismounted));
        assert!(matches!(
            gw.set_player_status(1, PlayerStatus::default()),
            Err(GameError::SessionNotFound(1))
        ));
    }

    #[test]
    fn stop_session_reports_score() {
        let mut gw = small_arena(GameSettings::default());
        gw.start_session(3, "arena", GridCell::new(2, 64, 2), None)
            .unwrap();
        assert_eq!(gw.stop_session(3).unwrap(), 0);
        assert_eq!(ended_reason(&gw.drain_events()), Some(EndReason::Stopped));
        assert!(matches!(gw.stop_session(3), Err(GameError::SessionNotFound(3))));
    }

    #[test]
    fn stale_search_result_dropped() {
        let mut gw = small_arena(GameSettings::default());
        let old = gw
            .start_session(1, "arena", GridCell::new(2, 64, 2), None)
            .unwrap();
        gw.stop_session(1).unwrap();
        gw.start_session(1, "arena", GridCell::new(2, 64, 2), None)
            .unwrap();
        gw.drain_events();

        let stale = SearchResult {
            session_id: old,
            player: 1,
            kind: SearchKind::Apple,
            location: Some(GridCell::new(1, 64, 1)),
        };
        assert!(!gw.apply_search_result(stale));
        assert!(gw.session(1).unwrap().apples.is_empty());
        assert!(gw.drain_events().is_empty());
    }

    #[test]
    fn search_result_places_apple_once() {
        let mut gw = small_arena(GameSettings::default());
        let id = gw
            .start_session(1, "arena", GridCell::new(2, 64, 2), None)
            .unwrap();
        gw.drain_events();
        let result = |cell| SearchResult {
            session_id: id,
            player: 1,
            kind: SearchKind::Apple,
            location: Some(cell),
        };
        assert!(gw.apply_search_result(result(GridCell::new(1, 64, 1))));
        // apple_count is 1
        assert!(!gw.apply_search_result(result(GridCell::new(3, 64, 3))));
        assert_eq!(
            gw.drain_events(),
            vec![GameEvent::AppleSpawned {
                player: 1,
                cell: GridCell::new(1, 64, 1)
            }]
        );
    }

    #[test]
    fn failed_search_surfaces_event() {
        let mut gw = small_arena(GameSettings::default());
        let id = gw
            .start_session(1, "arena", GridCell::new(2, 64, 2), None)
            .unwrap();
        gw.drain_events();
        let placed = gw.apply_search_result(SearchResult {
            session_id: id,
            player: 1,
            kind: SearchKind::Apple,
            location: None,
        });
        assert!(!placed);
        assert_eq!(
            gw.drain_events(),
            vec![GameEvent::PlacementFailed {
                player: 1,
                kind: SearchKind::Apple
            }]
        );
    }

    #[test]
    fn chaser_catches_snake() {
        let settings = GameSettings {
            chaser: Some(ChaserSettings::default()),
            ..Default::default()
        };
        let mut gw = world_with(
            BlockGrid::flat_platform(0, 0, 9, 9, 63),
            GridCell::new(9, 64, 9),
            settings,
        );
        let id = gw
            .start_session(1, "arena", GridCell::new(2, 64, 2), Some(Direction::East))
            .unwrap();
        let kinds: Vec<_> = gw.drain_search_requests().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![SearchKind::Apple, SearchKind::Chaser]);

        assert!(gw.apply_search_result(SearchResult {
            session_id: id,
            player: 1,
            kind: SearchKind::Chaser,
            location: Some(GridCell::new(3, 64, 2)),
        }));
        gw.tick(&InputBuffer::new());
        assert_eq!(
            ended_reason(&gw.drain_events()),
            Some(EndReason::CaughtByChaser)
        );
    }

    #[test]
    fn search_result_under_snake_is_requeued() {
        let mut gw = small_arena(one_block_per_tick());
        let id = gw
            .start_session(1, "arena", GridCell::new(1, 64, 2), Some(Direction::East))
            .unwrap();
        gw.drain_search_requests();
        gw.tick(&InputBuffer::new());
        gw.drain_events();

        // Searched while the cell was free; the lead has since moved onto it.
        let placed = gw.apply_search_result(SearchResult {
            session_id: id,
            player: 1,
            kind: SearchKind::Apple,
            location: Some(GridCell::new(2, 64, 2)),
        });
        assert!(!placed);
        assert!(gw.session(1).unwrap().apples.is_empty());
        assert!(gw.drain_events().is_empty());

        let requests = gw.drain_search_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].kind, SearchKind::Apple);
        assert_eq!(requests[0].session_id, id);
        assert!(requests[0].occupied.contains(&GridCell::new(2, 64, 2)));
    }

    #[test]
    fn slow_snake_survives_first_growth() {
        let settings = GameSettings {
            movement: MovementSettings {
                speed_blocks_per_second: 0.4,
                ticks_per_second: 10.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut gw = small_arena(settings);
        gw.start_session(1, "arena", GridCell::new(2, 64, 2), Some(Direction::East))
            .unwrap();
        assert!(gw.place_apple(1, GridCell::new(3, 64, 2)).unwrap());
        gw.drain_events();

        let input = InputBuffer::new();
        let mut events = Vec::new();
        for _ in 0..40 {
            gw.tick(&input);
            events.extend(gw.drain_events());
        }
        assert!(events.iter().any(|e| matches!(e, GameEvent::AppleEaten { player: 1, .. })));
        assert_eq!(ended_reason(&events), None);
        assert_eq!(gw.session(1).unwrap().snake.len(), 2);
    }

    /// Eat eight apples in a row, then steer south, west and north so the lead
    /// comes back onto its own body.
    fn loop_back_into_body(follow_mode: FollowMode) -> (Vec<GameEvent>, Vec<GameEvent>) {
        let mut settings = one_block_per_tick();
        settings.movement.follow_mode = follow_mode;
        settings.apple_count = 8;
        let mut gw = world_with(
            BlockGrid::flat_platform(0, 0, 19, 19, 63),
            GridCell::new(19, 64, 19),
            settings,
        );
        gw.start_session(1, "arena", GridCell::new(1, 64, 2), Some(Direction::East))
            .unwrap();
        for x in 2..=9 {
            assert!(gw.place_apple(1, GridCell::new(x, 64, 2)).unwrap());
        }
        gw.drain_events();

        let mut input = InputBuffer::new();
        let mut straight = Vec::new();
        for _ in 0..12 {
            gw.tick(&input);
            straight.extend(gw.drain_events());
        }

        let mut looped = Vec::new();
        for dir in [Direction::South, Direction::West, Direction::North] {
            input.set(1, dir);
            gw.tick(&input);
            looped.extend(gw.drain_events());
        }
        (straight, looped)
    }

    #[test]
    fn turning_back_into_body_ends_session() {
        for mode in [FollowMode::Deferred, FollowMode::Immediate] {
            let (straight, looped) = loop_back_into_body(mode);
            let eaten = straight
                .iter()
                .filter(|e| matches!(e, GameEvent::AppleEaten { .. }))
                .count();
            assert_eq!(eaten, 8, "{mode:?}");
            assert_eq!(ended_reason(&straight), None, "{mode:?}");
            assert_eq!(ended_reason(&looped), Some(EndReason::SelfCollision), "{mode:?}");
        }
    }

    #[test]
    fn chaser_disabled_by_default() {
        let mut gw = small_arena(GameSettings::default());
        gw.start_session(1, "arena", GridCell::new(2, 64, 2), None)
            .unwrap();
        assert!(!gw.spawn_chaser(1, GridCell::new(0, 64, 0)).unwrap());
    }

    #[test]
    fn tick_counter_advances() {
        let mut gw = small_arena(GameSettings::default());
        let input = InputBuffer::new();
        gw.tick(&input);
        gw.tick(&input);
        assert_eq!(gw.current_tick(), 2);
    }
}
