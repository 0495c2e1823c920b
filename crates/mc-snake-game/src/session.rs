//! Per-player game sessions.

use std::collections::HashMap;

use mc_snake_world::GridCell;

use crate::chaser::Chaser;
use crate::collision::PlayerStatus;
use crate::error::GameError;
use crate::snake::Snake;

/// Host-assigned player identity.
pub type PlayerId = u64;

pub struct GameSession {
    /// Unique for the lifetime of the registry; stale background results are
    /// matched against it.
    pub id: u64,
    pub player: PlayerId,
    pub region: String,
    pub snake: Snake,
    pub apples: Vec<GridCell>,
    pub chaser: Option<Chaser>,
    /// Ticks this session has been running.
    pub tick: u64,
    pub status: PlayerStatus,
}

/// Active sessions, at most one per player.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<PlayerId, GameSession>,
    next_id: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a session about to be started.
    pub fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn start(&mut self, session: GameSession) -> Result<(), GameError> {
        if self.sessions.contains_key(&session.player) {
            return Err(GameError::SessionAlreadyActive(session.player));
        }
        self.sessions.insert(session.player, session);
        Ok(())
    }

    /// Remove and return the player's session.
    pub fn stop(&mut self, player: PlayerId) -> Result<GameSession, GameError> {
        self.sessions
            .remove(&player)
            .ok_or(GameError::SessionNotFound(player))
    }

    pub fn get(&self, player: PlayerId) -> Option<&GameSession> {
        self.sessions.get(&player)
    }

    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut GameSession> {
        self.sessions.get_mut(&player)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.sessions.contains_key(&player)
    }

    /// The player still runs the session identified by `session_id`.
    pub fn is_live(&self, player: PlayerId, session_id: u64) -> bool {
        self.sessions
            .get(&player)
            .is_some_and(|s| s.id == session_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameSession> {
        self.sessions.values()
    }

    /// Players with a session, in ascending order.
    pub fn players(&self) -> Vec<PlayerId> {
        let mut players: Vec<_> = self.sessions.keys().copied().collect();
        players.sort_unstable();
        players
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
