//! Game-level errors.

use thiserror::Error;

use crate::session::PlayerId;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no active session for player {0}")]
    SessionNotFound(PlayerId),

    #[error("player {0} already has an active session")]
    SessionAlreadyActive(PlayerId),
}
