//! World-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error("region {name} has inverted corners: min {min:?} > max {max:?}")]
    InvertedRegion {
        name: String,
        min: (i32, i32, i32),
        max: (i32, i32, i32),
    },

    #[error("region already registered: {0}")]
    DuplicateRegion(String),
}
