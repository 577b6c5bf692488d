//! Error types for level mutation, coordinate transforms and configuration

use thiserror::Error;

use crate::entity::EntityId;
use crate::world::Phase;

/// Errors raised by [`crate::world::Level`] mutations.
///
/// `PhaseViolation` signals a reentrancy bug in calling code: the operation is
/// aborted and the level is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("{operation} is not allowed during the {phase:?} phase")]
    PhaseViolation {
        operation: &'static str,
        phase: Phase,
    },

    #[error("{0} is already owned by this level")]
    DuplicateEntity(EntityId),

    #[error("{0} is not owned by this level")]
    UnknownEntity(EntityId),
}

/// Errors raised by camera/screen transforms.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    #[error("screen transforms are unavailable on a server level")]
    ServerMode,
}

/// Errors raised while loading or saving a [`crate::config::LevelConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse level config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to serialize level config: {0}")]
    Serialize(#[from] ron::Error),

    #[error("invalid level config: {0}")]
    Invalid(String),
}
