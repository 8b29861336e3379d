//! Error taxonomy shared by the ledger, the event handlers, and the
//! client-facing actions.

use crate::data::UnitType;
use crate::model::Resources;

/// Result alias used throughout the crate.
pub type GameResult<T> = Result<T, GameError>;

/// Everything that can go wrong while acting on the world.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("insufficient resources: need {needed}, have {available}")]
    InsufficientResources {
        needed: Resources,
        available: Resources,
    },

    #[error("insufficient troops: requested {requested} {unit:?}, have {available}")]
    InsufficientTroops {
        unit: UnitType,
        requested: u32,
        available: u32,
    },

    #[error("storage unavailable: {0}")]
    TransientStore(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("build queue is full")]
    QueueFull,

    #[error("structure is already at its maximum level")]
    MaxLevel,

    #[error("invalid order: {0}")]
    InvalidOrder(String),
}

impl GameError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        GameError::NotFound { entity, id }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        GameError::InvalidOrder(reason.into())
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        GameError::InvariantViolation(reason.into())
    }

    /// True for failures that may succeed if the same work is attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GameError::TransientStore(_))
    }
}
