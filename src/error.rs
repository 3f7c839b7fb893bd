//! Fatal simulation errors
//!
//! Entity-level anomalies never surface here; they are no-ops handled where
//! they occur. These variants stop the current operation because continuing
//! would leave match state inconsistent.

use thiserror::Error;

use crate::sim::EntityId;

#[derive(Debug, Error)]
pub enum SimError {
    /// Rejection sampling could not fit an encounter into the arena
    #[error(
        "ran out of space for an encounter of radius {radius} after {attempts} attempts; \
         is the arena too small or the encounter too big?"
    )]
    EncounterSpaceExhausted { radius: f32, attempts: u32 },

    /// A kill was attributed to (or against) something that is not a tracked player
    #[error("kill attribution between non-players: killer {killer:?}, victim {victim:?}")]
    KillAttribution { killer: EntityId, victim: EntityId },

    /// Tuning value rejected by validation
    #[error("invalid tuning value '{field}': {reason}")]
    InvalidTuning {
        field: &'static str,
        reason: &'static str,
    },

    #[error("failed to parse tuning: {0}")]
    TuningParse(#[from] serde_json::Error),

    #[error("failed to read tuning: {0}")]
    TuningIo(#[from] std::io::Error),
}

/// Convenience alias: a `Result` using `SimError` as the error type.
pub type SimResult<T> = Result<T, SimError>;
