//! Error types for the tournament engine
//!
//! Runtime invariant violations are `EngineError`s carried through
//! `anyhow::Result`. Progression validation failures are plain values and
//! live in [`crate::progression::ValidationError`].

use crate::types::{BracketIdx, TeamId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Errors raised when a snapshot or batch input is internally inconsistent
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Team not found: {team_id}")]
    TeamNotFound { team_id: TeamId },

    #[error("Bracket not found: {bracket_idx}")]
    BracketNotFound { bracket_idx: BracketIdx },

    #[error("Bracket {bracket_idx} sources from missing bracket {source_bracket_idx}")]
    SourceBracketMissing {
        bracket_idx: BracketIdx,
        source_bracket_idx: BracketIdx,
    },

    #[error("Match {match_id} has no winner")]
    UnresolvedMatch { match_id: i64 },

    #[error("Rating calculation failed: {reason}")]
    RatingCalculationFailed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Rating storage error: {message}")]
    StorageError { message: String },
}
