//! Bracket Progression - multi-bracket tournament engine
//!
//! This crate validates organizer-authored progression graphs, materializes
//! the teams of every bracket from a tournament snapshot, aggregates
//! per-bracket results into one ranking and updates Bayesian skill ratings
//! from finished matches.

pub mod config;
pub mod engine;
pub mod error;
pub mod progression;
pub mod rating;
pub mod standings;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{EngineError, Result};
pub use types::*;

// Re-export key components
pub use engine::{Bracket, BracketGenerator, StandardBracketGenerator, Tournament, TournamentEngine};
pub use progression::{ProgressionError, ValidationError};
pub use rating::{InMemoryRatingStorage, RatingStorage, RatingUpdater, TournamentSummary};
pub use standings::{calculate_spr, tournament_standings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
