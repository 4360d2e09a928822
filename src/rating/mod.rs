//! Rating system integration using Weng-Lin (OpenSkill) algorithm
//!
//! This module turns the finished matches of a tournament into updated
//! individual, team and seeding ratings plus the statistics persisted with
//! them.

pub mod storage;
pub mod summarizer;
pub mod weng_lin;

// Re-export commonly used types
pub use storage::{InMemoryRatingStorage, RatingSnapshot, RatingStorage, SkillEntry};
pub use summarizer::{
    identifier_to_user_ids, user_ids_to_identifier, PlayerRelation, RatingUpdater, SeedingSkill,
    SeedingSkillType, SummaryInput, TournamentSummary,
};
pub use weng_lin::WengLinRater;
