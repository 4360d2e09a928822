//! Rating storage interface and implementations
//!
//! The updater reads current ratings before a run and hands the finished
//! summary back to the storage in one call.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::rating::summarizer::{
    PlayerRelation, PlayerResultDelta, SeedingSkillType, TournamentResultRow, TournamentSummary,
};
use crate::types::{Rating, UserId};

/// Stored rating with the number of sets it is based on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    #[serde(flatten)]
    pub rating: Rating,
    pub matches_count: u32,
}

/// Map win-loss record of one player on one stage and mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
}

/// Head-to-head record between two players
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadToHead {
    pub map_wins: u32,
    pub map_losses: u32,
    pub set_wins: u32,
    pub set_losses: u32,
}

/// Trait for rating storage operations
pub trait RatingStorage: Send + Sync {
    /// Current individual rating, `None` for unrated players
    fn user_rating(&self, user_id: UserId) -> Result<Option<Rating>>;

    /// Current rating of a roster identifier
    fn team_rating(&self, identifier: &str) -> Result<Option<Rating>>;

    /// Current seeding rating of a player
    fn seeding_rating(&self, user_id: UserId, kind: SeedingSkillType) -> Result<Option<Rating>>;

    /// Persist a finished run: ratings replaced, counters added, placement rows appended
    fn store_summary(&self, summary: &TournamentSummary) -> Result<()>;
}

/// Persisted form of [`InMemoryRatingStorage`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSnapshot {
    #[serde(default)]
    pub users: HashMap<UserId, SkillEntry>,
    #[serde(default)]
    pub teams: HashMap<String, SkillEntry>,
    #[serde(default)]
    pub ranked_seeding: HashMap<UserId, Rating>,
    #[serde(default)]
    pub unranked_seeding: HashMap<UserId, Rating>,
}

#[derive(Debug, Default)]
struct StoredState {
    ratings: RatingSnapshot,
    map_results: HashMap<(UserId, u32, String), WinLoss>,
    player_results: HashMap<(UserId, UserId, PlayerRelation), HeadToHead>,
    tournament_results: Vec<TournamentResultRow>,
}

/// In-memory rating storage implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStorage {
    state: RwLock<StoredState>,
}

impl InMemoryRatingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage preloaded with existing ratings
    pub fn from_snapshot(ratings: RatingSnapshot) -> Self {
        Self {
            state: RwLock::new(StoredState {
                ratings,
                ..StoredState::default()
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoredState>> {
        self.state.read().map_err(|_| {
            EngineError::StorageError {
                message: "Failed to acquire ratings read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoredState>> {
        self.state.write().map_err(|_| {
            EngineError::StorageError {
                message: "Failed to acquire ratings write lock".to_string(),
            }
            .into()
        })
    }

    /// Copy of the stored ratings
    pub fn snapshot(&self) -> Result<RatingSnapshot> {
        Ok(self.read()?.ratings.clone())
    }

    pub fn user_skill(&self, user_id: UserId) -> Result<Option<SkillEntry>> {
        Ok(self.read()?.ratings.users.get(&user_id).copied())
    }

    pub fn team_skill(&self, identifier: &str) -> Result<Option<SkillEntry>> {
        Ok(self.read()?.ratings.teams.get(identifier).copied())
    }

    pub fn map_result(&self, user_id: UserId, stage_id: u32, mode: &str) -> Result<WinLoss> {
        Ok(self
            .read()?
            .map_results
            .get(&(user_id, stage_id, mode.to_string()))
            .copied()
            .unwrap_or_default())
    }

    pub fn player_result(
        &self,
        owner_user_id: UserId,
        other_user_id: UserId,
        relation: PlayerRelation,
    ) -> Result<HeadToHead> {
        Ok(self
            .read()?
            .player_results
            .get(&(owner_user_id, other_user_id, relation))
            .copied()
            .unwrap_or_default())
    }

    pub fn tournament_results(&self) -> Result<Vec<TournamentResultRow>> {
        Ok(self.read()?.tournament_results.clone())
    }
}

fn add_skill<K: Hash + Eq>(
    entries: &mut HashMap<K, SkillEntry>,
    key: K,
    rating: Rating,
    matches_count: u32,
) {
    let entry = entries.entry(key).or_insert(SkillEntry {
        rating,
        matches_count: 0,
    });
    entry.rating = rating;
    entry.matches_count += matches_count;
}

impl RatingStorage for InMemoryRatingStorage {
    fn user_rating(&self, user_id: UserId) -> Result<Option<Rating>> {
        Ok(self.read()?.ratings.users.get(&user_id).map(|entry| entry.rating))
    }

    fn team_rating(&self, identifier: &str) -> Result<Option<Rating>> {
        Ok(self
            .read()?
            .ratings
            .teams
            .get(identifier)
            .map(|entry| entry.rating))
    }

    fn seeding_rating(&self, user_id: UserId, kind: SeedingSkillType) -> Result<Option<Rating>> {
        let state = self.read()?;
        let seeding = match kind {
            SeedingSkillType::Ranked => &state.ratings.ranked_seeding,
            SeedingSkillType::Unranked => &state.ratings.unranked_seeding,
        };
        Ok(seeding.get(&user_id).copied())
    }

    fn store_summary(&self, summary: &TournamentSummary) -> Result<()> {
        let mut state = self.write()?;
        let StoredState {
            ratings,
            map_results,
            player_results,
            tournament_results,
        } = &mut *state;

        for skill in &summary.skills {
            let rating = Rating {
                mu: skill.mu,
                sigma: skill.sigma,
            };
            match (skill.user_id, &skill.identifier) {
                (Some(user_id), _) => {
                    add_skill(&mut ratings.users, user_id, rating, skill.matches_count)
                }
                (None, Some(identifier)) => {
                    add_skill(&mut ratings.teams, identifier.clone(), rating, skill.matches_count)
                }
                (None, None) => {}
            }
        }

        for skill in &summary.seeding_skills {
            let seeding = match skill.kind {
                SeedingSkillType::Ranked => &mut ratings.ranked_seeding,
                SeedingSkillType::Unranked => &mut ratings.unranked_seeding,
            };
            seeding.insert(
                skill.user_id,
                Rating {
                    mu: skill.mu,
                    sigma: skill.sigma,
                },
            );
        }

        for delta in &summary.map_result_deltas {
            let record = map_results
                .entry((delta.user_id, delta.stage_id, delta.mode.clone()))
                .or_default();
            record.wins += delta.wins;
            record.losses += delta.losses;
        }

        for PlayerResultDelta {
            owner_user_id,
            other_user_id,
            relation,
            map_wins,
            map_losses,
            set_wins,
            set_losses,
        } in &summary.player_result_deltas
        {
            let record = player_results
                .entry((*owner_user_id, *other_user_id, *relation))
                .or_default();
            record.map_wins += map_wins;
            record.map_losses += map_losses;
            record.set_wins += set_wins;
            record.set_losses += set_losses;
        }

        tournament_results.extend(summary.tournament_results.iter().cloned());

        debug!(
            "Stored {} skills and {} placement rows",
            summary.skills.len(),
            summary.tournament_results.len()
        );

        Ok(())
    }
}
