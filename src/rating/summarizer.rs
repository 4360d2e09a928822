//! Post-tournament rating run
//!
//! Replays the finished matches of one tournament in order and produces
//! everything that is persisted afterwards: new individual and team skills,
//! seeding skills, stage/mode records, head-to-head records and placement
//! rows.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RatingConfig;
use crate::error::{EngineError, Result};
use crate::rating::storage::RatingStorage;
use crate::rating::weng_lin::{average_rating, WengLinRater};
use crate::types::{
    FinishedMatch, MapParticipant, MatchOutcome, Rating, Standing, TeamId, TournamentTeam, UserId,
};

/// Updated rating of a player (`user_id`) or a roster (`identifier`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub user_id: Option<UserId>,
    pub identifier: Option<String>,
    pub mu: f64,
    pub sigma: f64,
    /// Sets played in this run
    pub matches_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeedingSkillType {
    Ranked,
    Unranked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedingSkill {
    pub user_id: UserId,
    pub mu: f64,
    pub sigma: f64,
    pub ordinal: f64,
    #[serde(rename = "type")]
    pub kind: SeedingSkillType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResultDelta {
    pub user_id: UserId,
    pub stage_id: u32,
    pub mode: String,
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRelation {
    Mate,
    Enemy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResultDelta {
    pub owner_user_id: UserId,
    pub other_user_id: UserId,
    #[serde(rename = "type")]
    pub relation: PlayerRelation,
    pub map_wins: u32,
    pub map_losses: u32,
    pub set_wins: u32,
    pub set_losses: u32,
}

/// Final placement of one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentResultRow {
    pub user_id: UserId,
    pub tournament_team_id: TeamId,
    pub placement: u32,
    pub participant_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSummary {
    pub skills: Vec<Skill>,
    pub seeding_skills: Vec<SeedingSkill>,
    pub map_result_deltas: Vec<MapResultDelta>,
    pub player_result_deltas: Vec<PlayerResultDelta>,
    pub tournament_results: Vec<TournamentResultRow>,
}

/// Everything one rating run reads
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    /// Chronological
    pub results: &'a [FinishedMatch],
    pub teams: &'a [TournamentTeam],
    /// Best first
    pub final_standings: &'a [Standing],
    /// Seeding rating pool updated by this tournament, if any
    pub seeding_skill_counts_for: Option<SeedingSkillType>,
    pub calculate_seasonal_stats: bool,
}

/// Canonical roster identifier: sorted user ids joined with `-`
pub fn user_ids_to_identifier(user_ids: &[UserId]) -> String {
    let mut sorted = user_ids.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn identifier_to_user_ids(identifier: &str) -> Vec<UserId> {
    identifier
        .split('-')
        .filter_map(|id| id.parse().ok())
        .collect()
}

/// Most frequent item; ties are broken uniformly at random
fn select_most_popular<R: Rng>(items: &[String], rng: &mut R) -> Option<String> {
    let mut counts: Vec<(&String, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(existing, _)| *existing == item) {
            Some((_, count)) => *count += 1,
            None => counts.push((item, 1)),
        }
    }

    let most_popular_count = counts.iter().map(|(_, count)| *count).max()?;
    let most_popular: Vec<&String> = counts
        .into_iter()
        .filter(|(_, count)| *count == most_popular_count)
        .map(|(item, _)| item)
        .collect();

    if most_popular.len() > 1 {
        debug!("Picking randomly between {} rosters", most_popular.len());
    }
    most_popular.choose(rng).map(|item| (*item).clone())
}

fn unique_user_ids<'a>(participants: impl Iterator<Item = &'a MapParticipant>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    participants
        .map(|p| p.user_id)
        .filter(|user_id| seen.insert(*user_id))
        .collect()
}

fn winner_of(result: &FinishedMatch) -> Result<TeamId> {
    result.winner_team_id().ok_or_else(|| {
        EngineError::UnresolvedMatch {
            match_id: result.match_id,
        }
        .into()
    })
}

/// Runs the post-tournament rating pass against a [`RatingStorage`]
pub struct RatingUpdater<R: Rng = StdRng> {
    rater: WengLinRater,
    storage: Arc<dyn RatingStorage>,
    rng: R,
}

impl RatingUpdater<StdRng> {
    pub fn new(config: RatingConfig, storage: Arc<dyn RatingStorage>) -> Result<Self> {
        Self::with_rng(config, storage, StdRng::from_entropy())
    }
}

impl<R: Rng> RatingUpdater<R> {
    /// Updater with a caller-provided source for roster tie-breaks
    pub fn with_rng(config: RatingConfig, storage: Arc<dyn RatingStorage>, rng: R) -> Result<Self> {
        Ok(Self {
            rater: WengLinRater::new(config)?,
            storage,
            rng,
        })
    }

    pub fn summarize(&mut self, input: &SummaryInput<'_>) -> Result<TournamentSummary> {
        for result in input.results {
            winner_of(result)?;
        }

        let mut summary = TournamentSummary::default();

        if input.calculate_seasonal_stats {
            summary.skills = self.individual_skills(input.results, |storage, user_id| {
                storage.user_rating(user_id)
            })?;
            summary.skills.extend(self.team_skills(input.results)?);
        }

        if let Some(kind) = input.seeding_skill_counts_for {
            summary.seeding_skills = self
                .individual_skills(input.results, |storage, user_id| {
                    storage.seeding_rating(user_id, kind)
                })?
                .into_iter()
                .filter_map(|skill| {
                    let rating = Rating {
                        mu: skill.mu,
                        sigma: skill.sigma,
                    };
                    Some(SeedingSkill {
                        user_id: skill.user_id?,
                        mu: skill.mu,
                        sigma: skill.sigma,
                        ordinal: self.rater.ordinal(&rating),
                        kind,
                    })
                })
                .collect();
        }

        if input.calculate_seasonal_stats {
            summary.map_result_deltas = map_result_deltas(input.results);
            summary.player_result_deltas = self.player_result_deltas(input.results)?;
        }

        summary.tournament_results = tournament_results(input.teams, input.final_standings)?;

        info!(
            "Summarized {} matches: {} skills, {} seeding skills, {} placement rows",
            input.results.len(),
            summary.skills.len(),
            summary.seeding_skills.len(),
            summary.tournament_results.len()
        );

        Ok(summary)
    }

    /// Sequential individual updates. `current` reads the stored rating of
    /// players not touched yet in this run.
    fn individual_skills<F>(&self, results: &[FinishedMatch], current: F) -> Result<Vec<Skill>>
    where
        F: Fn(&dyn RatingStorage, UserId) -> Result<Option<Rating>>,
    {
        let mut ratings: BTreeMap<UserId, Rating> = BTreeMap::new();
        let mut matches_count: HashMap<UserId, u32> = HashMap::new();

        for result in results {
            let winner_team_id = winner_of(result)?;
            let participants = || result.maps.iter().flat_map(|map| map.participants.iter());

            let winners = unique_user_ids(
                participants().filter(|p| p.tournament_team_id == winner_team_id),
            );
            let losers = unique_user_ids(
                participants().filter(|p| p.tournament_team_id != winner_team_id),
            );

            let rating_of = |user_id: UserId| -> Result<Rating> {
                if let Some(rating) = ratings.get(&user_id) {
                    return Ok(*rating);
                }
                Ok(current(self.storage.as_ref(), user_id)?
                    .unwrap_or_else(|| self.rater.default_rating()))
            };
            let winner_ratings = winners
                .iter()
                .map(|user_id| rating_of(*user_id))
                .collect::<Result<Vec<_>>>()?;
            let loser_ratings = losers
                .iter()
                .map(|user_id| rating_of(*user_id))
                .collect::<Result<Vec<_>>>()?;

            let (rated_winners, rated_losers) = self.rater.rate(&winner_ratings, &loser_ratings)?;

            for (user_id, rating) in winners
                .iter()
                .zip(rated_winners)
                .chain(losers.iter().zip(rated_losers))
            {
                ratings.insert(*user_id, rating);
                *matches_count.entry(*user_id).or_default() += 1;
            }
        }

        Ok(ratings
            .into_iter()
            .map(|(user_id, rating)| Skill {
                user_id: Some(user_id),
                identifier: None,
                mu: rating.mu,
                sigma: rating.sigma,
                matches_count: matches_count.get(&user_id).copied().unwrap_or_default(),
            })
            .collect())
    }

    fn team_skills(&mut self, results: &[FinishedMatch]) -> Result<Vec<Skill>> {
        let mut ratings: BTreeMap<String, Rating> = BTreeMap::new();
        let mut matches_count: HashMap<String, u32> = HashMap::new();

        for result in results {
            let winner_team_id = winner_of(result)?;

            let winner_identifier =
                self.most_popular_roster(result, |team_id| team_id == winner_team_id)?;
            let loser_identifier =
                self.most_popular_roster(result, |team_id| team_id != winner_team_id)?;

            let winner_rating = self.team_rating(&ratings, &winner_identifier)?;
            let loser_rating = self.team_rating(&ratings, &loser_identifier)?;
            let (rated_winner, rated_loser) = self.rater.rate_conservative(
                winner_rating,
                loser_rating,
                self.team_player_rating_average(&winner_identifier)?,
                self.team_player_rating_average(&loser_identifier)?,
            )?;

            ratings.insert(winner_identifier.clone(), rated_winner);
            ratings.insert(loser_identifier.clone(), rated_loser);
            *matches_count.entry(winner_identifier).or_default() += 1;
            *matches_count.entry(loser_identifier).or_default() += 1;
        }

        Ok(ratings
            .into_iter()
            .map(|(identifier, rating)| Skill {
                user_id: None,
                matches_count: matches_count.get(&identifier).copied().unwrap_or_default(),
                identifier: Some(identifier),
                mu: rating.mu,
                sigma: rating.sigma,
            })
            .collect())
    }

    fn team_rating(&self, ratings: &BTreeMap<String, Rating>, identifier: &str) -> Result<Rating> {
        if let Some(rating) = ratings.get(identifier) {
            return Ok(*rating);
        }
        Ok(self
            .storage
            .team_rating(identifier)?
            .unwrap_or_else(|| self.rater.default_rating()))
    }

    /// Mean of the stored individual ratings of a roster
    fn team_player_rating_average(&self, identifier: &str) -> Result<Rating> {
        let ratings = identifier_to_user_ids(identifier)
            .into_iter()
            .map(|user_id| {
                Ok(self
                    .storage
                    .user_rating(user_id)?
                    .unwrap_or_else(|| self.rater.default_rating()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(average_rating(&ratings).unwrap_or_else(|| self.rater.default_rating()))
    }

    /// Identifier of the roster a team fielded on most maps of a match
    fn most_popular_roster<F>(&mut self, result: &FinishedMatch, is_side: F) -> Result<String>
    where
        F: Fn(TeamId) -> bool,
    {
        let identifiers: Vec<String> = result
            .maps
            .iter()
            .map(|map| {
                let user_ids: Vec<UserId> = map
                    .participants
                    .iter()
                    .filter(|p| is_side(p.tournament_team_id))
                    .map(|p| p.user_id)
                    .collect();
                user_ids_to_identifier(&user_ids)
            })
            .collect();

        select_most_popular(&identifiers, &mut self.rng).ok_or_else(|| {
            EngineError::RatingCalculationFailed {
                reason: format!("Match {} has no maps", result.match_id),
            }
            .into()
        })
    }

    fn player_result_deltas(&mut self, results: &[FinishedMatch]) -> Result<Vec<PlayerResultDelta>> {
        let mut deltas: BTreeMap<(UserId, UserId, PlayerRelation), PlayerResultDelta> =
            BTreeMap::new();
        let mut add = |owner: &MapParticipant, other: &MapParticipant, won: bool, is_set: bool| {
            let relation = if owner.tournament_team_id == other.tournament_team_id {
                PlayerRelation::Mate
            } else {
                PlayerRelation::Enemy
            };
            let delta = deltas
                .entry((owner.user_id, other.user_id, relation))
                .or_insert(PlayerResultDelta {
                    owner_user_id: owner.user_id,
                    other_user_id: other.user_id,
                    relation,
                    map_wins: 0,
                    map_losses: 0,
                    set_wins: 0,
                    set_losses: 0,
                });
            match (is_set, won) {
                (false, true) => delta.map_wins += 1,
                (false, false) => delta.map_losses += 1,
                (true, true) => delta.set_wins += 1,
                (true, false) => delta.set_losses += 1,
            }
        };

        for result in results {
            for map in &result.maps {
                for owner in &map.participants {
                    for other in map.participants.iter().filter(|p| p.user_id != owner.user_id) {
                        add(owner, other, owner.tournament_team_id == map.winner_team_id, false);
                    }
                }
            }

            let one = &result.opponent_one;
            let two = &result.opponent_two;
            let mut set_participants: Vec<MapParticipant> = Vec::new();
            for team_id in [one.id, two.id] {
                let identifier = self.most_popular_roster(result, |id| id == team_id)?;
                set_participants.extend(identifier_to_user_ids(&identifier).into_iter().map(
                    |user_id| MapParticipant {
                        user_id,
                        tournament_team_id: team_id,
                    },
                ));
            }

            for owner in &set_participants {
                let outcome = if owner.tournament_team_id == one.id {
                    one.result
                } else {
                    two.result
                };
                for other in set_participants.iter().filter(|p| p.user_id != owner.user_id) {
                    add(owner, other, outcome == Some(MatchOutcome::Win), true);
                }
            }
        }

        Ok(deltas.into_values().collect())
    }
}

fn map_result_deltas(results: &[FinishedMatch]) -> Vec<MapResultDelta> {
    let mut deltas: BTreeMap<(UserId, u32, String), MapResultDelta> = BTreeMap::new();

    for result in results {
        for map in &result.maps {
            for participant in &map.participants {
                let delta = deltas
                    .entry((participant.user_id, map.stage_id, map.mode.clone()))
                    .or_insert_with(|| MapResultDelta {
                        user_id: participant.user_id,
                        stage_id: map.stage_id,
                        mode: map.mode.clone(),
                        wins: 0,
                        losses: 0,
                    });
                if participant.tournament_team_id == map.winner_team_id {
                    delta.wins += 1;
                } else {
                    delta.losses += 1;
                }
            }
        }
    }

    deltas.into_values().collect()
}

/// One row per roster member, each player keeping only their best standing
fn tournament_results(
    teams: &[TournamentTeam],
    final_standings: &[Standing],
) -> Result<Vec<TournamentResultRow>> {
    let participant_count = teams.len() as u32;
    let mut seen_users: HashSet<UserId> = HashSet::new();
    let mut rows = Vec::new();

    for standing in final_standings {
        let team = teams
            .iter()
            .find(|team| team.id == standing.team_id)
            .ok_or(EngineError::TeamNotFound {
                team_id: standing.team_id,
            })?;

        for user_id in team.member_user_ids() {
            if !seen_users.insert(user_id) {
                continue;
            }
            rows.push(TournamentResultRow {
                user_id,
                tournament_team_id: team.id,
                placement: standing.placement,
                participant_count,
            });
        }
    }

    Ok(rows)
}
