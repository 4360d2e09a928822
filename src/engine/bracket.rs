//! Runtime bracket derived from one progression entry

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{
    BracketData, BracketIdx, BracketMatch, BracketSettings, BracketType, ParsedBracket, Source,
    Standing, TeamId,
};
use crate::utils::from_unix_seconds;

use super::settings::GeneratorSettings;

/// Teams a bracket hands to a later bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcedTeams {
    /// Best placement first
    pub teams: Vec<TeamId>,
    /// Whether every match that decides these placements is over
    pub relevant_matches_finished: bool,
}

/// One bracket of a built tournament. Recomputed on every build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub idx: BracketIdx,
    /// Stage id once started, `-idx` while previewed
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub bracket_type: BracketType,
    pub settings: BracketSettings,
    pub sources: Option<Vec<Source>>,
    pub requires_check_in: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub created_at: Option<i64>,
    /// Order the bracket was (or would be) created with
    pub seeding: Vec<TeamId>,
    pub participant_team_ids: Vec<TeamId>,
    /// Not created by the bracket library yet
    pub preview: bool,
    pub can_be_started: bool,
    /// Teams that qualified but have not checked in
    pub teams_pending_check_in: Vec<TeamId>,
    pub generator_settings: GeneratorSettings,
    pub is_finals: bool,
    pub is_underground: bool,
    pub data: BracketData,
}

impl Bracket {
    pub(crate) fn from_definition(
        idx: BracketIdx,
        definition: &ParsedBracket,
        generator_settings: GeneratorSettings,
        data: BracketData,
    ) -> Self {
        Self {
            idx,
            id: -(idx as i64),
            name: definition.name.clone(),
            bracket_type: definition.bracket_type,
            settings: definition.settings.clone(),
            sources: definition.sources.clone(),
            requires_check_in: definition.requires_check_in,
            start_time: definition.start_time.and_then(from_unix_seconds),
            created_at: None,
            seeding: Vec::new(),
            participant_team_ids: Vec::new(),
            preview: true,
            can_be_started: false,
            teams_pending_check_in: Vec::new(),
            generator_settings,
            is_finals: false,
            is_underground: false,
            data,
        }
    }

    /// Standings ordered by placement. Empty while previewed.
    pub fn standings(&self) -> Vec<Standing> {
        if self.preview {
            return Vec::new();
        }

        let mut standings = self.data.standings.clone();
        standings.sort_by_key(|standing| standing.placement);
        standings
    }

    /// Teams occupying `placements`; negative placements count from the bottom.
    pub fn source(&self, placements: &[i32]) -> SourcedTeams {
        if self.preview {
            return SourcedTeams {
                teams: Vec::new(),
                relevant_matches_finished: false,
            };
        }

        let standings = self.standings();
        let mut distinct_placements: Vec<u32> =
            standings.iter().map(|standing| standing.placement).collect();
        distinct_placements.dedup();

        let wanted: Vec<u32> = placements
            .iter()
            .filter_map(|placement| {
                if *placement > 0 {
                    u32::try_from(*placement).ok()
                } else {
                    let from_bottom = placement.unsigned_abs() as usize;
                    distinct_placements
                        .len()
                        .checked_sub(from_bottom)
                        .and_then(|idx| distinct_placements.get(idx))
                        .copied()
                }
            })
            .collect();

        let teams: Vec<TeamId> = standings
            .iter()
            .filter(|standing| wanted.contains(&standing.placement))
            .map(|standing| standing.team_id)
            .collect();

        let relevant_matches_finished = if placements.iter().any(|placement| *placement > 0) {
            self.every_match_over()
        } else {
            !teams.is_empty()
                && teams.iter().all(|team_id| {
                    self.data
                        .matches
                        .iter()
                        .filter(|m| m.involves(*team_id))
                        .all(BracketMatch::is_finished)
                })
        };

        SourcedTeams {
            teams,
            relevant_matches_finished,
        }
    }

    /// Every match has a result (byes count). Swiss also needs every round generated.
    pub fn every_match_over(&self) -> bool {
        if self.preview {
            return false;
        }

        if self.bracket_type == BracketType::Swiss && !self.every_round_has_matches() {
            return false;
        }

        self.data.matches.iter().all(BracketMatch::is_finished)
    }

    fn every_round_has_matches(&self) -> bool {
        self.data
            .rounds
            .iter()
            .all(|round| self.data.matches.iter().any(|m| m.round_id == round.id))
    }

    pub fn has_match(&self, match_id: i64) -> bool {
        self.data.matches.iter().any(|m| m.id == match_id)
    }
}

/// Teams of a started bracket: standings first, then anyone else seen in matches
pub(crate) fn participants_of(data: &BracketData) -> Vec<TeamId> {
    let mut participants: Vec<TeamId> = Vec::new();
    let from_matches = data.matches.iter().flat_map(|m| {
        [&m.opponent1, &m.opponent2]
            .into_iter()
            .flatten()
            .filter_map(|slot| slot.id)
    });

    for team_id in data
        .standings
        .iter()
        .map(|standing| standing.team_id)
        .chain(from_matches)
    {
        if !participants.contains(&team_id) {
            participants.push(team_id);
        }
    }

    participants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::settings::GrandFinal;
    use crate::types::{BracketRound, MatchOutcome, MatchSlot};

    fn finished(id: i64, round_id: i64, winner: TeamId, loser: TeamId) -> BracketMatch {
        BracketMatch {
            id,
            group_id: 0,
            round_id,
            number: 1,
            opponent1: Some(MatchSlot {
                id: Some(winner),
                score: Some(2),
                result: Some(MatchOutcome::Win),
            }),
            opponent2: Some(MatchSlot {
                id: Some(loser),
                score: Some(0),
                result: Some(MatchOutcome::Loss),
            }),
        }
    }

    fn started(bracket_type: BracketType, data: BracketData) -> Bracket {
        let definition = ParsedBracket::new("Main", bracket_type);
        let mut bracket = Bracket::from_definition(
            0,
            &definition,
            GeneratorSettings::DoubleElimination {
                grand_final: GrandFinal::Double,
            },
            data,
        );
        bracket.preview = false;
        bracket
    }

    fn standings(placements: &[(TeamId, u32)]) -> Vec<Standing> {
        placements
            .iter()
            .map(|(team_id, placement)| Standing::new(*team_id, *placement))
            .collect()
    }

    #[test]
    fn test_source_positive_placements() {
        let bracket = started(
            BracketType::RoundRobin,
            BracketData {
                matches: vec![finished(0, 0, 1, 2), finished(1, 0, 3, 4)],
                standings: standings(&[(3, 1), (1, 1), (2, 2), (4, 2)]),
                ..BracketData::default()
            },
        );

        let sourced = bracket.source(&[1]);
        assert_eq!(sourced.teams, vec![3, 1]);
        assert!(sourced.relevant_matches_finished);

        assert_eq!(bracket.source(&[1, 2]).teams, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_source_negative_placements() {
        let bracket = started(
            BracketType::DoubleElimination,
            BracketData {
                matches: vec![finished(0, 0, 1, 4), finished(1, 0, 2, 3), finished(2, 1, 3, 4)],
                standings: standings(&[(1, 1), (2, 2), (3, 3), (4, 4)]),
                ..BracketData::default()
            },
        );

        assert_eq!(bracket.source(&[-1]).teams, vec![4]);
        assert_eq!(bracket.source(&[-1, -2]).teams, vec![3, 4]);
        assert!(bracket.source(&[-1]).relevant_matches_finished);
        assert!(bracket.source(&[-9]).teams.is_empty());
    }

    #[test]
    fn test_source_unfinished() {
        let mut pending = finished(1, 0, 3, 4);
        pending.opponent1.as_mut().unwrap().result = None;
        pending.opponent2.as_mut().unwrap().result = None;

        let bracket = started(
            BracketType::RoundRobin,
            BracketData {
                matches: vec![finished(0, 0, 1, 2), pending],
                standings: standings(&[(1, 1), (2, 2)]),
                ..BracketData::default()
            },
        );

        assert!(!bracket.source(&[1]).relevant_matches_finished);
        assert!(!bracket.every_match_over());
    }

    #[test]
    fn test_preview_bracket_sources_nothing() {
        let definition = ParsedBracket::new("Main", BracketType::SingleElimination);
        let bracket = Bracket::from_definition(
            1,
            &definition,
            GeneratorSettings::SingleElimination {
                consolation_final: false,
            },
            BracketData::default(),
        );

        assert_eq!(bracket.id, -1);
        let sourced = bracket.source(&[1, 2]);
        assert!(sourced.teams.is_empty());
        assert!(!sourced.relevant_matches_finished);
        assert!(!bracket.every_match_over());
        assert!(bracket.standings().is_empty());
    }

    #[test]
    fn test_swiss_needs_every_round_generated() {
        let bracket = started(
            BracketType::Swiss,
            BracketData {
                matches: vec![finished(0, 0, 1, 2)],
                rounds: vec![
                    BracketRound {
                        id: 0,
                        group_id: 0,
                        number: 1,
                    },
                    BracketRound {
                        id: 1,
                        group_id: 0,
                        number: 2,
                    },
                ],
                ..BracketData::default()
            },
        );

        assert!(!bracket.every_match_over());
    }

    #[test]
    fn test_participants_of() {
        let data = BracketData {
            matches: vec![finished(0, 0, 1, 2), finished(1, 0, 3, 4)],
            standings: standings(&[(3, 1), (1, 1)]),
            ..BracketData::default()
        };
        assert_eq!(participants_of(&data), vec![3, 1, 2, 4]);
    }
}
