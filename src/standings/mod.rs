//! Tournament-wide standings
//!
//! Per-bracket standings are merged best bracket first. A team is ranked by
//! the first bracket that lists it, so teams eliminated early in the top cut
//! still rank above everyone who never made it there.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::engine::Tournament;
use crate::progression::bracket_idxs_for_standings;
use crate::types::{BracketIdx, MatchId, MatchOutcome, Standing, TeamId};

/// One finished match of a team, as shown on its results page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedMatch {
    pub match_id: MatchId,
    /// 0 when the opponent is no longer on the roster
    pub vs_seed: u32,
    pub result: MatchOutcome,
    pub bracket_idx: BracketIdx,
}

/// Final ranking across every bracket that contributes to standings
pub fn tournament_standings(tournament: &Tournament) -> Vec<Standing> {
    let bracket_idxs = bracket_idxs_for_standings(&tournament.settings.bracket_progression);

    let final_bracket_is_over = tournament
        .brackets
        .iter()
        .any(|bracket| bracket.is_finals && bracket.every_match_over());

    let mut result: Vec<Standing> = Vec::new();
    let mut already_included: HashSet<TeamId> = HashSet::new();

    for bracket_idx in bracket_idxs {
        let Some(bracket) = tournament.bracket_by_idx(bracket_idx) else {
            continue;
        };
        // never played
        if final_bracket_is_over && bracket.preview {
            debug!("Skipping unplayed bracket {} in standings", bracket.name);
            continue;
        }

        let teams_above = already_included.len() as u32;
        result.extend(mergeable(&bracket.standings(), &already_included, teams_above));

        already_included.extend(bracket.participant_team_ids.iter().copied());
        already_included.extend(bracket.teams_pending_check_in.iter().copied());
    }

    result
}

/// Renumber a bracket's standings to continue below `teams_above` ranked teams
fn mergeable(
    standings: &[Standing],
    already_included: &HashSet<TeamId>,
    teams_above: u32,
) -> Vec<Standing> {
    let filtered: Vec<&Standing> = standings
        .iter()
        .filter(|standing| !already_included.contains(&standing.team_id))
        .collect();

    let mut placement = teams_above + 1;
    let mut merged = Vec::with_capacity(filtered.len());
    for (i, standing) in filtered.iter().enumerate() {
        if i != 0 && standing.placement != filtered[i - 1].placement {
            placement = teams_above + i as u32 + 1;
        }

        merged.push(Standing {
            placement,
            ..(*standing).clone()
        });
    }

    merged
}

/// Seed Performance Rating: how many distinct placements better (positive)
/// or worse than its seed a team finished. 0 if the team is not in
/// `standings` or its seed is out of range.
pub fn calculate_spr(standings: &[Standing], team_id: TeamId, seed: u32) -> i32 {
    let mut unique_placements: Vec<u32> = standings.iter().map(|s| s.placement).collect();
    unique_placements.sort_unstable();
    unique_placements.dedup();

    let Some(team_standing) = standings.iter().find(|s| s.team_id == team_id) else {
        return 0;
    };
    let Some(expected_placement) = (seed as usize)
        .checked_sub(1)
        .and_then(|idx| standings.get(idx))
        .map(|s| s.placement)
    else {
        return 0;
    };

    let index_of = |placement: u32| {
        unique_placements
            .iter()
            .position(|p| *p == placement)
            .map_or(0, |idx| idx as i32)
    };

    index_of(expected_placement) - index_of(team_standing.placement)
}

/// Decided matches of a team in the standings brackets, earliest bracket first
pub fn matches_played(tournament: &Tournament, team_id: TeamId) -> Vec<PlayedMatch> {
    let mut bracket_idxs = bracket_idxs_for_standings(&tournament.settings.bracket_progression);
    bracket_idxs.reverse();

    bracket_idxs
        .into_iter()
        .filter_map(|idx| tournament.bracket_by_idx(idx))
        .flat_map(|bracket| {
            bracket.data.matches.iter().filter_map(move |m| {
                let (one, two) = m.team_ids()?;
                if !m.has_winner() || (one != team_id && two != team_id) {
                    return None;
                }

                let opponent_id = if one == team_id { two } else { one };
                let result = m
                    .slot_of(team_id)
                    .and_then(|slot| slot.result)
                    .unwrap_or(MatchOutcome::Win);

                Some(PlayedMatch {
                    match_id: m.id,
                    vs_seed: tournament
                        .team_by_id(opponent_id)
                        .and_then(|team| team.seed)
                        .unwrap_or(0),
                    result,
                    bracket_idx: bracket.idx,
                })
            })
        })
        .collect()
}
