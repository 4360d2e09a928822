//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use bracket_progression::engine::{BracketGenerator, GeneratorSettings, StandardBracketGenerator};
use bracket_progression::{
    BracketData, BracketMatch, BracketType, CheckIn, MatchOutcome, MatchSlot, ParsedBracket,
    ProgressionOverride, Source, Standing, TeamId, TeamMember, TournamentSettings,
    TournamentSnapshot, TournamentTeam,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Mutex;

/// Generator that delegates to the standard one and records every call
#[derive(Debug, Default)]
pub struct RecordingGenerator {
    inner: StandardBracketGenerator,
    calls: Mutex<Vec<(BracketType, usize)>>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bracket type and padded seeding length of every call so far
    pub fn calls(&self) -> Vec<(BracketType, usize)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl BracketGenerator for RecordingGenerator {
    fn create(
        &self,
        bracket_type: BracketType,
        seeding: &[Option<TeamId>],
        settings: &GeneratorSettings,
    ) -> BracketData {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((bracket_type, seeding.len()));
        }
        self.inner.create(bracket_type, seeding, settings)
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
}

/// Well after the tournament started
pub fn during_tournament() -> DateTime<Utc> {
    start_time() + Duration::hours(2)
}

/// Full roster of four, registered in id order
pub fn team(id: TeamId) -> TournamentTeam {
    let mut team = TournamentTeam::new(id);
    team.members = (0..4)
        .map(|i| TeamMember {
            user_id: id * 100 + i,
            is_owner: i == 0,
        })
        .collect();
    team.created_at = id;
    team
}

pub fn checked_in_team(id: TeamId) -> TournamentTeam {
    let mut team = team(id);
    team.check_ins.push(CheckIn {
        bracket_idx: None,
        is_check_out: false,
    });
    team
}

pub fn source(bracket_idx: usize, placements: &[i32]) -> Source {
    Source {
        bracket_idx,
        placements: placements.to_vec(),
    }
}

pub fn played(id: i64, winner: TeamId, loser: TeamId) -> BracketMatch {
    BracketMatch {
        id,
        group_id: 0,
        round_id: 0,
        number: 1,
        opponent1: Some(MatchSlot {
            score: Some(2),
            result: Some(MatchOutcome::Win),
            ..MatchSlot::team(winner)
        }),
        opponent2: Some(MatchSlot {
            score: Some(1),
            result: Some(MatchOutcome::Loss),
            ..MatchSlot::team(loser)
        }),
    }
}

pub fn standings(placements: &[(TeamId, u32)]) -> Vec<Standing> {
    placements
        .iter()
        .map(|(team_id, placement)| Standing::new(*team_id, *placement))
        .collect()
}

pub fn live_bracket(
    stage_id: i64,
    name: &str,
    matches: Vec<BracketMatch>,
    placements: &[(TeamId, u32)],
) -> BracketData {
    BracketData {
        stage_id,
        name: name.to_string(),
        matches,
        standings: standings(placements),
        ..BracketData::default()
    }
}

/// Four groups of two (A1 = 1, A2 = 2, B1 = 3, ...), every group decided.
/// Runners-up are listed in reverse group order, so the naive top cut pairs
/// every group winner with their own group's runner-up.
pub fn finished_groups() -> BracketData {
    live_bracket(
        100,
        "Groups",
        vec![played(1, 1, 2), played(2, 3, 4), played(3, 5, 6), played(4, 7, 8)],
        &[
            (1, 1),
            (3, 1),
            (5, 1),
            (7, 1),
            (8, 2),
            (6, 2),
            (4, 2),
            (2, 2),
        ],
    )
}

pub fn snapshot(
    progression: Vec<ParsedBracket>,
    teams: Vec<TournamentTeam>,
    live_brackets: Vec<BracketData>,
) -> TournamentSnapshot {
    TournamentSnapshot {
        id: 1,
        name: "Integration Cup".to_string(),
        start_time: start_time(),
        is_finalized: false,
        settings: TournamentSettings {
            bracket_progression: progression,
            ..TournamentSettings::default()
        },
        teams,
        overrides: Vec::new(),
        live_brackets,
    }
}

/// Groups into a single elimination top cut taking `placements`
pub fn groups_into_top_cut(placements: &[i32]) -> TournamentSnapshot {
    snapshot(
        vec![
            ParsedBracket::new("Groups", BracketType::RoundRobin),
            ParsedBracket::new("Top cut", BracketType::SingleElimination)
                .with_sources(vec![source(0, placements)]),
        ],
        (1..=8).map(checked_in_team).collect(),
        vec![finished_groups()],
    )
}

pub fn redirect(team_id: TeamId, source_bracket_idx: usize, destination: i32) -> ProgressionOverride {
    ProgressionOverride {
        source_bracket_idx,
        destination_bracket_idx: destination,
        tournament_team_id: team_id,
    }
}
