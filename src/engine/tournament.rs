//! Tournament construction from a snapshot
//!
//! Every read rebuilds the whole tournament: brackets are derived in
//! progression order, each one from the brackets before it, the roster,
//! check-ins and overrides.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::TournamentDefaults;
use crate::error::{EngineError, Result};
use crate::progression;
use crate::types::{
    BracketData, BracketIdx, ParsedBracket, ProgressionOverride, Source, Standing, TeamId,
    TournamentSettings, TournamentSnapshot, TournamentTeam,
};
use crate::utils::fill_with_null_till_power_of_two;

use super::bracket::{participants_of, Bracket, SourcedTeams};
use super::generator::{BracketGenerator, StandardBracketGenerator};
use super::replays::{avoid_replays, Encounters};
use super::settings::GeneratorSettings;

/// Builds [`Tournament`]s from snapshots
#[derive(Clone)]
pub struct TournamentEngine {
    defaults: TournamentDefaults,
    generator: Arc<dyn BracketGenerator>,
}

impl std::fmt::Debug for TournamentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TournamentEngine")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// A tournament with every bracket materialized
#[derive(Debug, Clone)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    /// Time the snapshot was evaluated at
    pub now: DateTime<Utc>,
    pub is_finalized: bool,
    pub settings: TournamentSettings,
    /// In seed order, `seed` set to the 1-based position
    pub teams: Vec<TournamentTeam>,
    pub overrides: Vec<ProgressionOverride>,
    pub brackets: Vec<Bracket>,
    check_in_window: Duration,
}

impl TournamentEngine {
    pub fn new(defaults: TournamentDefaults) -> Self {
        Self::with_generator(defaults, Arc::new(StandardBracketGenerator::new()))
    }

    pub fn with_generator(defaults: TournamentDefaults, generator: Arc<dyn BracketGenerator>) -> Self {
        Self {
            defaults,
            generator,
        }
    }

    pub fn defaults(&self) -> &TournamentDefaults {
        &self.defaults
    }

    /// Materialize every bracket of the snapshot as of `now`
    pub fn build(&self, snapshot: &TournamentSnapshot, now: DateTime<Utc>) -> Result<Tournament> {
        check_overrides(snapshot)?;

        let has_started = !snapshot.live_brackets.is_empty();
        let min_members = snapshot
            .settings
            .min_members_per_team
            .unwrap_or(self.defaults.default_min_members_per_team);

        let mut teams = snapshot.teams.clone();
        teams.sort_by(|a, b| compare_teams(a, b, min_members));
        if has_started {
            // teams that never checked in are irrelevant once play begins
            teams.retain(|team| !team.check_ins.is_empty());
        }
        for (position, team) in teams.iter_mut().enumerate() {
            team.seed = Some(position as u32 + 1);
        }

        let mut tournament = Tournament {
            id: snapshot.id,
            name: snapshot.name.clone(),
            start_time: snapshot.start_time,
            now,
            is_finalized: snapshot.is_finalized,
            settings: snapshot.settings.clone(),
            teams,
            overrides: snapshot.overrides.clone(),
            brackets: Vec::with_capacity(snapshot.settings.bracket_progression.len()),
            check_in_window: self.defaults.check_in_window(),
        };

        let progression = &snapshot.settings.bracket_progression;
        for (idx, definition) in progression.iter().enumerate() {
            let live = snapshot
                .live_brackets
                .iter()
                .find(|live| live.name == definition.name);

            let mut bracket = match live {
                Some(live) => self.started_bracket(&tournament, idx, definition, live),
                None => self.preview_bracket(&tournament, idx, definition)?,
            };
            bracket.is_finals = progression::is_finals(idx, progression)?;
            bracket.is_underground = progression::is_underground(idx, progression)?;

            debug!(
                "Bracket {} ({}): {} teams, preview: {}, can be started: {}",
                idx,
                bracket.name,
                bracket.participant_team_ids.len(),
                bracket.preview,
                bracket.can_be_started
            );
            tournament.brackets.push(bracket);
        }

        info!(
            "Built tournament {} with {} brackets and {} teams",
            tournament.id,
            tournament.brackets.len(),
            tournament.teams.len()
        );

        Ok(tournament)
    }

    fn generator_settings(
        &self,
        tournament: &Tournament,
        definition: &ParsedBracket,
        participant_count: usize,
    ) -> GeneratorSettings {
        GeneratorSettings::derive(
            definition.bracket_type,
            &definition.settings,
            &tournament.settings,
            &self.defaults,
            participant_count,
        )
    }

    fn create_data(
        &self,
        tournament: &Tournament,
        definition: &ParsedBracket,
        seeding: &[TeamId],
    ) -> BracketData {
        let settings = self.generator_settings(tournament, definition, seeding.len());
        let slots = if definition.bracket_type.is_elimination() {
            fill_with_null_till_power_of_two(seeding)
        } else {
            seeding.iter().copied().map(Some).collect()
        };

        self.generator.create(definition.bracket_type, &slots, &settings)
    }

    fn started_bracket(
        &self,
        tournament: &Tournament,
        idx: BracketIdx,
        definition: &ParsedBracket,
        live: &BracketData,
    ) -> Bracket {
        let participants = participants_of(live);
        let settings = self.generator_settings(tournament, definition, participants.len());

        let mut bracket = Bracket::from_definition(idx, definition, settings, live.clone());
        bracket.id = live.stage_id;
        bracket.created_at = live.created_at;
        bracket.preview = false;
        bracket.seeding = participants.clone();
        bracket.participant_team_ids = participants;
        bracket
    }

    fn preview_bracket(
        &self,
        tournament: &Tournament,
        idx: BracketIdx,
        definition: &ParsedBracket,
    ) -> Result<Bracket> {
        let entry_idx = progression::entry_bracket_idx(&tournament.settings.bracket_progression);

        let SourcedTeams {
            teams,
            relevant_matches_finished,
        } = match &definition.sources {
            None => SourcedTeams {
                teams: tournament
                    .teams
                    .iter()
                    .filter(|team| team.starting_bracket_idx.unwrap_or(entry_idx) == idx)
                    .map(|team| team.id)
                    .collect(),
                relevant_matches_finished: true,
            },
            Some(sources) => tournament.resolve_teams_from_sources(idx, sources)?,
        };

        let teams: Vec<TeamId> = teams
            .into_iter()
            .filter(|team_id| {
                !tournament
                    .team_by_id(*team_id)
                    .is_some_and(|team| team.dropped_out)
            })
            .collect();

        let (checked_in, not_checked_in) = tournament.divide_by_check_in(
            teams,
            idx,
            definition.sources.is_none(),
            definition.requires_check_in,
        )?;

        let seeding = match definition.sources.as_deref() {
            Some([source])
                if definition.bracket_type.is_elimination()
                    && checked_in.len() >= self.defaults.replay_avoidance_min_teams =>
            {
                self.seeding_without_replays(tournament, definition, source, checked_in)
            }
            _ => checked_in,
        };

        let data = self.create_data(tournament, definition, &seeding);
        let settings = self.generator_settings(tournament, definition, seeding.len());

        let mut bracket = Bracket::from_definition(idx, definition, settings, data);
        bracket.data.stage_id = bracket.id;
        bracket.data.name = definition.name.clone();
        bracket.can_be_started = seeding.len() >= self.defaults.enough_teams_to_start
            && if definition.sources.is_some() {
                relevant_matches_finished
            } else {
                tournament.regular_check_in_has_ended()
            };
        if definition.sources.is_some() {
            bracket.teams_pending_check_in = not_checked_in;
        }
        bracket.participant_team_ids = seeding.clone();
        bracket.seeding = seeding;

        Ok(bracket)
    }

    fn seeding_without_replays(
        &self,
        tournament: &Tournament,
        definition: &ParsedBracket,
        source: &Source,
        teams: Vec<TeamId>,
    ) -> Vec<TeamId> {
        let Some(source_bracket) = tournament.bracket_by_idx(source.bracket_idx) else {
            warn!("Avoiding replays skipped: source bracket {} not found", source.bracket_idx);
            return teams;
        };

        let encounters = Encounters::from_matches(&source_bracket.data.matches);
        avoid_replays(
            &teams,
            &encounters,
            self.defaults.replay_avoidance_max_iterations,
            |order| self.create_data(tournament, definition, order).matches,
        )
    }
}

/// Overrides must name brackets of the progression
fn check_overrides(snapshot: &TournamentSnapshot) -> Result<()> {
    let bracket_count = snapshot.settings.bracket_progression.len();

    for o in &snapshot.overrides {
        let out_of_range = [Some(o.source_bracket_idx), o.destination()]
            .into_iter()
            .flatten()
            .find(|idx| *idx >= bracket_count);

        if let Some(bracket_idx) = out_of_range {
            return Err(EngineError::BracketNotFound { bracket_idx }.into());
        }
    }

    Ok(())
}

/// Explicit seeds first, then full rosters, then seeding skill, then registration order
fn compare_teams(a: &TournamentTeam, b: &TournamentTeam, min_members: u32) -> Ordering {
    match (a.seed, b.seed) {
        (Some(a_seed), Some(b_seed)) => a_seed.cmp(&b_seed),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => compare_unseeded_teams(a, b, min_members),
    }
}

fn compare_unseeded_teams(a: &TournamentTeam, b: &TournamentTeam, min_members: u32) -> Ordering {
    let a_full = a.members.len() >= min_members as usize;
    let b_full = b.members.len() >= min_members as usize;

    b_full
        .cmp(&a_full)
        .then_with(|| {
            match (a.avg_seeding_skill_ordinal, b.avg_seeding_skill_ordinal) {
                (Some(a_ordinal), Some(b_ordinal)) => {
                    b_ordinal.partial_cmp(&a_ordinal).unwrap_or(Ordering::Equal)
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
}

impl Tournament {
    pub fn bracket_by_idx(&self, idx: BracketIdx) -> Option<&Bracket> {
        self.brackets.get(idx)
    }

    /// Team with its effective seed
    pub fn team_by_id(&self, team_id: TeamId) -> Option<&TournamentTeam> {
        self.teams.iter().find(|team| team.id == team_id)
    }

    pub fn has_started(&self) -> bool {
        self.brackets.iter().any(|bracket| !bracket.preview)
    }

    pub fn every_bracket_over(&self) -> bool {
        self.is_finalized || self.brackets.iter().all(Bracket::every_match_over)
    }

    /// Every bracket that matters is over. Underground brackets that never started can be skipped.
    pub fn can_finalize(&self) -> bool {
        !self.is_finalized
            && self
                .brackets
                .iter()
                .filter(|bracket| !bracket.preview || !bracket.is_underground)
                .all(Bracket::every_match_over)
    }

    /// Started bracket containing the match
    pub fn match_id_to_bracket_idx(&self, match_id: i64) -> Option<BracketIdx> {
        self.brackets
            .iter()
            .find(|bracket| !bracket.preview && bracket.has_match(match_id))
            .map(|bracket| bracket.idx)
    }

    /// Final ranking across every bracket
    pub fn standings(&self) -> Vec<Standing> {
        crate::standings::tournament_standings(self)
    }

    pub fn regular_check_in_starts_at(&self) -> DateTime<Utc> {
        self.start_time - self.check_in_window
    }

    pub fn regular_check_in_is_open(&self) -> bool {
        self.regular_check_in_starts_at() < self.now && self.start_time > self.now
    }

    pub fn regular_check_in_has_ended(&self) -> bool {
        self.start_time < self.now
    }

    pub fn regular_check_in_start_in_the_past(&self) -> bool {
        self.regular_check_in_starts_at() < self.now
    }

    fn resolve_teams_from_sources(
        &self,
        bracket_idx: BracketIdx,
        sources: &[Source],
    ) -> Result<SourcedTeams> {
        let mut teams: Vec<TeamId> = Vec::new();
        let mut relevant_matches_finished = true;

        for source in sources {
            let source_bracket = self.bracket_by_idx(source.bracket_idx).ok_or(
                EngineError::SourceBracketMissing {
                    bracket_idx,
                    source_bracket_idx: source.bracket_idx,
                },
            )?;

            let sourced = source_bracket.source(&source.placements);
            relevant_matches_finished &= sourced.relevant_matches_finished;

            // overridden elsewhere (or out of progression)
            teams.extend(sourced.teams.into_iter().filter(|team_id| {
                !self.overrides.iter().any(|o| {
                    o.source_bracket_idx == source.bracket_idx
                        && o.tournament_team_id == *team_id
                        && !o.points_to(bracket_idx)
                })
            }));
        }

        let mut from_overrides: Vec<(usize, u32, TeamId)> = Vec::new();
        for (source_position, source) in sources.iter().enumerate() {
            let standings = self
                .bracket_by_idx(source.bracket_idx)
                .map(Bracket::standings)
                .unwrap_or_default();

            for o in self.overrides.iter().filter(|o| {
                o.source_bracket_idx == source.bracket_idx && o.points_to(bracket_idx)
            }) {
                let team_id = o.tournament_team_id;
                if teams.contains(&team_id) || from_overrides.iter().any(|(_, _, id)| *id == team_id)
                {
                    continue;
                }

                let placement = standings
                    .iter()
                    .find(|standing| standing.team_id == team_id)
                    .map(|standing| standing.placement)
                    .unwrap_or(u32::MAX);
                from_overrides.push((source_position, placement, team_id));
            }
        }
        from_overrides.sort_by_key(|(source_position, placement, _)| (*source_position, *placement));
        teams.extend(from_overrides.into_iter().map(|(_, _, team_id)| team_id));

        Ok(SourcedTeams {
            teams,
            relevant_matches_finished,
        })
    }

    /// Split teams into (checked in, not checked in) for one bracket
    fn divide_by_check_in(
        &self,
        teams: Vec<TeamId>,
        bracket_idx: BracketIdx,
        uses_regular_check_in: bool,
        requires_check_in: bool,
    ) -> Result<(Vec<TeamId>, Vec<TeamId>)> {
        let mut checked_in = Vec::new();
        let mut not_checked_in = Vec::new();

        for team_id in teams {
            let team = self
                .team_by_id(team_id)
                .ok_or(EngineError::TeamNotFound { team_id })?;

            let is_checked_in = if uses_regular_check_in {
                (team.has_regular_check_in() || !self.regular_check_in_start_in_the_past())
                    && !team.is_checked_out_of(bracket_idx)
            } else if requires_check_in {
                team.is_checked_in_to(bracket_idx)
            } else {
                !team.is_checked_out_of(bracket_idx)
            };

            if is_checked_in {
                checked_in.push(team_id);
            } else {
                not_checked_in.push(team_id);
            }
        }

        Ok((checked_in, not_checked_in))
    }
}
