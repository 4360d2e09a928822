//! Common types used throughout the tournament engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillratings::weng_lin::WengLinRating;

/// Identifier of a team registered to one tournament
pub type TeamId = i64;

/// Identifier of a user (player)
pub type UserId = i64;

/// Positional index of a bracket inside the progression
pub type BracketIdx = usize;

/// Identifier of a match produced by the bracket generator
pub type MatchId = i64;

/// Format of one bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketType {
    #[serde(alias = "single_elim")]
    SingleElimination,
    #[serde(alias = "double_elim")]
    DoubleElimination,
    RoundRobin,
    Swiss,
}

impl BracketType {
    /// Single or double elimination
    pub fn is_elimination(self) -> bool {
        match self {
            BracketType::SingleElimination | BracketType::DoubleElimination => true,
            BracketType::RoundRobin | BracketType::Swiss => false,
        }
    }
}

impl std::fmt::Display for BracketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BracketType::SingleElimination => write!(f, "single_elimination"),
            BracketType::DoubleElimination => write!(f, "double_elimination"),
            BracketType::RoundRobin => write!(f, "round_robin"),
            BracketType::Swiss => write!(f, "swiss"),
        }
    }
}

/// Organizer-chosen settings of one bracket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_place_match: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams_per_group: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_count: Option<u32>,
}

/// Placements of one earlier bracket that feed a bracket.
/// Positive placements are ranks (1 = best), negative count from the bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub bracket_idx: BracketIdx,
    pub placements: Vec<i32>,
}

/// Validated bracket as persisted in the tournament configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBracket {
    #[serde(rename = "type")]
    pub bracket_type: BracketType,
    pub name: String,
    #[serde(default)]
    pub settings: BracketSettings,
    #[serde(default)]
    pub requires_check_in: bool,
    /// Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl ParsedBracket {
    /// Bracket without sources, settings and check-in
    pub fn new(name: impl Into<String>, bracket_type: BracketType) -> Self {
        Self {
            bracket_type,
            name: name.into(),
            settings: BracketSettings::default(),
            requires_check_in: false,
            start_time: None,
            sources: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_settings(mut self, settings: BracketSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn requiring_check_in(mut self, requires_check_in: bool) -> Self {
        self.requires_check_in = requires_check_in;
        self
    }

    /// Every placement this bracket takes, across all of its sources
    pub fn sourced_placements(&self) -> impl Iterator<Item = i32> + '_ {
        self.sources
            .iter()
            .flatten()
            .flat_map(|source| source.placements.iter().copied())
    }

    pub fn sources_from(&self, bracket_idx: BracketIdx) -> bool {
        self.sources
            .iter()
            .flatten()
            .any(|source| source.bracket_idx == bracket_idx)
    }
}

/// Source as typed by the organizer before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableSource {
    /// Client side identifier of the source bracket, resolved to an index on validation
    pub bracket_id: String,
    /// Human editable placements such as "1-3" or "1,2,3"
    pub placements: String,
}

/// Bracket as edited in the organizer form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBracket {
    pub id: String,
    #[serde(rename = "type")]
    pub bracket_type: BracketType,
    pub name: String,
    #[serde(default)]
    pub settings: BracketSettings,
    #[serde(default)]
    pub requires_check_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<EditableSource>>,
    /// Bracket is already underway and can not be edited
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: UserId,
    #[serde(default)]
    pub is_owner: bool,
}

/// Check-in (or check-out) record. `bracket_idx` of `None` is the tournament-wide check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    #[serde(default)]
    pub bracket_idx: Option<BracketIdx>,
    #[serde(default)]
    pub is_check_out: bool,
}

/// Registered team as read from the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentTeam {
    pub id: TeamId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub check_ins: Vec<CheckIn>,
    #[serde(default)]
    pub avg_seeding_skill_ordinal: Option<f64>,
    #[serde(default)]
    pub dropped_out: bool,
    #[serde(default)]
    pub starting_bracket_idx: Option<BracketIdx>,
    /// Registration time, unix seconds
    #[serde(default)]
    pub created_at: i64,
}

impl TournamentTeam {
    pub fn new(id: TeamId) -> Self {
        Self {
            id,
            name: format!("Team {}", id),
            seed: None,
            members: Vec::new(),
            check_ins: Vec::new(),
            avg_seeding_skill_ordinal: None,
            dropped_out: false,
            starting_bracket_idx: None,
            created_at: 0,
        }
    }

    pub fn has_regular_check_in(&self) -> bool {
        self.check_ins
            .iter()
            .any(|check_in| check_in.bracket_idx.is_none() && !check_in.is_check_out)
    }

    pub fn is_checked_in_to(&self, bracket_idx: BracketIdx) -> bool {
        self.check_ins
            .iter()
            .any(|check_in| check_in.bracket_idx == Some(bracket_idx) && !check_in.is_check_out)
    }

    pub fn is_checked_out_of(&self, bracket_idx: BracketIdx) -> bool {
        self.check_ins
            .iter()
            .any(|check_in| check_in.bracket_idx == Some(bracket_idx) && check_in.is_check_out)
    }

    pub fn member_user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.members.iter().map(|member| member.user_id)
    }
}

/// Manual routing exception issued by an organizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionOverride {
    pub source_bracket_idx: BracketIdx,
    /// `-1` removes the team from progression
    pub destination_bracket_idx: i32,
    pub tournament_team_id: TeamId,
}

impl ProgressionOverride {
    pub const NO_PROGRESSION: i32 = -1;

    pub fn destination(&self) -> Option<BracketIdx> {
        usize::try_from(self.destination_bracket_idx).ok()
    }

    pub fn points_to(&self, bracket_idx: BracketIdx) -> bool {
        self.destination() == Some(bracket_idx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

/// One side of a generated match. `id` of `None` means the opponent is not known yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSlot {
    #[serde(default)]
    pub id: Option<TeamId>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub result: Option<MatchOutcome>,
}

impl MatchSlot {
    pub fn team(id: TeamId) -> Self {
        Self {
            id: Some(id),
            score: None,
            result: None,
        }
    }

    pub fn won(&self) -> bool {
        self.result == Some(MatchOutcome::Win)
    }
}

/// Match as produced by the external bracket generator. A missing slot is a bye.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketMatch {
    pub id: MatchId,
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub round_id: i64,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub opponent1: Option<MatchSlot>,
    #[serde(default)]
    pub opponent2: Option<MatchSlot>,
}

impl BracketMatch {
    /// Both team ids if both opponents are known
    pub fn team_ids(&self) -> Option<(TeamId, TeamId)> {
        let one = self.opponent1.as_ref()?.id?;
        let two = self.opponent2.as_ref()?.id?;
        Some((one, two))
    }

    pub fn is_bye(&self) -> bool {
        self.opponent1.is_none() || self.opponent2.is_none()
    }

    pub fn has_winner(&self) -> bool {
        self.opponent1.as_ref().is_some_and(MatchSlot::won)
            || self.opponent2.as_ref().is_some_and(MatchSlot::won)
    }

    /// Byes count as finished
    pub fn is_finished(&self) -> bool {
        self.is_bye() || self.has_winner()
    }

    pub fn involves(&self, team_id: TeamId) -> bool {
        [&self.opponent1, &self.opponent2]
            .into_iter()
            .flatten()
            .any(|slot| slot.id == Some(team_id))
    }

    pub fn slot_of(&self, team_id: TeamId) -> Option<&MatchSlot> {
        [&self.opponent1, &self.opponent2]
            .into_iter()
            .flatten()
            .find(|slot| slot.id == Some(team_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketRound {
    pub id: i64,
    #[serde(default)]
    pub group_id: i64,
    pub number: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingStats {
    pub set_wins: u32,
    pub set_losses: u32,
    pub map_wins: u32,
    pub map_losses: u32,
    pub points: i32,
}

/// Placement of one team. Ties share a placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub team_id: TeamId,
    pub placement: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StandingStats>,
}

impl Standing {
    pub fn new(team_id: TeamId, placement: u32) -> Self {
        Self {
            team_id,
            placement,
            stats: None,
        }
    }
}

/// Data of a bracket the external generator has already started
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketData {
    pub stage_id: i64,
    /// Matches the bracket definition with the same name
    pub name: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub matches: Vec<BracketMatch>,
    #[serde(default)]
    pub rounds: Vec<BracketRound>,
    #[serde(default)]
    pub standings: Vec<Standing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwissSettings {
    pub group_count: u32,
    pub round_count: u32,
}

/// Tournament-wide settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSettings {
    pub bracket_progression: Vec<ParsedBracket>,
    #[serde(default)]
    pub third_place_match: Option<bool>,
    #[serde(default)]
    pub teams_per_group: Option<u32>,
    #[serde(default)]
    pub swiss: Option<SwissSettings>,
    #[serde(default)]
    pub min_members_per_team: Option<u32>,
}

/// Everything the engine reads for one computation, captured at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSnapshot {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub is_finalized: bool,
    pub settings: TournamentSettings,
    #[serde(default)]
    pub teams: Vec<TournamentTeam>,
    #[serde(default)]
    pub overrides: Vec<ProgressionOverride>,
    #[serde(default)]
    pub live_brackets: Vec<BracketData>,
}

/// Gaussian skill belief
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Default for Rating {
    fn default() -> Self {
        Self {
            mu: 25.0,
            sigma: 25.0 / 3.0,
        }
    }
}

impl From<WengLinRating> for Rating {
    fn from(rating: WengLinRating) -> Self {
        Self {
            mu: rating.rating,
            sigma: rating.uncertainty,
        }
    }
}

impl From<Rating> for WengLinRating {
    fn from(rating: Rating) -> Self {
        Self {
            rating: rating.mu,
            uncertainty: rating.sigma,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResultOpponent {
    pub id: TeamId,
    #[serde(default)]
    pub result: Option<MatchOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapParticipant {
    pub user_id: UserId,
    pub tournament_team_id: TeamId,
}

/// One played map of a finished match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResult {
    pub stage_id: u32,
    pub mode: String,
    pub winner_team_id: TeamId,
    pub participants: Vec<MapParticipant>,
}

/// Finished match fed to the rating updater
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedMatch {
    pub match_id: MatchId,
    pub opponent_one: MatchResultOpponent,
    pub opponent_two: MatchResultOpponent,
    pub maps: Vec<MapResult>,
}

impl FinishedMatch {
    pub fn winner_team_id(&self) -> Option<TeamId> {
        if self.opponent_one.result == Some(MatchOutcome::Win) {
            Some(self.opponent_one.id)
        } else if self.opponent_two.result == Some(MatchOutcome::Win) {
            Some(self.opponent_two.id)
        } else {
            None
        }
    }
}
