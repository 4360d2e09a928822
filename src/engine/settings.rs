//! Settings handed to the bracket generator
//!
//! Derived from the organizer's bracket settings, tournament-wide settings
//! and the number of participants.

use serde::{Deserialize, Serialize};

use crate::config::TournamentDefaults;
use crate::types::{BracketSettings, BracketType, TournamentSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrandFinal {
    None,
    Simple,
    /// Bracket reset when the losers bracket winner takes the first set
    Double,
}

/// Format-specific generator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorSettings {
    SingleElimination { consolation_final: bool },
    DoubleElimination { grand_final: GrandFinal },
    RoundRobin { group_count: u32 },
    Swiss { group_count: u32, round_count: u32 },
}

impl GeneratorSettings {
    pub fn derive(
        bracket_type: BracketType,
        selected: &BracketSettings,
        tournament: &TournamentSettings,
        defaults: &TournamentDefaults,
        participant_count: usize,
    ) -> Self {
        match bracket_type {
            BracketType::SingleElimination => {
                // no third place match without semifinals
                let consolation_final = participant_count >= 4
                    && selected
                        .third_place_match
                        .or(tournament.third_place_match)
                        .unwrap_or(true);

                GeneratorSettings::SingleElimination { consolation_final }
            }
            BracketType::DoubleElimination => GeneratorSettings::DoubleElimination {
                grand_final: GrandFinal::Double,
            },
            BracketType::RoundRobin => {
                let teams_per_group = selected
                    .teams_per_group
                    .or(tournament.teams_per_group)
                    .unwrap_or(defaults.default_teams_per_group)
                    .max(1) as usize;

                GeneratorSettings::RoundRobin {
                    group_count: participant_count.div_ceil(teams_per_group) as u32,
                }
            }
            BracketType::Swiss => match (selected.group_count, selected.round_count) {
                (Some(group_count), Some(round_count)) => GeneratorSettings::Swiss {
                    group_count,
                    round_count,
                },
                _ => {
                    let (group_count, round_count) = tournament
                        .swiss
                        .map(|swiss| (swiss.group_count, swiss.round_count))
                        .unwrap_or((
                            defaults.swiss_default_group_count,
                            defaults.swiss_default_round_count,
                        ));
                    GeneratorSettings::Swiss {
                        group_count,
                        round_count,
                    }
                }
            },
        }
    }
}
