//! Bracket generation seam
//!
//! The engine never pairs teams itself. It asks a [`BracketGenerator`] what a
//! bracket would look like when created from a seeding, both for preview
//! brackets and for the replay avoidance simulation.

use crate::types::{BracketData, BracketMatch, BracketRound, BracketType, MatchSlot, TeamId};

use super::settings::{GeneratorSettings, GrandFinal};

/// Creates the initial structure of a bracket
pub trait BracketGenerator: Send + Sync {
    /// Matches and rounds of a freshly created bracket.
    /// Elimination seeding is already padded to a power of two, `None` being a bye.
    fn create(
        &self,
        bracket_type: BracketType,
        seeding: &[Option<TeamId>],
        settings: &GeneratorSettings,
    ) -> BracketData;
}

/// Generator with standard elimination seeding (1 vs N, 2 vs N-1, ...)
/// and bye propagation. Round robin and swiss brackets are left empty until
/// the bracket library starts them.
#[derive(Debug, Clone, Default)]
pub struct StandardBracketGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Team(TeamId),
    Bye,
    /// Decided by a match that has not been played
    Pending,
}

impl Slot {
    fn to_match_slot(self) -> Option<MatchSlot> {
        match self {
            Slot::Team(id) => Some(MatchSlot::team(id)),
            Slot::Bye => None,
            Slot::Pending => Some(MatchSlot {
                id: None,
                score: None,
                result: None,
            }),
        }
    }
}

/// 1-based seeds in bracket order, e.g. `[1, 8, 4, 5, 2, 7, 3, 6]` for 8
pub fn seed_positions(size: usize) -> Vec<usize> {
    let mut order = vec![1];
    while order.len() < size {
        let next_size = order.len() * 2;
        order = order
            .iter()
            .flat_map(|seed| [*seed, next_size + 1 - *seed])
            .collect();
    }
    order
}

impl StandardBracketGenerator {
    pub fn new() -> Self {
        Self
    }

    fn winners_bracket(seeding: &[Option<TeamId>], data: &mut BracketData) {
        if seeding.len() < 2 {
            return;
        }

        let mut slots: Vec<Slot> = seed_positions(seeding.len())
            .into_iter()
            .map(|seed| match seeding.get(seed - 1) {
                Some(Some(team_id)) => Slot::Team(*team_id),
                _ => Slot::Bye,
            })
            .collect();

        let mut round_number = 1;
        while slots.len() > 1 {
            let round_id = data.rounds.len() as i64;
            data.rounds.push(BracketRound {
                id: round_id,
                group_id: 0,
                number: round_number,
            });

            let mut next_round = Vec::with_capacity(slots.len() / 2);
            for (number, pair) in slots.chunks(2).enumerate() {
                let (one, two) = (pair[0], pair.get(1).copied().unwrap_or(Slot::Bye));

                if !(one == Slot::Bye && two == Slot::Bye) {
                    Self::push_match(data, 0, round_id, number as u32 + 1, one, two);
                }

                next_round.push(match (one, two) {
                    (Slot::Team(id), Slot::Bye) | (Slot::Bye, Slot::Team(id)) => Slot::Team(id),
                    (Slot::Bye, Slot::Bye) => Slot::Bye,
                    _ => Slot::Pending,
                });
            }

            slots = next_round;
            round_number += 1;
        }
    }

    fn push_match(
        data: &mut BracketData,
        group_id: i64,
        round_id: i64,
        number: u32,
        one: Slot,
        two: Slot,
    ) {
        data.matches.push(BracketMatch {
            id: data.matches.len() as i64,
            group_id,
            round_id,
            number,
            opponent1: one.to_match_slot(),
            opponent2: two.to_match_slot(),
        });
    }

    fn pending_round(data: &mut BracketData, group_id: i64, match_count: u32) {
        let round_id = data.rounds.len() as i64;
        data.rounds.push(BracketRound {
            id: round_id,
            group_id,
            number: 1,
        });
        for number in 1..=match_count {
            Self::push_match(data, group_id, round_id, number, Slot::Pending, Slot::Pending);
        }
    }
}

impl BracketGenerator for StandardBracketGenerator {
    fn create(
        &self,
        bracket_type: BracketType,
        seeding: &[Option<TeamId>],
        settings: &GeneratorSettings,
    ) -> BracketData {
        let mut data = BracketData::default();

        if !bracket_type.is_elimination() {
            return data;
        }

        Self::winners_bracket(seeding, &mut data);

        match settings {
            GeneratorSettings::SingleElimination {
                consolation_final: true,
            } => Self::pending_round(&mut data, 1, 1),
            GeneratorSettings::DoubleElimination { grand_final } if seeding.len() >= 2 => {
                match grand_final {
                    GrandFinal::None => {}
                    GrandFinal::Simple => Self::pending_round(&mut data, 2, 1),
                    GrandFinal::Double => Self::pending_round(&mut data, 2, 2),
                }
            }
            _ => {}
        }

        data
    }
}
