//! Seed search that avoids immediate rematches
//!
//! When teams move from one bracket into an elimination bracket, the first
//! round should not pair teams that already met. The search swaps lower seeds
//! around and gives up (keeping the original order) when it can not improve.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::types::{BracketMatch, TeamId};

/// Who played whom in a bracket
#[derive(Debug, Clone, Default)]
pub struct Encounters {
    opponents: HashMap<TeamId, HashSet<TeamId>>,
}

impl Encounters {
    pub fn from_matches(matches: &[BracketMatch]) -> Self {
        let mut opponents: HashMap<TeamId, HashSet<TeamId>> = HashMap::new();
        for (one, two) in matches.iter().filter_map(BracketMatch::team_ids) {
            opponents.entry(one).or_default().insert(two);
            opponents.entry(two).or_default().insert(one);
        }
        Self { opponents }
    }

    pub fn have_met(&self, one: TeamId, two: TeamId) -> bool {
        self.opponents
            .get(&one)
            .is_some_and(|opponents| opponents.contains(&two))
    }

    /// Pairs of `matches` that already happened, in match order
    pub fn replays(&self, matches: &[BracketMatch]) -> Vec<(TeamId, TeamId)> {
        matches
            .iter()
            .filter_map(BracketMatch::team_ids)
            .filter(|(one, two)| self.have_met(*one, *two))
            .collect()
    }
}

fn position(order: &[TeamId], team_id: TeamId) -> Option<usize> {
    order.iter().position(|id| *id == team_id)
}

/// Reorder `teams` so the simulated bracket has no rematches.
///
/// Only teams in the lower half of the original order are moved. A swap is
/// kept when it strictly lowers the replay count. Returns `teams` unchanged
/// when the replayed team is not movable or after `max_iterations` rounds.
pub fn avoid_replays<F>(
    teams: &[TeamId],
    encounters: &Encounters,
    max_iterations: usize,
    simulate: F,
) -> Vec<TeamId>
where
    F: Fn(&[TeamId]) -> Vec<BracketMatch>,
{
    let switch_candidates = &teams[teams.len() / 2..];
    let mut new_order = teams.to_vec();
    let mut replays = encounters.replays(&simulate(&new_order));
    let mut iterations = 0;

    while let Some((one, two)) = replays.first().copied() {
        iterations += 1;
        if iterations > max_iterations {
            warn!("Avoiding replays failed, too many iterations");
            return teams.to_vec();
        }

        let lower_seed = if position(&new_order, one) < position(&new_order, two) {
            two
        } else {
            one
        };

        if !switch_candidates.contains(&lower_seed) {
            warn!(
                "Avoiding replays failed, no potential switch candidates found in match: {} vs. {}",
                one, two
            );
            return teams.to_vec();
        }

        for candidate in switch_candidates {
            if *candidate == lower_seed {
                continue;
            }

            let (Some(candidate_idx), Some(lower_idx)) = (
                position(&new_order, *candidate),
                position(&new_order, lower_seed),
            ) else {
                continue;
            };

            new_order.swap(candidate_idx, lower_idx);
            let new_replays = encounters.replays(&simulate(&new_order));
            if new_replays.len() < replays.len() {
                debug!(
                    "Swapped team {} with {}, {} replays left",
                    lower_seed,
                    candidate,
                    new_replays.len()
                );
                replays = new_replays;
                break;
            }
            new_order.swap(candidate_idx, lower_idx);
        }
    }

    new_order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generator::{BracketGenerator, StandardBracketGenerator};
    use crate::engine::settings::GeneratorSettings;
    use crate::types::{BracketType, MatchSlot};
    use crate::utils::fill_with_null_till_power_of_two;

    fn played(id: i64, one: TeamId, two: TeamId) -> BracketMatch {
        BracketMatch {
            id,
            group_id: 0,
            round_id: 0,
            number: 1,
            opponent1: Some(MatchSlot::team(one)),
            opponent2: Some(MatchSlot::team(two)),
        }
    }

    fn simulate(order: &[TeamId]) -> Vec<BracketMatch> {
        StandardBracketGenerator::new().create(
            BracketType::SingleElimination,
            &fill_with_null_till_power_of_two(order),
            &GeneratorSettings::SingleElimination {
                consolation_final: false,
            },
        )
        .matches
    }

    /// Group winners first, runners-up in reverse group order: every first
    /// round match of the naive seeding is a rematch.
    fn group_stage() -> (Vec<TeamId>, Encounters) {
        let encounters =
            Encounters::from_matches(&[played(0, 1, 2), played(1, 3, 4), played(2, 5, 6), played(3, 7, 8)]);
        (vec![1, 3, 5, 7, 8, 6, 4, 2], encounters)
    }

    #[test]
    fn test_encounters() {
        let (_, encounters) = group_stage();
        assert!(encounters.have_met(1, 2));
        assert!(encounters.have_met(2, 1));
        assert!(!encounters.have_met(1, 3));
    }

    #[test]
    fn test_naive_seeding_is_all_rematches() {
        let (teams, encounters) = group_stage();
        assert_eq!(encounters.replays(&simulate(&teams)).len(), 4);
    }

    #[test]
    fn test_avoid_replays_removes_every_rematch() {
        let (teams, encounters) = group_stage();
        let order = avoid_replays(&teams, &encounters, 100, simulate);

        assert_eq!(order, vec![1, 3, 5, 7, 2, 8, 6, 4]);
        assert!(encounters.replays(&simulate(&order)).is_empty());
        // top half never moves
        assert_eq!(order[..4], teams[..4]);
    }

    #[test]
    fn test_avoid_replays_without_rematches_keeps_order() {
        let (teams, _) = group_stage();
        let order = avoid_replays(&teams, &Encounters::default(), 100, simulate);
        assert_eq!(order, teams);
    }

    #[test]
    fn test_avoid_replays_gives_up_on_iteration_cap() {
        let (teams, encounters) = group_stage();
        let order = avoid_replays(&teams, &encounters, 1, simulate);
        assert_eq!(order, teams);
    }

    #[test]
    fn test_avoid_replays_single_rematch() {
        // seeds 1 and 8 met before
        let encounters = Encounters::from_matches(&[played(0, 1, 3)]);
        let teams = vec![1, 2, 4, 5, 6, 7, 8, 3];
        let order = avoid_replays(&teams, &encounters, 100, simulate);

        assert_eq!(order, vec![1, 2, 4, 5, 3, 7, 8, 6]);
        assert!(encounters.replays(&simulate(&order)).is_empty());
    }
}
