//! Structural rules a progression must satisfy
//!
//! Rules run in a fixed order and the first one that fails is reported.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::graph::{main_progression, sources_transitively};
use super::{ValidationError, SWISS_DEFAULT_GROUP_COUNT};
use crate::types::{BracketIdx, BracketType, ParsedBracket};

/// Check already parsed brackets for problems in how the progression is laid out.
///
/// Every source must point at an earlier bracket. Rules after that check
/// only ever see sources inside the list.
pub fn brackets_to_validation_error(brackets: &[ParsedBracket]) -> Option<ValidationError> {
    if let Some(bracket_idxs) = circular_progression(brackets) {
        return Some(ValidationError::CircularProgression { bracket_idxs });
    }

    if let Some((bracket_idx, source_bracket_idx)) = source_not_earlier(brackets) {
        return Some(ValidationError::SourceBracketNotEarlier {
            bracket_idx,
            source_bracket_idx,
        });
    }

    if !resolves_winner(brackets) {
        return Some(ValidationError::NotResolvingWinner);
    }

    if let Some(bracket_idxs) = same_placement_to_multiple_brackets(brackets) {
        return Some(ValidationError::SamePlacementToMultipleBrackets { bracket_idxs });
    }

    if let Some(bracket_idxs) = duplicate_names(brackets) {
        return Some(ValidationError::DuplicateBracketName { bracket_idxs });
    }

    if let Some(bracket_idxs) = gap_in_placements(brackets) {
        return Some(ValidationError::GapInPlacements { bracket_idxs });
    }

    if let Some(bracket_idx) = too_many_placements(brackets) {
        return Some(ValidationError::TooManyPlacements { bracket_idx });
    }

    if let Some(bracket_idx) = name_missing(brackets) {
        return Some(ValidationError::NameMissing { bracket_idx });
    }

    if let Some(bracket_idx) = negative_progression(brackets) {
        return Some(ValidationError::NegativeProgression { bracket_idx });
    }

    if let Some(bracket_idx) = single_elimination_as_source(brackets) {
        return Some(ValidationError::NoSeSource { bracket_idx });
    }

    if let Some(bracket_idx) = double_elimination_positive(brackets) {
        return Some(ValidationError::NoDePositive { bracket_idx });
    }

    None
}

/// Every `(destination, source bracket, source type, placements)` edge with a valid source index
fn source_edges(
    brackets: &[ParsedBracket],
) -> impl Iterator<Item = (BracketIdx, BracketIdx, BracketType, &[i32])> + '_ {
    brackets.iter().enumerate().flat_map(move |(bracket_idx, bracket)| {
        bracket.sources.iter().flatten().filter_map(move |source| {
            brackets.get(source.bracket_idx).map(|source_bracket| {
                (
                    bracket_idx,
                    source.bracket_idx,
                    source_bracket.bracket_type,
                    source.placements.as_slice(),
                )
            })
        })
    })
}

/// First source that is not built before its destination, out of range included
fn source_not_earlier(brackets: &[ParsedBracket]) -> Option<(BracketIdx, BracketIdx)> {
    brackets
        .iter()
        .enumerate()
        .flat_map(|(bracket_idx, bracket)| {
            bracket
                .sources
                .iter()
                .flatten()
                .map(move |source| (bracket_idx, source.bracket_idx))
        })
        .find(|(bracket_idx, source_bracket_idx)| source_bracket_idx >= bracket_idx)
}

fn circular_progression(brackets: &[ParsedBracket]) -> Option<Vec<BracketIdx>> {
    let circular: Vec<BracketIdx> = (0..brackets.len())
        .filter(|idx| sources_transitively(*idx, brackets).contains(idx))
        .collect();

    (!circular.is_empty()).then_some(circular)
}

fn resolves_winner(brackets: &[ParsedBracket]) -> bool {
    let Some(finals) = main_progression(brackets)
        .last()
        .and_then(|idx| brackets.get(*idx))
    else {
        return false;
    };

    match finals.bracket_type {
        BracketType::RoundRobin => false,
        BracketType::Swiss => {
            finals
                .settings
                .group_count
                .unwrap_or(SWISS_DEFAULT_GROUP_COUNT)
                <= 1
        }
        BracketType::SingleElimination | BracketType::DoubleElimination => true,
    }
}

fn same_placement_to_multiple_brackets(brackets: &[ParsedBracket]) -> Option<Vec<BracketIdx>> {
    let mut claims: BTreeMap<(BracketIdx, i32), Vec<BracketIdx>> = BTreeMap::new();

    for (bracket_idx, source_idx, _, placements) in source_edges(brackets) {
        for placement in placements {
            claims
                .entry((source_idx, *placement))
                .or_default()
                .push(bracket_idx);
        }
    }

    let mut result = Vec::new();
    for bracket_idxs in claims.values().filter(|claimed_by| claimed_by.len() > 1) {
        for bracket_idx in bracket_idxs {
            if !result.contains(bracket_idx) {
                result.push(*bracket_idx);
            }
        }
    }

    (!result.is_empty()).then_some(result)
}

fn duplicate_names(brackets: &[ParsedBracket]) -> Option<Vec<BracketIdx>> {
    let mut seen: HashMap<&str, BracketIdx> = HashMap::new();

    for (bracket_idx, bracket) in brackets.iter().enumerate() {
        if let Some(first_idx) = seen.get(bracket.name.as_str()) {
            return Some(vec![*first_idx, bracket_idx]);
        }
        seen.insert(&bracket.name, bracket_idx);
    }

    None
}

fn gap_in_placements(brackets: &[ParsedBracket]) -> Option<Vec<BracketIdx>> {
    let mut placements_by_source: BTreeMap<BracketIdx, BTreeSet<i32>> = BTreeMap::new();

    for (_, source_idx, _, placements) in source_edges(brackets) {
        placements_by_source
            .entry(source_idx)
            .or_default()
            .extend(placements.iter().filter(|placement| **placement > 0));
    }

    // positive placements must be exactly 1..=n
    let problematic_source = placements_by_source
        .into_iter()
        .find(|(_, placements)| {
            placements
                .iter()
                .zip(1..)
                .any(|(placement, expected)| *placement != expected)
        })
        .map(|(source_idx, _)| source_idx)?;

    Some(
        brackets
            .iter()
            .enumerate()
            .filter(|(_, bracket)| bracket.sources_from(problematic_source))
            .map(|(bracket_idx, _)| bracket_idx)
            .collect(),
    )
}

fn too_many_placements(brackets: &[ParsedBracket]) -> Option<BracketIdx> {
    let round_robins: Vec<BracketIdx> = brackets
        .iter()
        .enumerate()
        .filter(|(_, bracket)| bracket.bracket_type == BracketType::RoundRobin)
        .map(|(bracket_idx, _)| bracket_idx)
        .collect();

    // smallest configured group size; unconfigured groups do not limit
    let group_size = round_robins
        .iter()
        .filter_map(|idx| brackets[*idx].settings.teams_per_group)
        .min()?;

    source_edges(brackets)
        .find(|(_, source_idx, _, placements)| {
            round_robins.contains(source_idx)
                && placements
                    .iter()
                    .any(|placement| i64::from(*placement) > i64::from(group_size))
        })
        .map(|(bracket_idx, ..)| bracket_idx)
}

fn name_missing(brackets: &[ParsedBracket]) -> Option<BracketIdx> {
    brackets
        .iter()
        .position(|bracket| bracket.name.is_empty())
}

fn negative_progression(brackets: &[ParsedBracket]) -> Option<BracketIdx> {
    source_edges(brackets)
        .find(|(_, _, source_type, placements)| {
            !source_type.is_elimination() && placements.iter().any(|placement| *placement < 0)
        })
        .map(|(bracket_idx, ..)| bracket_idx)
}

fn single_elimination_as_source(brackets: &[ParsedBracket]) -> Option<BracketIdx> {
    source_edges(brackets)
        .find(|(_, _, source_type, _)| *source_type == BracketType::SingleElimination)
        .map(|(bracket_idx, ..)| bracket_idx)
}

fn double_elimination_positive(brackets: &[ParsedBracket]) -> Option<BracketIdx> {
    source_edges(brackets)
        .find(|(_, _, source_type, placements)| {
            *source_type == BracketType::DoubleElimination
                && placements.iter().any(|placement| *placement > 0)
        })
        .map(|(bracket_idx, ..)| bracket_idx)
}
