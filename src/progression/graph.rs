//! Structural queries over a progression
//!
//! Every walk keeps a visited set, so these terminate on cyclic input too.

use std::collections::BTreeSet;

use super::ProgressionError;
use crate::types::{BracketIdx, BracketType, ParsedBracket};

fn check_bounds(idx: BracketIdx, brackets: &[ParsedBracket]) -> Result<(), ProgressionError> {
    if idx >= brackets.len() {
        return Err(ProgressionError::IndexOutOfBounds {
            idx,
            len: brackets.len(),
        });
    }
    Ok(())
}

/// First bracket without sources, or 0 if every bracket has sources
pub fn entry_bracket_idx(brackets: &[ParsedBracket]) -> BracketIdx {
    brackets
        .iter()
        .position(|bracket| bracket.sources.is_none())
        .unwrap_or(0)
}

/// The champion-deciding chain: starting from bracket 0, repeatedly follow
/// the first bracket that takes 1st place of the current one.
pub fn main_progression(brackets: &[ParsedBracket]) -> Vec<BracketIdx> {
    if brackets.is_empty() {
        return Vec::new();
    }

    let mut chain = vec![0];
    let mut current = 0;
    while let Some(next) = brackets.iter().position(|bracket| {
        bracket.sources.iter().flatten().any(|source| {
            source.bracket_idx == current && source.placements.contains(&1)
        })
    }) {
        if chain.contains(&next) {
            break;
        }
        chain.push(next);
        current = next;
    }

    chain
}

/// Whether the bracket decides the final standings of the tournament
pub fn is_finals(idx: BracketIdx, brackets: &[ParsedBracket]) -> Result<bool, ProgressionError> {
    check_bounds(idx, brackets)?;
    Ok(main_progression(brackets).last() == Some(&idx))
}

/// Whether the bracket is outside the main progression (e.g. a bracket for early losers)
pub fn is_underground(
    idx: BracketIdx,
    brackets: &[ParsedBracket],
) -> Result<bool, ProgressionError> {
    check_bounds(idx, brackets)?;
    Ok(!main_progression(brackets).contains(&idx))
}

/// Brackets that list `source_idx` as a source, in progression order
pub fn destinations_from_bracket_idx(
    source_idx: BracketIdx,
    brackets: &[ParsedBracket],
) -> Vec<BracketIdx> {
    brackets
        .iter()
        .enumerate()
        .filter(|(_, bracket)| bracket.sources_from(source_idx))
        .map(|(idx, _)| idx)
        .collect()
}

/// `start` followed by every bracket reachable from it through sources, depth first
pub fn brackets_reachable_from(start: BracketIdx, brackets: &[ParsedBracket]) -> Vec<BracketIdx> {
    let mut visited = Vec::new();
    let mut stack = vec![start];

    while let Some(idx) = stack.pop() {
        if visited.contains(&idx) {
            continue;
        }
        visited.push(idx);

        let mut destinations = destinations_from_bracket_idx(idx, brackets);
        destinations.reverse();
        stack.extend(destinations);
    }

    visited
}

/// Every bracket `idx` takes teams from, directly or through other brackets.
/// Contains `idx` itself only if the progression is circular.
pub(crate) fn sources_transitively(
    idx: BracketIdx,
    brackets: &[ParsedBracket],
) -> BTreeSet<BracketIdx> {
    let mut found = BTreeSet::new();
    let mut stack = vec![idx];

    while let Some(current) = stack.pop() {
        let Some(bracket) = brackets.get(current) else {
            continue;
        };
        for source in bracket.sources.iter().flatten() {
            if found.insert(source.bracket_idx) {
                stack.push(source.bracket_idx);
            }
        }
    }

    found
}

/// Order in which brackets rank their teams in the overall standings, best first.
///
/// Brackets that feed another bracket are left out (their teams are ranked
/// by the later bracket), except the entry bracket. Brackets fed only by
/// double elimination brackets are underground and left out too.
pub fn bracket_idxs_for_standings(brackets: &[ParsedBracket]) -> Vec<BracketIdx> {
    if brackets.is_empty() {
        return Vec::new();
    }

    let entry_idx = entry_bracket_idx(brackets);

    let mut result: Vec<BracketIdx> = brackets_reachable_from(entry_idx, brackets)
        .into_iter()
        .filter(|idx| *idx == entry_idx || destinations_from_bracket_idx(*idx, brackets).is_empty())
        .filter(|idx| !is_sourced_only_from_double_elimination(*idx, brackets))
        .collect();

    result.sort_by_key(|idx| (min_sourced_placement(*idx, brackets), *idx));
    result
}

fn is_sourced_only_from_double_elimination(idx: BracketIdx, brackets: &[ParsedBracket]) -> bool {
    match brackets.get(idx).and_then(|bracket| bracket.sources.as_ref()) {
        Some(sources) if !sources.is_empty() => sources.iter().all(|source| {
            brackets
                .get(source.bracket_idx)
                .is_some_and(|source_bracket| source_bracket.bracket_type == BracketType::DoubleElimination)
        }),
        _ => false,
    }
}

/// Lowest placement the bracket takes; brackets without sources sort last
fn min_sourced_placement(idx: BracketIdx, brackets: &[ParsedBracket]) -> i64 {
    brackets
        .get(idx)
        .and_then(|bracket| bracket.sourced_placements().min())
        .map(i64::from)
        .unwrap_or(i64::MAX)
}
