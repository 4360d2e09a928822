//! Conversion between the organizer-editable progression and its parsed form

use tracing::debug;

use super::{validation::brackets_to_validation_error, ProgressionError, ValidationError};
use crate::types::{EditableSource, InputBracket, ParsedBracket, Source};
use crate::utils::from_unix_seconds;

/// Largest placement a range may expand to
pub const MAX_PLACEMENT: i32 = 1024;

fn parse_number(part: &str) -> Option<i32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    part.parse::<i32>()
        .ok()
        .filter(|value| (1..=MAX_PLACEMENT).contains(value))
}

/// Parse a placement string such as `"1-3,5"` or `"-1,-2"`.
///
/// Tokens are comma separated and trimmed. A token is a positive number,
/// an inclusive range `a-b` with `a <= b`, or a standalone negative number.
/// Returns `None` on the first token that does not fit.
pub fn parse_placements(input: &str) -> Option<Vec<i32>> {
    let mut result = Vec::new();

    for part in input.split(',') {
        let part = part.trim();

        if let Some(negative) = part.strip_prefix('-') {
            result.push(-parse_number(negative)?);
            continue;
        }

        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_number(start)?;
                let end = parse_number(end)?;
                if start > end {
                    return None;
                }
                result.extend(start..=end);
            }
            None => result.push(parse_number(part)?),
        }
    }

    Some(result)
}

/// Inverse of [`parse_placements`]: consecutive positive placements collapse
/// into ranges, negative placements are listed from the worst upwards.
pub fn placements_to_string(placements: &[i32]) -> String {
    let mut sorted = placements.to_vec();
    sorted.sort_unstable();

    if sorted.iter().any(|placement| *placement < 0) {
        sorted.reverse();
        return sorted
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(",");
    }

    let mut ranges: Vec<String> = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let (mut start, mut end) = (first, first);
    let push_range = |ranges: &mut Vec<String>, start: i32, end: i32| {
        if start == end {
            ranges.push(start.to_string());
        } else {
            ranges.push(format!("{}-{}", start, end));
        }
    };

    for placement in iter {
        if placement == end + 1 {
            end = placement;
        } else {
            push_range(&mut ranges, start, end);
            start = placement;
            end = placement;
        }
    }
    push_range(&mut ranges, start, end);

    ranges.join(",")
}

/// Validate organizer input and return the progression ready to be stored.
pub fn validated_brackets(
    brackets: &[InputBracket],
) -> Result<Vec<ParsedBracket>, ProgressionError> {
    let parsed = to_parsed_format(brackets)?;

    let entry_bracket_count = parsed
        .iter()
        .filter(|bracket| bracket.sources.is_none())
        .count();
    if entry_bracket_count != 1 {
        return Err(ProgressionError::EntryBracketCount {
            count: entry_bracket_count,
        });
    }

    if let Some(error) = brackets_to_validation_error(&parsed) {
        debug!("Progression rejected: {}", error);
        return Err(error.into());
    }

    Ok(parsed)
}

fn to_parsed_format(brackets: &[InputBracket]) -> Result<Vec<ParsedBracket>, ProgressionError> {
    // placements of every bracket are parsed before any source id is resolved
    let mut parsed_placements = Vec::with_capacity(brackets.len());
    for (bracket_idx, bracket) in brackets.iter().enumerate() {
        let placements = bracket
            .sources
            .as_ref()
            .map(|sources| {
                sources
                    .iter()
                    .map(|source| parse_placements(&source.placements))
                    .collect::<Option<Vec<_>>>()
            })
            .map(|placements| {
                placements.ok_or(ValidationError::PlacementsParseError { bracket_idx })
            })
            .transpose()?;
        parsed_placements.push(placements);
    }

    brackets
        .iter()
        .zip(parsed_placements)
        .enumerate()
        .map(|(bracket_idx, (bracket, placements))| -> Result<ParsedBracket, ProgressionError> {
            let sources = match (&bracket.sources, placements) {
                (Some(sources), Some(placements)) => Some(
                    sources
                        .iter()
                        .zip(placements)
                        .map(|(source, placements)| {
                            resolve_source(brackets, bracket_idx, source, placements)
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                _ => None,
            };

            Ok(ParsedBracket {
                bracket_type: bracket.bracket_type,
                name: bracket.name.clone(),
                settings: bracket.settings.clone(),
                requires_check_in: bracket.requires_check_in,
                start_time: bracket.start_time.map(|time| time.timestamp()),
                sources,
            })
        })
        .collect()
}

fn resolve_source(
    brackets: &[InputBracket],
    bracket_idx: usize,
    source: &EditableSource,
    placements: Vec<i32>,
) -> Result<Source, ProgressionError> {
    let source_idx = brackets
        .iter()
        .position(|bracket| bracket.id == source.bracket_id)
        .ok_or_else(|| ProgressionError::UnknownSourceBracket {
            bracket_idx,
            bracket_id: source.bracket_id.clone(),
        })?;

    Ok(Source {
        bracket_idx: source_idx,
        placements,
    })
}

/// Turn a stored progression back into the editable form
pub fn to_input_format(brackets: &[ParsedBracket]) -> Vec<InputBracket> {
    brackets
        .iter()
        .enumerate()
        .map(|(bracket_idx, bracket)| InputBracket {
            id: bracket_idx.to_string(),
            bracket_type: bracket.bracket_type,
            name: bracket.name.clone(),
            settings: bracket.settings.clone(),
            requires_check_in: bracket.requires_check_in,
            start_time: bracket.start_time.and_then(from_unix_seconds),
            sources: bracket.sources.as_ref().map(|sources| {
                sources
                    .iter()
                    .map(|source| EditableSource {
                        bracket_id: source.bracket_idx.to_string(),
                        placements: placements_to_string(&source.placements),
                    })
                    .collect()
            }),
            disabled: false,
        })
        .collect()
}

/// Indices of `old` whose bracket is missing or differs in any field in `new`
pub fn changed_bracket_progression(old: &[ParsedBracket], new: &[ParsedBracket]) -> Vec<usize> {
    old.iter()
        .enumerate()
        .filter(|(idx, bracket)| new.get(*idx) != Some(*bracket))
        .map(|(idx, _)| idx)
        .collect()
}

/// Whether name, type or settings of any existing bracket changed.
/// Sources, start time and check-in requirement are ignored.
pub fn changed_bracket_progression_format(old: &[ParsedBracket], new: &[ParsedBracket]) -> bool {
    old.iter().enumerate().any(|(idx, old_bracket)| match new.get(idx) {
        None => true,
        Some(new_bracket) => {
            new_bracket.name != old_bracket.name
                || new_bracket.bracket_type != old_bracket.bracket_type
                || new_bracket.settings != old_bracket.settings
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BracketSettings, BracketType};

    fn input(id: &str, name: &str, bracket_type: BracketType) -> InputBracket {
        InputBracket {
            id: id.to_string(),
            bracket_type,
            name: name.to_string(),
            settings: BracketSettings::default(),
            requires_check_in: false,
            start_time: None,
            sources: None,
            disabled: false,
        }
    }

    fn sourced(mut bracket: InputBracket, from: &str, placements: &str) -> InputBracket {
        bracket.sources = Some(vec![EditableSource {
            bracket_id: from.to_string(),
            placements: placements.to_string(),
        }]);
        bracket
    }

    #[test]
    fn test_parse_placements_forms() {
        assert_eq!(parse_placements("1,2,3-4"), Some(vec![1, 2, 3, 4]));
        assert_eq!(parse_placements("1-4"), Some(vec![1, 2, 3, 4]));
        assert_eq!(parse_placements("1, 2, 3,4 "), Some(vec![1, 2, 3, 4]));
        assert_eq!(parse_placements("-1,-2"), Some(vec![-1, -2]));
        assert_eq!(parse_placements("3"), Some(vec![3]));
    }

    #[test]
    fn test_parse_placements_rejects_garbage() {
        assert_eq!(parse_placements("1st,2nd"), None);
        assert_eq!(parse_placements(""), None);
        assert_eq!(parse_placements("1,,2"), None);
        assert_eq!(parse_placements("-1-3"), None);
        assert_eq!(parse_placements("1-2-3"), None);
        assert_eq!(parse_placements("0"), None);
        assert_eq!(parse_placements("4-1"), None);
        assert_eq!(parse_placements("1-99999"), None);
    }

    #[test]
    fn test_placements_to_string() {
        assert_eq!(placements_to_string(&[1, 2, 3]), "1-3");
        assert_eq!(placements_to_string(&[3, 1, 2, 5]), "1-3,5");
        assert_eq!(placements_to_string(&[1, 3, 5]), "1,3,5");
        assert_eq!(placements_to_string(&[-2, -1]), "-1,-2");
        assert_eq!(placements_to_string(&[]), "");
    }

    #[test]
    fn test_validated_brackets_resolves_ids() {
        let brackets = vec![
            input("groups", "Groups", BracketType::RoundRobin),
            sourced(
                input("top", "Top cut", BracketType::SingleElimination),
                "groups",
                "1-2",
            ),
        ];

        let parsed = validated_brackets(&brackets).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].sources.is_none());
        assert_eq!(
            parsed[1].sources,
            Some(vec![Source {
                bracket_idx: 0,
                placements: vec![1, 2]
            }])
        );
    }

    #[test]
    fn test_validated_brackets_parse_error() {
        let brackets = vec![
            input("groups", "Groups", BracketType::RoundRobin),
            sourced(
                input("top", "Top cut", BracketType::SingleElimination),
                "groups",
                "1st,2nd",
            ),
        ];

        assert_eq!(
            validated_brackets(&brackets),
            Err(ProgressionError::Invalid(
                ValidationError::PlacementsParseError { bracket_idx: 1 }
            ))
        );
    }

    #[test]
    fn test_validated_brackets_parse_error_reported_before_unknown_source() {
        let brackets = vec![
            input("groups", "Groups", BracketType::RoundRobin),
            sourced(
                input("top", "Top cut", BracketType::SingleElimination),
                "missing",
                "1-2",
            ),
            sourced(
                input("low", "Low cut", BracketType::SingleElimination),
                "groups",
                "x",
            ),
        ];

        assert_eq!(
            validated_brackets(&brackets),
            Err(ProgressionError::Invalid(
                ValidationError::PlacementsParseError { bracket_idx: 2 }
            ))
        );
    }

    #[test]
    fn test_validated_brackets_unknown_source() {
        let brackets = vec![
            input("groups", "Groups", BracketType::RoundRobin),
            sourced(
                input("top", "Top cut", BracketType::SingleElimination),
                "missing",
                "1-2",
            ),
        ];

        assert!(matches!(
            validated_brackets(&brackets),
            Err(ProgressionError::UnknownSourceBracket { bracket_idx: 1, .. })
        ));
    }

    #[test]
    fn test_validated_brackets_rejects_later_source() {
        let brackets = vec![
            sourced(
                input("top", "Top cut", BracketType::SingleElimination),
                "groups",
                "1-2",
            ),
            input("groups", "Groups", BracketType::RoundRobin),
        ];

        assert_eq!(
            validated_brackets(&brackets),
            Err(ProgressionError::Invalid(
                ValidationError::SourceBracketNotEarlier {
                    bracket_idx: 0,
                    source_bracket_idx: 1
                }
            ))
        );
    }

    #[test]
    fn test_validated_brackets_entry_count() {
        let brackets = vec![
            input("a", "A", BracketType::SingleElimination),
            input("b", "B", BracketType::SingleElimination),
        ];

        assert_eq!(
            validated_brackets(&brackets),
            Err(ProgressionError::EntryBracketCount { count: 2 })
        );
    }

    #[test]
    fn test_to_input_format() {
        let parsed = vec![
            ParsedBracket::new("Groups", BracketType::RoundRobin),
            ParsedBracket::new("Top cut", BracketType::SingleElimination).with_sources(vec![
                Source {
                    bracket_idx: 0,
                    placements: vec![2, 1],
                },
            ]),
        ];

        let input = to_input_format(&parsed);
        assert_eq!(input[0].id, "0");
        assert!(input[0].sources.is_none());
        let sources = input[1].sources.as_ref().unwrap();
        assert_eq!(sources[0].bracket_id, "0");
        assert_eq!(sources[0].placements, "1-2");

        let reparsed = validated_brackets(&input).unwrap();
        let sources = reparsed[1].sources.as_ref().unwrap();
        assert_eq!(sources[0].placements, vec![1, 2]);
    }

    #[test]
    fn test_changed_bracket_progression() {
        let old = vec![
            ParsedBracket::new("Groups", BracketType::RoundRobin),
            ParsedBracket::new("Top cut", BracketType::SingleElimination),
        ];

        assert!(changed_bracket_progression(&old, &old).is_empty());

        let mut new = old.clone();
        new[1].requires_check_in = true;
        assert_eq!(changed_bracket_progression(&old, &new), vec![1]);
        assert!(!changed_bracket_progression_format(&old, &new));

        assert_eq!(changed_bracket_progression(&old, &old[..1]), vec![1]);
        assert!(changed_bracket_progression_format(&old, &old[..1]));
    }

    #[test]
    fn test_changed_bracket_progression_format_settings() {
        let old = vec![ParsedBracket::new("Groups", BracketType::RoundRobin)];
        let new = vec![
            ParsedBracket::new("Groups", BracketType::RoundRobin).with_settings(BracketSettings {
                teams_per_group: Some(6),
                ..BracketSettings::default()
            }),
        ];

        assert!(changed_bracket_progression_format(&old, &new));
        assert_eq!(changed_bracket_progression(&old, &new), vec![0]);
    }
}
