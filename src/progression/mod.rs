//! Progression graph validation and queries
//!
//! A progression is an ordered list of brackets where every bracket except
//! the entry bracket takes placements of earlier brackets as its teams. This
//! module turns organizer input into the canonical [`ParsedBracket`] form,
//! rejects graphs that can not produce a single champion and answers
//! structural questions (finals, underground brackets, standings order).
//!
//! [`ParsedBracket`]: crate::types::ParsedBracket

pub mod graph;
pub mod parse;
pub mod validation;

use serde::{Deserialize, Serialize};

use crate::types::BracketIdx;

pub use graph::{
    bracket_idxs_for_standings, brackets_reachable_from, destinations_from_bracket_idx,
    entry_bracket_idx, is_finals, is_underground, main_progression,
};
pub use parse::{
    changed_bracket_progression, changed_bracket_progression_format, parse_placements,
    placements_to_string, to_input_format, validated_brackets,
};
pub use validation::brackets_to_validation_error;

/// Swiss group count assumed when a bracket does not configure one
pub const SWISS_DEFAULT_GROUP_COUNT: u32 = 1;

/// Structural problem in an organizer-authored progression.
/// Exactly one is reported per graph, by fixed precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationError {
    #[error("Placements of bracket {bracket_idx} can not be parsed")]
    #[serde(rename_all = "camelCase")]
    PlacementsParseError { bracket_idx: BracketIdx },

    #[error("Brackets {bracket_idxs:?} source from themselves")]
    #[serde(rename_all = "camelCase")]
    CircularProgression { bracket_idxs: Vec<BracketIdx> },

    #[error("Bracket {bracket_idx} sources from bracket {source_bracket_idx}, which does not come before it")]
    #[serde(rename_all = "camelCase")]
    SourceBracketNotEarlier {
        bracket_idx: BracketIdx,
        source_bracket_idx: BracketIdx,
    },

    #[error("The final bracket does not resolve a winner")]
    NotResolvingWinner,

    #[error("Brackets {bracket_idxs:?} take the same placement")]
    #[serde(rename_all = "camelCase")]
    SamePlacementToMultipleBrackets { bracket_idxs: Vec<BracketIdx> },

    #[error("Brackets {bracket_idxs:?} share a name")]
    #[serde(rename_all = "camelCase")]
    DuplicateBracketName { bracket_idxs: Vec<BracketIdx> },

    #[error("Brackets {bracket_idxs:?} leave a gap in placements")]
    #[serde(rename_all = "camelCase")]
    GapInPlacements { bracket_idxs: Vec<BracketIdx> },

    #[error("Bracket {bracket_idx} takes more placements than a round robin group has")]
    #[serde(rename_all = "camelCase")]
    TooManyPlacements { bracket_idx: BracketIdx },

    #[error("Bracket {bracket_idx} has no name")]
    #[serde(rename_all = "camelCase")]
    NameMissing { bracket_idx: BracketIdx },

    #[error("Bracket {bracket_idx} takes negative placements from a non-elimination bracket")]
    #[serde(rename_all = "camelCase")]
    NegativeProgression { bracket_idx: BracketIdx },

    #[error("Bracket {bracket_idx} sources from a single elimination bracket")]
    #[serde(rename_all = "camelCase")]
    NoSeSource { bracket_idx: BracketIdx },

    #[error("Bracket {bracket_idx} takes positive placements from a double elimination bracket")]
    #[serde(rename_all = "camelCase")]
    NoDePositive { bracket_idx: BracketIdx },
}

/// Failure of a progression operation. `Invalid` is an organizer mistake,
/// the other variants mean the caller handed over inconsistent input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Expected exactly one bracket without sources, found {count}")]
    EntryBracketCount { count: usize },

    #[error("Bracket {bracket_idx} sources from unknown bracket \"{bracket_id}\"")]
    UnknownSourceBracket {
        bracket_idx: BracketIdx,
        bracket_id: String,
    },

    #[error("Bracket index {idx} out of bounds (progression has {len} brackets)")]
    IndexOutOfBounds { idx: BracketIdx, len: usize },
}

impl ProgressionError {
    /// The validation error, if this is an organizer mistake
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            ProgressionError::Invalid(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_wire_format() {
        let error = ValidationError::SamePlacementToMultipleBrackets {
            bracket_idxs: vec![1, 2],
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "SAME_PLACEMENT_TO_MULTIPLE_BRACKETS");
        assert_eq!(json["bracketIdxs"], serde_json::json!([1, 2]));

        let json = serde_json::to_value(ValidationError::NoSeSource { bracket_idx: 3 }).unwrap();
        assert_eq!(json["type"], "NO_SE_SOURCE");
        assert_eq!(json["bracketIdx"], 3);

        let json = serde_json::to_value(ValidationError::SourceBracketNotEarlier {
            bracket_idx: 0,
            source_bracket_idx: 1,
        })
        .unwrap();
        assert_eq!(json["type"], "SOURCE_BRACKET_NOT_EARLIER");
        assert_eq!(json["sourceBracketIdx"], 1);

        let json = serde_json::to_value(ValidationError::NotResolvingWinner).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "NOT_RESOLVING_WINNER" }));
    }

    #[test]
    fn test_progression_error_wraps_validation_error() {
        let error: ProgressionError = ValidationError::NameMissing { bracket_idx: 0 }.into();
        assert_eq!(
            error.validation_error(),
            Some(&ValidationError::NameMissing { bracket_idx: 0 })
        );
        assert!(ProgressionError::EntryBracketCount { count: 2 }
            .validation_error()
            .is_none());
    }
}
