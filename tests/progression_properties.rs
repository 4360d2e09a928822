//! Property tests for placement parsing and progression graph queries

use bracket_progression::progression::parse::MAX_PLACEMENT;
use bracket_progression::progression::{
    bracket_idxs_for_standings, brackets_to_validation_error, is_finals, is_underground,
    main_progression, parse_placements,
};
use bracket_progression::{BracketType, ParsedBracket, Source, ValidationError};
use proptest::prelude::*;

/// Round robin chain where each bracket takes the top of the previous one,
/// ending in a single elimination final
fn chain(cuts: &[i32]) -> Vec<ParsedBracket> {
    let mut brackets = vec![ParsedBracket::new("Bracket 0", BracketType::RoundRobin)];
    for (i, cut) in cuts.iter().enumerate() {
        let bracket_type = if i + 1 == cuts.len() {
            BracketType::SingleElimination
        } else {
            BracketType::RoundRobin
        };
        brackets.push(
            ParsedBracket::new(format!("Bracket {}", i + 1), bracket_type).with_sources(vec![
                Source {
                    bracket_idx: i,
                    placements: (1..=*cut).collect(),
                },
            ]),
        );
    }
    brackets
}

fn cuts_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(1..=16i32, 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn test_range_expands_inclusive(start in 1..=MAX_PLACEMENT, len in 0..64i32) {
        let end = (start + len).min(MAX_PLACEMENT);
        let parsed = parse_placements(&format!("{}-{}", start, end));
        prop_assert_eq!(parsed, Some((start..=end).collect::<Vec<_>>()));
    }

    #[test]
    fn test_list_ignores_whitespace(
        placements in prop::collection::vec(1..=MAX_PLACEMENT, 1..12),
        padding in prop::collection::vec(0..3usize, 12),
    ) {
        let input = placements
            .iter()
            .zip(padding.iter())
            .map(|(placement, pad)| format!("{}{}{}", " ".repeat(*pad), placement, " ".repeat(*pad)))
            .collect::<Vec<_>>()
            .join(",");
        prop_assert_eq!(parse_placements(&input), Some(placements));
    }

    #[test]
    fn test_out_of_range_rejected(placement in (MAX_PLACEMENT + 1)..i32::MAX) {
        prop_assert_eq!(parse_placements(&placement.to_string()), None);
        prop_assert_eq!(parse_placements(&format!("1-{}", placement)), None);
    }

    #[test]
    fn test_reversed_range_rejected(start in 2..=MAX_PLACEMENT, gap in 1..64i32) {
        let end = (start - gap).max(1);
        prop_assert_eq!(parse_placements(&format!("{}-{}", start, end)), None);
    }

    #[test]
    fn test_chain_is_valid(cuts in cuts_strategy()) {
        let brackets = chain(&cuts);
        prop_assert_eq!(brackets_to_validation_error(&brackets), None);

        let last = brackets.len() - 1;
        prop_assert_eq!(main_progression(&brackets), (0..=last).collect::<Vec<_>>());
        for idx in 0..=last {
            prop_assert_eq!(is_finals(idx, &brackets).unwrap(), idx == last);
            prop_assert!(!is_underground(idx, &brackets).unwrap());
        }

        // the final first, the entry bracket last
        let standings_order = bracket_idxs_for_standings(&brackets);
        prop_assert_eq!(standings_order.first(), Some(&last));
        prop_assert_eq!(standings_order.last(), Some(&0));
    }

    #[test]
    fn test_side_bracket_is_underground(top in 1..=8i32, rest in 1..=8i32) {
        let brackets = vec![
            ParsedBracket::new("Groups", BracketType::RoundRobin),
            ParsedBracket::new("Top cut", BracketType::SingleElimination).with_sources(vec![Source {
                bracket_idx: 0,
                placements: (1..=top).collect(),
            }]),
            ParsedBracket::new("Side cut", BracketType::SingleElimination).with_sources(vec![Source {
                bracket_idx: 0,
                placements: (top + 1..=top + rest).collect(),
            }]),
        ];

        prop_assert_eq!(brackets_to_validation_error(&brackets), None);
        prop_assert!(is_finals(1, &brackets).unwrap());
        prop_assert!(is_underground(2, &brackets).unwrap());
        prop_assert!(!is_finals(2, &brackets).unwrap());

        // every bracket counts, better placements first
        prop_assert_eq!(bracket_idxs_for_standings(&brackets), vec![1, 2, 0]);
    }

    #[test]
    fn test_back_edge_is_circular(cuts in prop::collection::vec(1..=16i32, 2..6)) {
        let mut brackets = chain(&cuts);
        let last = brackets.len() - 1;
        brackets[1].sources = Some(vec![Source {
            bracket_idx: last,
            placements: vec![1],
        }]);

        let is_circular = matches!(
            brackets_to_validation_error(&brackets),
            Some(ValidationError::CircularProgression { .. })
        );
        prop_assert!(is_circular);
    }

    #[test]
    fn test_out_of_bounds_index_rejected(cuts in cuts_strategy(), extra in 0..8usize) {
        let brackets = chain(&cuts);
        let idx = brackets.len() + extra;
        prop_assert!(is_finals(idx, &brackets).is_err());
        prop_assert!(is_underground(idx, &brackets).is_err());
    }
}
