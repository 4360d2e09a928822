//! Utility functions for the tournament engine

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Unix seconds to a UTC timestamp, `None` when out of range
pub fn from_unix_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

/// Smallest power of two that is greater than or equal to `n` (1 for 0)
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Pad a seed list with empty slots (byes) up to the next power of two
pub fn fill_with_null_till_power_of_two<T: Clone>(items: &[T]) -> Vec<Option<T>> {
    let size = next_power_of_two(items.len());
    items
        .iter()
        .cloned()
        .map(Some)
        .chain(std::iter::repeat(None))
        .take(size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_power_of_two() {
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(1), 1);
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(8), 8);
        assert_eq!(next_power_of_two(9), 16);
    }

    #[test]
    fn test_fill_with_null_till_power_of_two() {
        let filled = fill_with_null_till_power_of_two(&[1, 2, 3, 4, 5]);
        assert_eq!(filled.len(), 8);
        assert_eq!(filled[4], Some(5));
        assert!(filled[5..].iter().all(Option::is_none));

        let exact = fill_with_null_till_power_of_two(&[1, 2, 3, 4]);
        assert_eq!(exact, vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn test_from_unix_seconds() {
        let timestamp = from_unix_seconds(0).unwrap();
        assert_eq!(timestamp.timestamp(), 0);
    }
}
