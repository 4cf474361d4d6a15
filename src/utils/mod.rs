//! Utility functions and helpers

pub mod formats;

pub use formats::{from_sprs_csc, to_sprs_csc};

/// Computes an exclusive prefix sum (scan) for a vector
pub fn exclusive_scan(input: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(input.len() + 1);
    let mut sum = 0;

    result.push(0); // First element is always 0

    for &val in input {
        sum += val;
        result.push(sum);
    }

    result
}

/// Splits the range covered by a monotonic prefix-sum array into `n_parts`
/// contiguous pieces of approximately equal weight.
///
/// `prefix` has one more element than the number of items; item `k` has
/// weight `prefix[k+1] - prefix[k]`. The returned boundaries have
/// `n_parts + 1` elements, with `boundaries[0] == 0` and
/// `boundaries[n_parts] == prefix.len() - 1`. Parts may be empty when a
/// single heavy item absorbs more than its share.
pub fn balanced_partition(prefix: &[usize], n_parts: usize) -> Vec<usize> {
    debug_assert!(!prefix.is_empty());
    debug_assert!(n_parts >= 1);

    let n_items = prefix.len() - 1;
    let total = prefix[n_items];
    let mut boundaries = Vec::with_capacity(n_parts + 1);
    boundaries.push(0);

    for part in 1..n_parts {
        // First item whose running weight reaches this part's share.
        let share = (total as u128 * part as u128 / n_parts as u128) as usize;
        let k = prefix.partition_point(|&w| w <= share).saturating_sub(1);
        // Boundaries must be monotone even when many parts land on the
        // same heavy item.
        let prev = *boundaries.last().unwrap_or(&0);
        boundaries.push(k.clamp(prev, n_items));
    }

    boundaries.push(n_items);
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_scan() {
        let input = vec![1, 2, 3, 4];
        let expected = vec![0, 1, 3, 6, 10];
        assert_eq!(exclusive_scan(&input), expected);

        let input = vec![0, 0, 5, 0];
        let expected = vec![0, 0, 0, 5, 5];
        assert_eq!(exclusive_scan(&input), expected);
    }

    #[test]
    fn test_balanced_partition_even() {
        // 8 items of weight 1 each, 4 parts of 2 items
        let prefix = exclusive_scan(&[1; 8]);
        let bounds = balanced_partition(&prefix, 4);
        assert_eq!(bounds, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_balanced_partition_covers_everything() {
        let weights = vec![5, 0, 0, 100, 1, 1, 7, 0, 2];
        let prefix = exclusive_scan(&weights);
        for n_parts in 1..6 {
            let bounds = balanced_partition(&prefix, n_parts);
            assert_eq!(bounds[0], 0);
            assert_eq!(*bounds.last().unwrap(), weights.len());
            for w in bounds.windows(2) {
                assert!(w[0] <= w[1], "boundaries must be monotone");
            }
        }
    }

    #[test]
    fn test_balanced_partition_single_part() {
        let prefix = exclusive_scan(&[3, 1, 4]);
        assert_eq!(balanced_partition(&prefix, 1), vec![0, 3]);
    }

    #[test]
    fn test_balanced_partition_empty_items() {
        let prefix = vec![0];
        assert_eq!(balanced_partition(&prefix, 3), vec![0, 0, 0, 0]);
    }
}
