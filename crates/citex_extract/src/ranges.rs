//! Range expression expansion.
//!
//! Models cite source lines as compact range expressions ("3-7,12"). This
//! module expands them into explicit sorted integer lists with a hard size
//! bound: a single `1-1000000` token must never cost a million integers, so
//! ranges wider than [`MAX_FULL_EXPANSION`] are sampled down to
//! [`RANGE_SAMPLE_COUNT`] representative points instead.

use std::collections::BTreeSet;

/// Widest range that is expanded in full.
pub const MAX_FULL_EXPANSION: u64 = 1000;

/// Number of points emitted for a range wider than [`MAX_FULL_EXPANSION`].
pub const RANGE_SAMPLE_COUNT: u64 = 50;

/// Expand a range expression with the default bounds.
///
/// Returns `None` when no piece of the expression yields a value.
pub fn expand_ranges(expr: &str) -> Option<Vec<u64>> {
    expand_ranges_with(expr, MAX_FULL_EXPANSION, RANGE_SAMPLE_COUNT)
}

/// Expand a comma-delimited list of integers and `start-end` ranges.
///
/// Each piece is either a single integer or a closed interval. Intervals
/// no wider than `max_full` expand in full; wider ones emit exactly
/// `samples` points: the two endpoints plus interior points at constant
/// stride `floor((end-start)/(samples-1))`, which never reach `end`.
/// Unparseable pieces are skipped. The merged output is deduplicated and
/// sorted ascending, so its length is bounded regardless of range width.
///
/// A descending interval ("10-5") emits only its start value. Historical
/// behavior, kept deliberately; callers depend on it staying put.
pub fn expand_ranges_with(expr: &str, max_full: u64, samples: u64) -> Option<Vec<u64>> {
    let mut values = BTreeSet::new();

    for piece in expr.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if let Ok(value) = piece.parse::<u64>() {
            values.insert(value);
            continue;
        }
        let Some((start_text, end_text)) = piece.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (
            start_text.trim().parse::<u64>(),
            end_text.trim().parse::<u64>(),
        ) else {
            continue;
        };

        if start > end {
            values.insert(start);
        } else if end - start < max_full {
            // Width check stays subtraction-only: `end - start + 1` would
            // overflow on a full-domain range like 0-u64::MAX.
            values.extend(start..=end);
        } else {
            sample_range(&mut values, start, end, samples);
        }
    }

    if values.is_empty() {
        None
    } else {
        Some(values.into_iter().collect())
    }
}

/// Emit `samples` points across a closed interval: both endpoints plus
/// interior points at a constant integer stride. The stride floors, so
/// interior points stay strictly below `end` and the output holds exactly
/// `samples` distinct values.
fn sample_range(values: &mut BTreeSet<u64>, start: u64, end: u64, samples: u64) {
    if samples == 0 {
        return;
    }
    if samples <= 2 {
        values.insert(start);
        values.insert(end);
        return;
    }
    let stride = (end - start) / (samples - 1);
    for i in 0..samples - 1 {
        values.insert((start + i * stride).min(end));
    }
    values.insert(end);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_values_and_small_ranges() {
        assert_eq!(expand_ranges("12"), Some(vec![12]));
        assert_eq!(expand_ranges("3-7,12"), Some(vec![3, 4, 5, 6, 7, 12]));
        assert_eq!(expand_ranges("5-5"), Some(vec![5]));
    }

    #[test]
    fn test_deduplicates_and_sorts() {
        assert_eq!(expand_ranges("7,3-5,4,3"), Some(vec![3, 4, 5, 7]));
        assert_eq!(expand_ranges("9, 1, 5"), Some(vec![1, 5, 9]));
    }

    #[test]
    fn test_full_expansion_boundary() {
        // Width exactly 1000 still expands in full.
        let full = expand_ranges("1-1000").unwrap();
        assert_eq!(full.len(), 1000);
        assert_eq!(full[0], 1);
        assert_eq!(full[999], 1000);

        // One wider and it samples.
        let sampled = expand_ranges("1-1001").unwrap();
        assert_eq!(sampled.len(), RANGE_SAMPLE_COUNT as usize);
    }

    #[test]
    fn test_huge_range_samples_fifty_points() {
        let sampled = expand_ranges("1-1000000").unwrap();
        assert_eq!(sampled.len(), 50);
        assert_eq!(sampled[0], 1);
        assert_eq!(*sampled.last().unwrap(), 1_000_000);
        assert!(sampled.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_descending_range_emits_start_only() {
        // Kept quirk: a reversed range yields just its start.
        assert_eq!(expand_ranges("10-5"), Some(vec![10]));
        assert_eq!(expand_ranges("10-5,2"), Some(vec![2, 10]));
    }

    #[test]
    fn test_unparseable_pieces_are_skipped() {
        assert_eq!(expand_ranges("3,oops,7"), Some(vec![3, 7]));
        assert_eq!(expand_ranges("a-b"), None);
        assert_eq!(expand_ranges(""), None);
        assert_eq!(expand_ranges(",,,"), None);
    }

    #[test]
    fn test_sampled_points_never_exceed_end() {
        let sampled = expand_ranges_with("100-10000", 50, 10).unwrap();
        assert_eq!(sampled.len(), 10);
        assert!(sampled.iter().all(|&v| (100..=10000).contains(&v)));
        assert_eq!(sampled[0], 100);
        assert_eq!(*sampled.last().unwrap(), 10000);
    }

    #[test]
    fn test_full_u64_domain_range_is_sampled() {
        // 0-u64::MAX must sample, not overflow the width arithmetic or
        // try to materialize the whole domain.
        let sampled = expand_ranges("0-18446744073709551615").unwrap();
        assert_eq!(sampled.len(), RANGE_SAMPLE_COUNT as usize);
        assert_eq!(sampled[0], 0);
        assert_eq!(*sampled.last().unwrap(), u64::MAX);
    }

    #[test]
    fn test_output_bound_holds_for_many_pieces() {
        let expr = "1-2000000,5000000-9000000";
        let sampled = expand_ranges(expr).unwrap();
        assert!(sampled.len() <= 100);
    }
}
