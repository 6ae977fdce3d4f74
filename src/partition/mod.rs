//! Row-range partitioning
//!
//! Splits the rows of an `n × n` matrix into `k` contiguous, disjoint ranges,
//! one per worker in roster order.
//!
//! Every worker but the last receives `n / k` rows. The last worker absorbs the
//! remainder, so it is never smaller than the others and may be larger by up
//! to `k - 1` rows. When `n < k` the base share is zero: all but the last
//! worker get an empty range and the last worker gets the whole matrix.
//!
//! # Example
//!
//! ```
//! use rowcast::partition::{partition_rows, RowRange};
//!
//! let ranges = partition_rows(5, 2).unwrap();
//! assert_eq!(ranges, vec![RowRange::new(0, 2), RowRange::new(2, 3)]);
//! ```

use crate::error::PartitionError;
use serde::Serialize;
use std::ops::Range;

/// Contiguous slice of matrix rows assigned to one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowRange {
    pub start: usize,
    pub count: usize,
}

impl RowRange {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// One past the last row
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Rows of this range that actually exist in a matrix of `size` rows
    ///
    /// A range starting at or past `size` yields no rows instead of reading
    /// out of bounds.
    pub fn clamp_to(&self, size: usize) -> RowRange {
        if self.start >= size {
            return RowRange::new(self.start, 0);
        }
        RowRange::new(self.start, self.count.min(size - self.start))
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Compute one row range per worker
///
/// # Errors
///
/// Returns `PartitionError::NoWorkers` when `workers` is zero.
pub fn partition_rows(size: usize, workers: usize) -> Result<Vec<RowRange>, PartitionError> {
    if workers == 0 {
        return Err(PartitionError::NoWorkers);
    }

    let base = size / workers;
    let last = workers - 1;

    let ranges = (0..workers)
        .map(|index| {
            let start = index * base;
            let count = if index == last { size - start } else { base };
            RowRange::new(start, count).clamp_to(size)
        })
        .collect();

    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(size: usize, ranges: &[RowRange]) {
        let mut next = 0;
        for range in ranges.iter().filter(|r| !r.is_empty()) {
            assert_eq!(range.start, next, "ranges must be contiguous and ordered");
            next = range.end();
        }
        assert_eq!(next, size, "ranges must cover every row");
    }

    #[test]
    fn test_even_split() {
        let ranges = partition_rows(4, 2).unwrap();
        assert_eq!(ranges, vec![RowRange::new(0, 2), RowRange::new(2, 2)]);
    }

    #[test]
    fn test_remainder_goes_to_last() {
        let ranges = partition_rows(5, 2).unwrap();
        assert_eq!(ranges, vec![RowRange::new(0, 2), RowRange::new(2, 3)]);

        let ranges = partition_rows(10, 4).unwrap();
        assert_eq!(
            ranges,
            vec![
                RowRange::new(0, 2),
                RowRange::new(2, 2),
                RowRange::new(4, 2),
                RowRange::new(6, 4),
            ]
        );
    }

    #[test]
    fn test_fewer_rows_than_workers() {
        let ranges = partition_rows(3, 4).unwrap();
        assert_eq!(ranges.len(), 4);
        for range in &ranges[..3] {
            assert!(range.is_empty());
        }
        assert_eq!(ranges[3], RowRange::new(0, 3));
        assert!(ranges.iter().all(|r| r.end() <= 3));
        assert_covers(3, &ranges);
    }

    #[test]
    fn test_single_worker_gets_everything() {
        assert_eq!(partition_rows(7, 1).unwrap(), vec![RowRange::new(0, 7)]);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert_eq!(partition_rows(4, 0), Err(PartitionError::NoWorkers));
    }

    #[test]
    fn test_invariants_hold_for_all_small_inputs() {
        for size in 1..=40 {
            for workers in 1..=size {
                let ranges = partition_rows(size, workers).unwrap();
                assert_eq!(ranges.len(), workers);
                assert_covers(size, &ranges);

                let base = size / workers;
                for range in &ranges[..workers - 1] {
                    assert_eq!(range.count, base);
                    assert!(!range.is_empty());
                }
                let last = ranges[workers - 1];
                assert!(last.count >= base);
                assert!(last.count < base + workers);
            }
        }
    }

    #[test]
    fn test_partition_is_deterministic() {
        assert_eq!(partition_rows(97, 6).unwrap(), partition_rows(97, 6).unwrap());
    }

    #[test]
    fn test_clamp_past_end() {
        assert_eq!(RowRange::new(5, 3).clamp_to(4), RowRange::new(5, 0));
        assert_eq!(RowRange::new(2, 5).clamp_to(4), RowRange::new(2, 2));
        assert_eq!(RowRange::new(0, 4).clamp_to(4), RowRange::new(0, 4));
    }
}
