//! Square integer matrix owned by the coordinator
//!
//! Values are stored row-major in a single allocation. The matrix is never
//! mutated after generation, so dispatch threads share it by reference.

use crate::partition::RowRange;
use anyhow::Result;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Smallest generated value
pub const MIN_VALUE: i32 = 1;

/// Largest generated value
pub const MAX_VALUE: i32 = 9;

/// Square `size × size` grid of `i32`, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    size: usize,
    data: Vec<i32>,
}

impl Matrix {
    /// Generate a matrix of uniform random values in `MIN_VALUE..=MAX_VALUE`
    ///
    /// Pass a seed for a reproducible matrix.
    pub fn random(size: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let data = (0..size * size)
            .map(|_| rng.gen_range(MIN_VALUE..=MAX_VALUE))
            .collect();

        Self { size, data }
    }

    /// Build a matrix from row-major values
    pub fn from_vec(size: usize, data: Vec<i32>) -> Result<Self> {
        if data.len() != size * size {
            anyhow::bail!(
                "Matrix of size {} needs {} values, got {}",
                size,
                size * size,
                data.len()
            );
        }
        Ok(Self { size, data })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// One row as a slice
    ///
    /// # Panics
    ///
    /// Panics if `index >= size`.
    #[inline]
    pub fn row(&self, index: usize) -> &[i32] {
        let start = index * self.size;
        &self.data[start..start + self.size]
    }

    /// Contiguous values of the rows in `range`
    ///
    /// Rows past the end of the matrix are dropped, so an out-of-range
    /// request yields an empty slice.
    pub fn rows(&self, range: RowRange) -> &[i32] {
        let range = range.clamp_to(self.size);
        if range.is_empty() {
            return &[];
        }
        &self.data[range.start * self.size..range.end() * self.size]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[i32]> {
        // chunks(0) panics, and an empty matrix has no rows anyway
        self.data.chunks(self.size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_values_in_bounds() {
        let matrix = Matrix::random(16, Some(7));
        assert_eq!(matrix.size(), 16);
        for row in matrix.iter_rows() {
            assert_eq!(row.len(), 16);
            assert!(row.iter().all(|v| (MIN_VALUE..=MAX_VALUE).contains(v)));
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        assert_eq!(Matrix::random(8, Some(42)), Matrix::random(8, Some(42)));
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(Matrix::from_vec(2, vec![1, 2, 3]).is_err());
        assert!(Matrix::from_vec(2, vec![1, 2, 3, 4]).is_ok());
    }

    #[test]
    fn test_row_slicing() {
        let matrix = Matrix::from_vec(3, (1..=9).collect()).unwrap();
        assert_eq!(matrix.row(1), &[4, 5, 6]);
        assert_eq!(matrix.rows(RowRange::new(1, 2)), &[4, 5, 6, 7, 8, 9]);
        assert!(matrix.rows(RowRange::new(0, 0)).is_empty());
    }

    #[test]
    fn test_rows_clamped_past_end() {
        let matrix = Matrix::from_vec(2, vec![1, 2, 3, 4]).unwrap();
        assert!(matrix.rows(RowRange::new(3, 2)).is_empty());
        assert_eq!(matrix.rows(RowRange::new(1, 5)), &[3, 4]);
    }
}
