//! Single-threaded reference multiplier.

use super::MatrixMultiplier;
use crate::error::{MultiplyError, Result};
use crate::matrix::{Scalar, SquareMatrix};

/// Textbook triple-loop multiplier, used as the correctness baseline for
/// the threaded implementation.
#[derive(Debug, Default)]
pub struct SequentialMultiplier;

impl SequentialMultiplier {
    pub fn new() -> Self {
        Self
    }
}

impl<T: Scalar> MatrixMultiplier<T> for SequentialMultiplier {
    fn multiply(
        &self,
        a: &SquareMatrix<T>,
        b: &SquareMatrix<T>,
        c: &mut SquareMatrix<T>,
    ) -> Result<()> {
        let n = a.size();
        if b.size() != n || c.size() != n {
            return Err(MultiplyError::SizeMismatch {
                a: n,
                b: b.size(),
                c: c.size(),
            });
        }
        for row in 0..n {
            for col in 0..n {
                let mut sum = T::default();
                for k in 0..n {
                    sum += a.get(row, k) * b.get(k, col);
                }
                c.set(row, col, sum);
            }
        }
        Ok(())
    }
}
