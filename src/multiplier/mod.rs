//! Matrix multipliers behind one trait seam.

pub(crate) mod dispatch;
pub mod sequential;
pub mod threaded;

pub use sequential::SequentialMultiplier;
pub use threaded::ThreadedMatrixMultiplier;

use crate::error::Result;
use crate::matrix::SquareMatrix;

/// Common interface of the sequential reference multiplier and the
/// threaded one.
pub trait MatrixMultiplier<T> {
    /// Computes `c = a * b`.
    ///
    /// All three matrices must have the same size. `a` and `b` must not be
    /// mutated by the caller for the duration of the call; on return `c`
    /// holds the complete product.
    fn multiply(
        &self,
        a: &SquareMatrix<T>,
        b: &SquareMatrix<T>,
        c: &mut SquareMatrix<T>,
    ) -> Result<()>;
}
