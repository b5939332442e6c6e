//! Block-decomposed parallel matrix multiplication on a fixed worker pool.
//!
//! The output matrix is partitioned into `blocks_per_row`² independent
//! blocks; each block is one job, published through a monitor-protected
//! FIFO queue to worker threads created once and reused across calls.
//! Multiply calls are reentrant: any number of threads may multiply
//! against the same pool concurrently, each call tracked by its own
//! invocation id. Dropping the pool signals termination and joins every
//! worker.
//!
//! ```
//! use blockmul::{MatrixMultiplier, SquareMatrix, ThreadedMatrixMultiplier};
//!
//! let a = SquareMatrix::from_fn(4, |row, col| (row * 4 + col) as f64);
//! let identity = SquareMatrix::from_fn(4, |row, col| if row == col { 1.0 } else { 0.0 });
//! let mut c = SquareMatrix::new(4);
//!
//! let multiplier = ThreadedMatrixMultiplier::new(2, 2);
//! multiplier.multiply(&a, &identity, &mut c).unwrap();
//! assert_eq!(c, a);
//! ```

pub mod error;
pub mod matrix;
pub mod multiplier;
mod sync;

pub use crate::error::{MultiplyError, Result};
pub use crate::matrix::{Scalar, SquareMatrix};
pub use crate::multiplier::{MatrixMultiplier, SequentialMultiplier, ThreadedMatrixMultiplier};
