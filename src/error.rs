//! Error types for multiply configuration failures.

/// Result type for multiply operations.
pub type Result<T> = std::result::Result<T, MultiplyError>;

/// Errors a multiply call surfaces synchronously, before any job is
/// published to the worker pool. No partial computation is observable after
/// an `Err` return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MultiplyError {
    /// Operand and output sizes differ.
    #[error("operand sizes differ: A is {a}x{a}, B is {b}x{b}, C is {c}x{c}")]
    SizeMismatch { a: usize, b: usize, c: usize },

    /// The block grid is zero or does not evenly divide the matrix size.
    #[error("block grid {blocks_per_row} does not evenly divide matrix size {size}")]
    InvalidBlockGrid { blocks_per_row: usize, size: usize },
}
