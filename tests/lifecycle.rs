#![cfg(not(feature = "check-loom"))]
//! Pool lifecycle: bounded shutdown and reuse across invocations.

mod common;

use std::time::Duration;

use blockmul::{
    MatrixMultiplier, SequentialMultiplier, SquareMatrix, ThreadedMatrixMultiplier,
};
use common::run_with_deadline;

#[test_log::test]
fn shutdown_of_an_idle_pool_completes_for_every_size() {
    for pool_size in [1, 2, 4, 8, 16, 20] {
        run_with_deadline(Duration::from_secs(30), move || {
            let multiplier: ThreadedMatrixMultiplier<f64> =
                ThreadedMatrixMultiplier::new(pool_size, 2);
            drop(multiplier);
        });
    }
}

#[test_log::test]
fn shutdown_after_completed_calls_completes_for_every_size() {
    for pool_size in [1, 2, 4, 8, 16, 20] {
        run_with_deadline(Duration::from_secs(30), move || {
            let multiplier = ThreadedMatrixMultiplier::new(pool_size, 2);
            let a = SquareMatrix::from_fn(4, |row, col| (row + col) as f64);
            let b = SquareMatrix::from_fn(4, |row, col| (row * col) as f64);

            for _ in 0..3 {
                let mut c = SquareMatrix::new(4);
                multiplier.multiply_blocked(&a, &b, &mut c, 2).unwrap();
            }
            drop(multiplier);
        });
    }
}

#[test_log::test]
fn pool_is_reusable_across_many_invocations() {
    run_with_deadline(Duration::from_secs(60), || {
        let multiplier = ThreadedMatrixMultiplier::new(4, 3);
        let a = SquareMatrix::from_fn(6, |row, col| (row * 6 + col) as f64);
        let b = SquareMatrix::from_fn(6, |row, col| (col * 6 + row) as f64);

        let mut expected = SquareMatrix::new(6);
        SequentialMultiplier::new()
            .multiply(&a, &b, &mut expected)
            .unwrap();

        for _ in 0..50 {
            let mut c = SquareMatrix::new(6);
            multiplier.multiply_blocked(&a, &b, &mut c, 3).unwrap();
            assert_eq!(c, expected);
        }
    });
}
