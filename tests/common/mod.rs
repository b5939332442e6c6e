//! Shared helpers for the integration tests.

use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;

/// Runs `body` on a fresh thread and fails the test if it has not finished
/// within `deadline`. A deadlocked pool would otherwise hang the whole
/// suite instead of failing one test.
pub fn run_with_deadline(deadline: Duration, body: impl FnOnce() + Send + 'static) {
    let (done_tx, done_rx) = bounded(1);
    let handle = thread::spawn(move || {
        body();
        let _ = done_tx.send(());
    });
    done_rx
        .recv_timeout(deadline)
        .expect("test body did not finish before the deadline");
    handle.join().unwrap();
}
