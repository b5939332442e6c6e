//! Monitor-protected dispatch queue shared by the worker pool and every
//! in-flight multiply invocation.
//!
//! All shared mutable state of the crate lives behind the single mutex in
//! [`DispatchQueue`]: the FIFO job queue, the per-invocation completion
//! table and the termination flag. Wakeups only ever use `notify_one`, and
//! both blocking operations re-check their condition in a loop: a single
//! wake does not guarantee the awaited condition still holds by the time
//! the woken thread reacquires the lock.

use std::collections::{HashMap, VecDeque};

use log::{debug, trace};

use crate::matrix::SquareMatrix;
use crate::sync::{Condvar, Mutex};

/// Identifier of one multiply invocation. Allocated monotonically, never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct InvocationId(u64);

/// One unit of dispatch: compute the complete output block
/// `(block_row, block_col)` of `C = A * B`.
///
/// Built by the dispatcher, consumed exactly once by exactly one worker,
/// then discarded.
#[derive(Debug)]
pub(crate) struct BlockJob<T> {
    pub(crate) a: *const SquareMatrix<T>,
    pub(crate) b: *const SquareMatrix<T>,
    /// Base of C's element buffer. Each job writes only the elements of its
    /// own block, so concurrent writers never alias.
    pub(crate) c: *mut T,
    pub(crate) block_row: usize,
    pub(crate) block_col: usize,
    pub(crate) blocks_per_row: usize,
    pub(crate) invocation: InvocationId,
}

// SAFETY: the dispatcher that built the job blocks in `wait_completion`
// until every job of its invocation has been executed and reported, so the
// pointed-to matrices stay alive for as long as any worker can reach the
// job.
unsafe impl<T: Send> Send for BlockJob<T> {}

#[derive(Debug)]
struct Progress {
    completed: usize,
    total: usize,
}

impl Progress {
    fn is_done(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Debug)]
struct QueueState<T> {
    jobs: VecDeque<BlockJob<T>>,
    invocations: HashMap<InvocationId, Progress>,
    next_id: u64,
    terminating: bool,
}

/// The monitor: job queue plus invocation bookkeeping under one mutex.
pub(crate) struct DispatchQueue<T> {
    state: Mutex<QueueState<T>>,
    /// Waited on by workers in [`dequeue`](Self::dequeue).
    job_available: Condvar,
    /// Waited on by dispatchers in [`wait_completion`](Self::wait_completion).
    /// Shared by all of them.
    job_done: Condvar,
    nb_workers: usize,
}

impl<T> DispatchQueue<T> {
    /// Creates an empty queue serving a pool of `nb_workers` threads.
    ///
    /// The worker count is fixed here so that termination can issue exactly
    /// the number of wakes that is provably sufficient.
    pub(crate) fn new(nb_workers: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                invocations: HashMap::new(),
                next_id: 0,
                terminating: false,
            }),
            job_available: Condvar::new(),
            job_done: Condvar::new(),
            nb_workers,
        }
    }

    /// Appends a job and wakes one worker blocked for work.
    pub(crate) fn enqueue(&self, job: BlockJob<T>) {
        let mut state = self.state.lock().expect("enqueue lock");
        debug_assert!(!state.terminating, "enqueue after termination request");
        state.jobs.push_back(job);
        self.job_available.notify_one();
    }

    /// Blocks until a job is available or shutdown is requested.
    ///
    /// Returns `None` only when termination has been requested and the queue
    /// is drained; the worker receiving `None` must exit its loop.
    pub(crate) fn dequeue(&self) -> Option<BlockJob<T>> {
        let mut state = self.state.lock().expect("dequeue lock");
        while state.jobs.is_empty() && !state.terminating {
            state = self.job_available.wait(state).expect("dequeue wait");
        }
        if state.terminating && state.jobs.is_empty() {
            return None;
        }
        state.jobs.pop_front()
    }

    /// Registers a new invocation expecting `total_jobs` completion reports
    /// and returns its fresh identifier.
    pub(crate) fn register_invocation(&self, total_jobs: usize) -> InvocationId {
        let mut state = self.state.lock().expect("register lock");
        let id = InvocationId(state.next_id);
        state.next_id = state
            .next_id
            .checked_add(1)
            .expect("invocation id space exhausted");
        state.invocations.insert(
            id,
            Progress {
                completed: 0,
                total: total_jobs,
            },
        );
        trace!("registered invocation {:?} with {} jobs", id, total_jobs);
        id
    }

    /// Records one finished job for `id` and wakes one waiting dispatcher.
    ///
    /// May run before the owning dispatcher has started waiting; the
    /// re-checked loop in [`wait_completion`](Self::wait_completion) covers
    /// that case, so no wakeup is lost.
    pub(crate) fn report_completion(&self, id: InvocationId) {
        let mut state = self.state.lock().expect("report lock");
        let progress = state
            .invocations
            .get_mut(&id)
            .expect("completion report for unknown invocation");
        progress.completed += 1;
        debug_assert!(progress.completed <= progress.total);
        self.job_done.notify_one();
    }

    /// Blocks until every job of `id` has been reported, then removes the
    /// invocation's bookkeeping entry.
    ///
    /// `job_done` is shared by all waiting dispatchers, so a wake may land
    /// on a waiter whose own invocation is not finished. Such a waiter must
    /// pass the wake along before re-waiting; the report it consumed was
    /// meant for someone else, and swallowing it could starve that waiter.
    pub(crate) fn wait_completion(&self, id: InvocationId) {
        let mut state = self.state.lock().expect("wait lock");
        while !state
            .invocations
            .get(&id)
            .expect("waiting on unknown invocation")
            .is_done()
        {
            state = self.job_done.wait(state).expect("completion wait");
            let progress = state
                .invocations
                .get(&id)
                .expect("waiting on unknown invocation");
            if !progress.is_done() {
                // Stolen wake: hand it to another waiter on the shared channel.
                self.job_done.notify_one();
            }
        }
        state.invocations.remove(&id);
        trace!("invocation {:?} complete", id);
    }

    /// Requests shutdown: sets the flag, then wakes exactly as many workers
    /// as the pool owns.
    ///
    /// Each blocked worker consumes at most one wake before observing the
    /// flag and exiting, and a worker that is not blocked sees the flag
    /// under the mutex on its next `dequeue` without needing a wake at all.
    /// `nb_workers` single wakes therefore suffice without a broadcast
    /// primitive.
    pub(crate) fn request_termination(&self) {
        {
            let mut state = self.state.lock().expect("terminate lock");
            debug_assert!(!state.terminating, "termination requested twice");
            state.terminating = true;
        }
        debug!("termination requested, waking {} workers", self.nb_workers);
        for _ in 0..self.nb_workers {
            self.job_available.notify_one();
        }
    }
}

#[cfg(all(test, not(feature = "check-loom")))]
mod tests {
    use super::*;

    fn job(
        m: &SquareMatrix<f64>,
        out: &mut SquareMatrix<f64>,
        block_row: usize,
        invocation: InvocationId,
    ) -> BlockJob<f64> {
        BlockJob {
            a: m as *const _,
            b: m as *const _,
            c: out.as_mut_ptr(),
            block_row,
            block_col: 0,
            blocks_per_row: 1,
            invocation,
        }
    }

    #[test]
    fn jobs_come_out_in_fifo_order() {
        let m = SquareMatrix::<f64>::new(1);
        let mut out = SquareMatrix::<f64>::new(1);
        let queue = DispatchQueue::new(1);
        let id = queue.register_invocation(3);

        for block_row in 0..3 {
            queue.enqueue(job(&m, &mut out, block_row, id));
        }
        for block_row in 0..3 {
            assert_eq!(queue.dequeue().unwrap().block_row, block_row);
        }
    }

    #[test]
    fn invocation_ids_are_monotonic() {
        let queue = DispatchQueue::<f64>::new(1);
        let first = queue.register_invocation(1);
        let second = queue.register_invocation(1);
        let third = queue.register_invocation(1);
        assert!(first.0 < second.0);
        assert!(second.0 < third.0);
    }

    #[test]
    fn termination_drains_pending_jobs_first() {
        let m = SquareMatrix::<f64>::new(1);
        let mut out = SquareMatrix::<f64>::new(1);
        let queue = DispatchQueue::new(2);
        let id = queue.register_invocation(1);

        queue.enqueue(job(&m, &mut out, 0, id));
        queue.request_termination();

        assert!(queue.dequeue().is_some());
        assert!(queue.dequeue().is_none());
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn completed_invocation_is_removed_from_the_table() {
        let queue = DispatchQueue::<f64>::new(1);
        let id = queue.register_invocation(2);

        queue.report_completion(id);
        queue.report_completion(id);
        // Both reports are in, so this does not block.
        queue.wait_completion(id);

        assert!(queue.state.lock().unwrap().invocations.is_empty());
    }
}
