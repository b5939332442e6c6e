//! Block-decomposed multiplier backed by a fixed pool of worker threads.

use log::trace;

use super::MatrixMultiplier;
use super::dispatch::{BlockJob, DispatchQueue};
use crate::error::{MultiplyError, Result};
use crate::matrix::{Scalar, SquareMatrix};
use crate::sync::{Arc, thread};

struct Worker {
    _id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for Worker {
    /// When dropped, the thread's `JoinHandle` must be `join`ed; the worker
    /// loop is guaranteed to observe the termination flag, so the join is
    /// unbounded by design. If the worker panicked, this panics too.
    fn drop(&mut self) {
        self.thread.take().unwrap().join().unwrap();
    }
}

/// Multiplier that decomposes the output matrix into square blocks and
/// computes them on a pool of worker threads.
///
/// The pool is created once in the constructor and reused by every multiply
/// call. Calls are reentrant: any number of threads may multiply against
/// the same pool concurrently; each call gets its own invocation id and its
/// jobs interleave freely with the others' in the shared queue.
///
/// Dropping the multiplier runs the two-phase shutdown: request
/// termination, then join every worker. `multiply` borrows the pool, so
/// the drop cannot start while a call is still in flight.
pub struct ThreadedMatrixMultiplier<T> {
    queue: Arc<DispatchQueue<T>>,
    _workers: Vec<Worker>,
    nb_blocks_per_row: usize,
}

impl<T: Scalar + Send + Sync + 'static> ThreadedMatrixMultiplier<T> {
    /// Creates the pool with `nb_threads` worker threads, all spawned before
    /// the constructor returns. `nb_blocks_per_row` is the default block
    /// grid used by the trait-level [`multiply`](MatrixMultiplier::multiply).
    ///
    /// # Panics
    ///
    /// Panics if `nb_threads` is 0, or if a worker thread cannot be spawned.
    pub fn new(nb_threads: usize, nb_blocks_per_row: usize) -> Self {
        assert!(nb_threads > 0);

        let queue = Arc::new(DispatchQueue::new(nb_threads));
        let mut _workers = Vec::with_capacity(nb_threads);
        for id in 0..nb_threads {
            let queue = Arc::clone(&queue);
            let thread = thread::spawn(move || worker_loop(id, queue));
            _workers.push(Worker {
                _id: id,
                thread: Some(thread),
            });
        }

        Self {
            queue,
            _workers,
            nb_blocks_per_row,
        }
    }

    /// Computes `c = a * b` with an explicit block grid.
    ///
    /// Decomposes C into `blocks_per_row`² blocks, publishes one job per
    /// block and blocks until every job of this invocation has been
    /// computed. `blocks_per_row` must evenly divide the matrix size;
    /// validation happens before any job is enqueued, so an `Err` return
    /// leaves `c` untouched.
    ///
    /// `blocks_per_row = 1` degenerates to a single job computing the full
    /// product.
    pub fn multiply_blocked(
        &self,
        a: &SquareMatrix<T>,
        b: &SquareMatrix<T>,
        c: &mut SquareMatrix<T>,
        blocks_per_row: usize,
    ) -> Result<()> {
        let n = a.size();
        if b.size() != n || c.size() != n {
            return Err(MultiplyError::SizeMismatch {
                a: n,
                b: b.size(),
                c: c.size(),
            });
        }
        if blocks_per_row == 0 || n % blocks_per_row != 0 {
            return Err(MultiplyError::InvalidBlockGrid {
                blocks_per_row,
                size: n,
            });
        }

        let total_blocks = blocks_per_row * blocks_per_row;
        let invocation = self.queue.register_invocation(total_blocks);

        let c_elems = c.as_mut_ptr();
        for block_row in 0..blocks_per_row {
            for block_col in 0..blocks_per_row {
                self.queue.enqueue(BlockJob {
                    a: a as *const _,
                    b: b as *const _,
                    c: c_elems,
                    block_row,
                    block_col,
                    blocks_per_row,
                    invocation,
                });
            }
        }

        self.queue.wait_completion(invocation);
        Ok(())
    }
}

impl<T: Scalar + Send + Sync + 'static> MatrixMultiplier<T> for ThreadedMatrixMultiplier<T> {
    /// Computes `c = a * b` with the default block grid given at
    /// construction.
    fn multiply(
        &self,
        a: &SquareMatrix<T>,
        b: &SquareMatrix<T>,
        c: &mut SquareMatrix<T>,
    ) -> Result<()> {
        self.multiply_blocked(a, b, c, self.nb_blocks_per_row)
    }
}

impl<T> Drop for ThreadedMatrixMultiplier<T> {
    /// Two-phase shutdown: request termination once, then join every worker
    /// (each [`Worker`]'s own drop does the joining, in field order after
    /// this body).
    fn drop(&mut self) {
        self.queue.request_termination();
    }
}

/// Worker loop: Idle until `dequeue` yields a job, Computing while the
/// block runs, back to Idle after the completion report, Exited when
/// `dequeue` returns `None`.
fn worker_loop<T: Scalar>(id: usize, queue: Arc<DispatchQueue<T>>) {
    while let Some(job) = queue.dequeue() {
        compute_block(&job);
        queue.report_completion(job.invocation);
    }
    trace!("worker {} exited", id);
}

/// Computes the complete output block named by `job`.
///
/// Every element of the block accumulates the full inner-dimension product
/// and is written exactly once.
fn compute_block<T: Scalar>(job: &BlockJob<T>) {
    // SAFETY: the dispatcher owning this invocation is blocked in
    // `wait_completion` until this job and its siblings have reported, so
    // A, B and C outlive every access made here.
    let a = unsafe { &*job.a };
    let b = unsafe { &*job.b };

    let n = a.size();
    let block_size = n / job.blocks_per_row;
    let row_start = job.block_row * block_size;
    let col_start = job.block_col * block_size;

    for row in row_start..row_start + block_size {
        for col in col_start..col_start + block_size {
            let mut sum = T::default();
            for k in 0..n {
                sum += a.get(row, k) * b.get(k, col);
            }
            // SAFETY: `(row, col)` lies inside this job's block, and blocks
            // are disjoint, so this is the only write to that element during
            // the invocation.
            unsafe { job.c.add(row * n + col).write(sum) };
        }
    }
}
