use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A scoped worker pool, one thread per workgroup, used by
/// [`crate::multiplier::driver`](crate::multiplier) to fan out work on borrowed input series
/// without requiring `'static` bounds -- the same role `ec_gpu_gen::threadpool::Worker` plays for
/// `multiexp`'s multi-exponentiation hot path.
pub struct Worker {
    pool: yastl::Pool,
    thread_count: usize,
}

impl Worker {
    /// Builds a worker pool with `thread_count` threads (clamped to a minimum of 1 -- a
    /// zero-thread pool would never run anything).
    pub fn new(thread_count: usize) -> Self {
        let thread_count = thread_count.max(1);
        log::debug!("starting worker pool with {thread_count} threads");
        Worker {
            pool: yastl::Pool::new(thread_count),
            thread_count,
        }
    }

    /// Number of threads this pool was built with.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Runs `body`, which receives a [`yastl::Scope`] on which to `execute` borrowing closures.
    /// Blocks until every closure spawned inside `body` has completed. This call is the only
    /// join barrier in the multiplier's hot path: estimation, worker execution, and merge are
    /// each one `scoped` call.
    pub fn scoped<'a, F, R>(&self, body: F) -> R
    where
        F: FnOnce(&yastl::Scope<'a>) -> R,
    {
        self.pool.scoped(body)
    }
}

/// A cheaply-cloned, cross-thread cancellation signal.
///
/// Workers poll [`CancellationFlag::is_set`] at a bounded cadence (between rows of their outer
/// loop) rather than on every term-pair, since an atomic load per term-pair would be a meaningful
/// tax on the hot path for no real responsiveness gain.
#[derive(Clone)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// A fresh, unset flag.
    pub fn new() -> Self {
        CancellationFlag(Arc::new(AtomicBool::new(false)))
    }

    /// Sets the flag. Idempotent; safe to call from multiple threads.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True iff the flag has been set by any thread holding a clone of it.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancellationFlag {
    fn default() -> Self {
        CancellationFlag::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_flag_is_visible_across_clones() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_set());
        flag.set();
        assert!(clone.is_set());
    }

    #[test]
    fn worker_pool_runs_scoped_closures() {
        let worker = Worker::new(4);
        assert_eq!(worker.thread_count(), 4);
        let total = std::sync::atomic::AtomicUsize::new(0);
        worker.scoped(|scope| {
            for _ in 0..10 {
                scope.execute(|| {
                    total.fetch_add(1, Ordering::SeqCst);
                });
            }
        });
        assert_eq!(total.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn zero_requested_threads_still_runs_work() {
        let worker = Worker::new(0);
        assert_eq!(worker.thread_count(), 1);
    }
}
