use lazy_static::lazy_static;

use crate::coefficient::Coefficient;
use crate::monomial::Monomial;

/// Predicate applied to a candidate product `(coefficient, monomial)` before it reaches the
/// accumulator. Returning `false` discards the product without touching the accumulator at all.
pub type Filter<C, M> = std::sync::Arc<dyn Fn(&C, &M) -> bool + Send + Sync>;

/// Tuning knobs for [`crate::multiply`].
///
/// `Config` is always passed explicitly to the driver. [`Config::global`] exists only as a
/// convenience default for callers who do not want to thread one through by hand; the driver
/// never consults process-wide state on its own once it has been constructed.
#[derive(Clone)]
pub struct Config<C: Coefficient, M: Monomial> {
    /// Maximum worker threads. `0` means "ask the OS for available parallelism".
    pub thread_count: usize,
    /// Below this `|A| * |B|` threshold, `multiply` runs on the calling thread.
    pub min_parallel_work: usize,
    /// Number of term pairs sampled by the estimator to predict output cardinality.
    pub estimator_samples: usize,
    /// Load factor above which the accumulator resizes.
    pub max_load_factor: f64,
    /// Seed for the estimator's deterministic sampler.
    pub estimator_seed: u64,
    /// Optional predicate used to discard candidate products before accumulation.
    pub filter: Option<Filter<C, M>>,
}

impl<C: Coefficient, M: Monomial> std::fmt::Debug for Config<C, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("thread_count", &self.thread_count)
            .field("min_parallel_work", &self.min_parallel_work)
            .field("estimator_samples", &self.estimator_samples)
            .field("max_load_factor", &self.max_load_factor)
            .field("estimator_seed", &self.estimator_seed)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl<C: Coefficient, M: Monomial> Default for Config<C, M> {
    fn default() -> Self {
        Config {
            thread_count: 0,
            min_parallel_work: 1 << 12,
            estimator_samples: 256,
            max_load_factor: 0.5,
            estimator_seed: DEFAULT_ESTIMATOR_SEED,
            filter: None,
        }
    }
}

/// Fixed default seed for the estimator's sampler, so out-of-the-box runs are reproducible.
const DEFAULT_ESTIMATOR_SEED: u64 = 0x5049_5241_4e48_4941;

impl<C: Coefficient, M: Monomial> Config<C, M> {
    /// Resolves `thread_count`, turning the `0` ("auto") sentinel into a concrete value.
    pub fn resolved_thread_count(&self) -> usize {
        if self.thread_count == 0 {
            num_cpus::get().max(1)
        } else {
            self.thread_count
        }
    }
}

lazy_static! {
    static ref GLOBAL_THREAD_COUNT: std::sync::atomic::AtomicUsize =
        std::sync::atomic::AtomicUsize::new(0);
}

/// Process-wide default thread count, set by [`set_global_thread_count`]. Read only when building
/// a [`Config`] via [`Config::global`], never from inside the hot path.
pub fn global_thread_count() -> usize {
    GLOBAL_THREAD_COUNT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Overrides the process-wide default thread count used by [`Config::global`].
pub fn set_global_thread_count(threads: usize) {
    GLOBAL_THREAD_COUNT.store(threads, std::sync::atomic::Ordering::Relaxed);
}

impl<C: Coefficient, M: Monomial> Config<C, M> {
    /// A `Config` seeded from the process-wide default thread count, otherwise identical to
    /// [`Config::default`].
    pub fn global() -> Self {
        Config {
            thread_count: global_thread_count(),
            ..Config::default()
        }
    }
}
