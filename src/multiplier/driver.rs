use std::sync::{Arc, Mutex};

use crate::coefficient::Coefficient;
use crate::config::{Config, Filter};
use crate::error::{Error, Result};
use crate::monomial::Monomial;
use crate::multiplier::accumulator::{Accumulator, InsertError};
use crate::multiplier::estimator;
use crate::multiplier::kernel::MonomialKernel;
use crate::multiplier::partitioner::{self, Workgroup};
use crate::series::Series;
use crate::symbol::SymbolSet;
use crate::term::Term;
use crate::threadpool::{CancellationFlag, Worker};

/// The driver's state machine: `Idle -> Estimating -> Scheduling -> Running -> Merging -> Done`,
/// with `Running -> Cancelled` on a cancellation observed mid-flight and any state able to move to
/// `Failed` on error. Transitions are linear -- there are no back-edges -- and are logged at
/// [`log::Level::Debug`] as they happen, the same way `GPULock`/`PriorityLock` acquire-and-release
/// transitions are logged in `gpu::locks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Idle,
    Estimating,
    Scheduling,
    Running,
    Merging,
    Done,
    Cancelled,
    Failed,
}

fn transition(from: DriverState, to: DriverState) {
    log::debug!("multiply: {from:?} -> {to:?}");
}

/// Multiplies `a` and `b`, returning their product series.
///
/// The two operands must share the exact same [`SymbolSet`] (same names, same order); this is
/// checked, not assumed. Operands built over compatible but differently-ordered symbol sets
/// should be realigned with [`Series::aligned_to`] onto a common set first -- `multiply` never
/// aligns its operands itself.
///
/// Equivalent to [`multiply_cancellable`] with a cancellation flag that is never set.
pub fn multiply<C, M>(a: &Series<C, M>, b: &Series<C, M>, config: &Config<C, M>) -> Result<Series<C, M>>
where
    C: Coefficient + 'static,
    M: Monomial + MonomialKernel + 'static,
{
    multiply_cancellable(a, b, config, &CancellationFlag::new())
}

/// As [`multiply`], but workers poll `cancel` between rows of their outer loop and abort with
/// [`Error::Cancelled`] as soon as any thread -- including one external to this call -- sets it.
/// A worker that raises a coefficient error also sets `cancel`, so the remaining workers wind
/// down promptly instead of finishing a full (wasted) Cartesian product.
pub fn multiply_cancellable<C, M>(
    a: &Series<C, M>,
    b: &Series<C, M>,
    config: &Config<C, M>,
    cancel: &CancellationFlag,
) -> Result<Series<C, M>>
where
    C: Coefficient + 'static,
    M: Monomial + MonomialKernel + 'static,
{
    if a.symbols() != b.symbols() {
        return Err(Error::IncompatibleSymbols(format!(
            "{:?} vs {:?}",
            a.symbols().names().collect::<Vec<_>>(),
            b.symbols().names().collect::<Vec<_>>()
        )));
    }
    let symbols = a.symbols().clone();

    if a.is_empty() || b.is_empty() {
        log::debug!("multiply: empty operand, skipping estimation and scheduling");
        return Ok(Series::new_empty(symbols, 0));
    }

    let a_terms = a.terms();
    let b_terms = b.terms();

    transition(DriverState::Idle, DriverState::Estimating);
    let estimate = estimator::estimate(
        a_terms,
        b_terms,
        config.estimator_samples,
        config.estimator_seed,
        config.max_load_factor,
    );
    log::debug!(
        "multiply: estimated {} distinct terms (capacity {}, distinct_fraction {:.3})",
        estimate.predicted_count,
        estimate.capacity,
        estimate.distinct_fraction,
    );

    transition(DriverState::Estimating, DriverState::Scheduling);
    let total_pairs = a_terms.len().saturating_mul(b_terms.len());
    let thread_count = if total_pairs < config.min_parallel_work {
        1
    } else {
        config.resolved_thread_count()
    };

    let dense = estimate.is_dense();
    let workgroups: Vec<Workgroup> = if dense {
        partitioner::plan_row_band(thread_count, a_terms.len())
    } else {
        partitioner::plan_hash_band(thread_count, estimate.capacity)
    };
    let per_worker_capacity_hint = if dense {
        estimate.capacity
    } else {
        (estimate.capacity / workgroups.len()).max(8)
    };
    let max_load_factor = config.max_load_factor;
    let filter = config.filter.clone();

    let (error_tx, error_rx) = crossbeam_channel::bounded::<Error>(1);
    let results: Vec<Mutex<Option<Accumulator<C, M>>>> =
        (0..workgroups.len()).map(|_| Mutex::new(None)).collect();

    transition(DriverState::Scheduling, DriverState::Running);
    log::debug!(
        "multiply: {} workers, {} strategy",
        workgroups.len(),
        if dense { "row-band" } else { "hash-band" }
    );
    let worker_pool = Worker::new(thread_count);
    worker_pool.scoped(|scope| {
        for (k, workgroup) in workgroups.iter().enumerate() {
            let symbols = symbols.clone();
            let filter = filter.clone();
            let error_tx = error_tx.clone();
            let cancel = cancel.clone();
            let slot = &results[k];
            scope.execute(move || {
                let mut sink: Accumulator<C, M> =
                    Accumulator::new(symbols, per_worker_capacity_hint, max_load_factor);
                if let Err(err) =
                    run_workgroup(k, workgroup, a_terms, b_terms, filter.as_ref(), &cancel, &mut sink)
                {
                    cancel.set();
                    if let Err(unsent) = error_tx.try_send(err) {
                        log::debug!(
                            "worker {k}: discarding error, another worker's error already claimed the slot: {}",
                            unsent.into_inner()
                        );
                    }
                }
                *slot.lock().expect("workgroup result slot poisoned") = Some(sink);
            });
        }
    });

    if let Ok(err) = error_rx.try_recv() {
        transition(DriverState::Running, DriverState::Failed);
        return Err(err);
    }
    if cancel.is_set() {
        transition(DriverState::Running, DriverState::Cancelled);
        transition(DriverState::Cancelled, DriverState::Failed);
        return Err(Error::Cancelled);
    }

    transition(DriverState::Running, DriverState::Merging);
    let partial: Vec<Accumulator<C, M>> = results
        .into_iter()
        .map(|slot| {
            slot.into_inner()
                .expect("workgroup result slot poisoned")
                .expect("every scheduled workgroup deposits a result before the scope returns")
        })
        .collect();

    let merged = if dense {
        merge_overlapping(symbols, max_load_factor, partial)?
    } else {
        merge_disjoint(symbols, max_load_factor, partial)?
    };

    let out_symbols = merged.symbols().clone();
    let terms: Vec<Term<C, M>> = merged.into_terms().collect();
    transition(DriverState::Merging, DriverState::Done);
    log::debug!("multiply: produced {} terms", terms.len());
    Ok(Series::from_parts(out_symbols, terms))
}

/// Runs one worker's share of the Cartesian product, depositing results into `sink`.
fn run_workgroup<C, M>(
    worker: usize,
    workgroup: &Workgroup,
    a: &[Term<C, M>],
    b: &[Term<C, M>],
    filter: Option<&Filter<C, M>>,
    cancel: &CancellationFlag,
    sink: &mut Accumulator<C, M>,
) -> Result<()>
where
    C: Coefficient,
    M: Monomial + MonomialKernel,
{
    match workgroup {
        Workgroup::RowBand { rows } => {
            for i in rows.clone() {
                if cancel.is_set() {
                    return Err(Error::Cancelled);
                }
                for j in 0..b.len() {
                    M::multiply_and_deposit(&a[i], &b[j], filter, sink)
                        .map_err(|e| map_insert_error(worker, i, j, e))?;
                }
            }
        }
        Workgroup::HashBand { band, capacity } => {
            // Every worker classifies the full A x B product by the hash of its output monomial
            // (cheap: one exponent add plus one hash), but only the worker whose band the hash
            // falls into pays for the coefficient multiplication and the accumulator insert.
            for i in 0..a.len() {
                if cancel.is_set() {
                    return Err(Error::Cancelled);
                }
                for j in 0..b.len() {
                    let candidate = a[i].monomial.add(&b[j].monomial);
                    if !partitioner::hash_in_band(candidate.hash_value(), *capacity, band) {
                        continue;
                    }
                    let coefficient = a[i]
                        .coefficient
                        .multiply(&b[j].coefficient)
                        .map_err(|e| coefficient_error(worker, i, j, e))?;
                    if let Some(filter) = filter {
                        if !filter(&coefficient, &candidate) {
                            continue;
                        }
                    }
                    sink.insert(Term::new(coefficient, candidate))
                        .map_err(|e| map_insert_error(worker, i, j, e))?;
                }
            }
        }
    }
    Ok(())
}

fn coefficient_error<E>(worker: usize, i: usize, j: usize, source: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::CoefficientError {
        worker,
        pair: (i, j),
        source: Box::new(source),
    }
}

fn map_insert_error<E>(worker: usize, i: usize, j: usize, err: InsertError<E>) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    match err {
        InsertError::ArityMismatch { expected, found } => Error::InternalInvariantViolated(format!(
            "worker {worker} at pair ({i}, {j}): arity mismatch (expected {expected}, found {found})"
        )),
        InsertError::Coefficient(e) => coefficient_error(worker, i, j, e),
    }
}

/// Merges hash-band partial results: every worker's output monomials are, by construction,
/// disjoint from every other worker's, so this is a bucket concatenation rather than a real
/// summing merge. The `debug_assert!` below is the partitioning invariant made checkable: if two
/// workers ever produced the same output monomial, that is a bug in the partitioner or the hash
/// function, not a case this function is meant to handle silently.
fn merge_disjoint<C, M>(
    symbols: Arc<SymbolSet>,
    max_load_factor: f64,
    partial: Vec<Accumulator<C, M>>,
) -> Result<Accumulator<C, M>>
where
    C: Coefficient,
    M: Monomial,
{
    let total_len: usize = partial.iter().map(Accumulator::len).sum();
    let mut merged = Accumulator::new(symbols, total_len, max_load_factor);
    for acc in partial {
        for term in acc.into_terms() {
            let before = merged.len();
            merged
                .insert(term)
                .map_err(|e| Error::InternalInvariantViolated(format!("hash-band merge: {e}")))?;
            debug_assert_eq!(
                merged.len(),
                before + 1,
                "hash-band partitioning promised disjoint output monomials across workers"
            );
        }
    }
    Ok(merged)
}

/// Merges row-band partial results: two different row-workers can legitimately produce the same
/// output monomial (row-band only partitions the input, not the output hash space), so this is a
/// genuine summing merge through [`Accumulator::merge`].
fn merge_overlapping<C, M>(
    symbols: Arc<SymbolSet>,
    max_load_factor: f64,
    partial: Vec<Accumulator<C, M>>,
) -> Result<Accumulator<C, M>>
where
    C: Coefficient,
    M: Monomial,
{
    let mut iter = partial.into_iter();
    let mut merged = match iter.next() {
        Some(first) => first,
        None => Accumulator::new(symbols, 0, max_load_factor),
    };
    for acc in iter {
        merged
            .merge(acc)
            .map_err(|e| Error::InternalInvariantViolated(format!("row-band merge: {e}")))?;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monomial::ExponentVec;
    use num::{BigInt, ToPrimitive};

    fn symbols(names: &[&str]) -> Arc<SymbolSet> {
        Arc::new(SymbolSet::new(names.iter().map(|s| s.to_string())))
    }

    fn series(names: &[&str], terms: Vec<(Vec<i32>, i64)>) -> Series<BigInt, ExponentVec> {
        Series::from_terms(
            symbols(names),
            terms
                .into_iter()
                .map(|(exps, c)| Term::new(BigInt::from(c), ExponentVec::new(exps)))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn incompatible_symbol_sets_are_rejected() {
        let a = series(&["x"], vec![(vec![1], 1)]);
        let b = series(&["y"], vec![(vec![1], 1)]);
        let config = Config::default();
        assert!(matches!(multiply(&a, &b, &config), Err(Error::IncompatibleSymbols(_))));
    }

    #[test]
    fn empty_operand_yields_empty_result() {
        let a = series(&["x"], vec![]);
        let b = series(&["x"], vec![(vec![1], 1)]);
        let config = Config::default();
        let result = multiply(&a, &b, &config).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn univariate_product_matches_hand_computed_convolution() {
        // (1 + 2x) * (3 + 4x) = 3 + 10x + 8x^2
        let a = series(&["x"], vec![(vec![0], 1), (vec![1], 2)]);
        let b = series(&["x"], vec![(vec![0], 3), (vec![1], 4)]);
        let config = Config::default();
        let result = multiply(&a, &b, &config).unwrap();

        let mut terms: Vec<(i32, i64)> = result
            .terms()
            .iter()
            .map(|t| (t.monomial.exponents()[0], t.coefficient.to_i64().unwrap()))
            .collect();
        terms.sort_unstable();
        assert_eq!(terms, vec![(0, 3), (1, 10), (2, 8)]);
    }

    #[test]
    fn cancellation_is_observed_before_work_completes() {
        let a = series(&["x"], (0..5000).map(|i| (vec![i], 1)).collect());
        let b = series(&["x"], (0..5000).map(|i| (vec![i], 1)).collect());
        let config = Config {
            min_parallel_work: 0,
            thread_count: 2,
            ..Config::default()
        };
        let cancel = CancellationFlag::new();
        cancel.set();
        let result = multiply_cancellable(&a, &b, &config, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    fn sorted_terms(s: &Series<BigInt, ExponentVec>) -> Vec<(Vec<i32>, BigInt)> {
        let mut terms: Vec<(Vec<i32>, BigInt)> = s
            .terms()
            .iter()
            .map(|t| (t.monomial.exponents().to_vec(), t.coefficient.clone()))
            .collect();
        terms.sort_by(|a, b| a.0.cmp(&b.0));
        terms
    }

    #[test]
    fn result_is_independent_of_thread_count_for_a_sparse_product() {
        // Distinct powers of two: every pairwise sum is unique, so the estimator reports this as
        // sparse and the driver takes the hash-band path regardless of thread count.
        let a_exps: Vec<i32> = (0..12).map(|i| 1 << i).collect();
        let b_exps: Vec<i32> = (0..12).map(|i| 1 << (i + 16)).collect();
        let a = series(&["x"], a_exps.iter().map(|&e| (vec![e], 1)).collect());
        let b = series(&["x"], b_exps.iter().map(|&e| (vec![e], 1)).collect());

        let serial = multiply(&a, &b, &Config { thread_count: 1, ..Config::default() }).unwrap();
        let parallel = multiply(&a, &b, &Config { thread_count: 4, ..Config::default() }).unwrap();
        assert_eq!(sorted_terms(&serial), sorted_terms(&parallel));
    }

    #[test]
    fn result_is_independent_of_thread_count_for_a_dense_product() {
        // Every pairwise sum collapses onto one of a much smaller set of exponents: a dense
        // product, driving the driver to the row-band path.
        let a = series(&["x"], (0..40).map(|i| (vec![i], 1)).collect());
        let b = series(&["x"], (0..40).map(|i| (vec![i], 1)).collect());

        let serial = multiply(&a, &b, &Config { thread_count: 1, ..Config::default() }).unwrap();
        let parallel = multiply(&a, &b, &Config { thread_count: 4, ..Config::default() }).unwrap();
        assert_eq!(sorted_terms(&serial), sorted_terms(&parallel));
    }
}
