use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::coefficient::Coefficient;
use crate::monomial::Monomial;
use crate::term::Term;

/// Threshold on [`Estimate::distinct_fraction`] above which the driver treats the product as
/// sparse (hash-band partitioning) rather than dense (row-band partitioning). Chosen so that
/// inputs whose sampled pairs mostly collide (heavy cancellation/merging, as in expanded dense
/// polynomials) fall on the row-band path, which amortizes the per-row work of a dense product
/// better than redundant hash classification would.
pub const DENSITY_STRATEGY_THRESHOLD: f64 = 0.3;

/// Prediction of the multiplier's output shape, produced by sampling random term pairs before
/// scheduling any real work.
#[derive(Debug, Clone, Copy)]
pub struct Estimate {
    /// Predicted number of distinct output monomials.
    pub predicted_count: usize,
    /// Output hash table capacity (a power of two) sized from `predicted_count` at the
    /// configured max load factor.
    pub capacity: usize,
    /// Fraction of sampled pairs whose product monomial was not seen elsewhere in the sample;
    /// low values indicate heavy collision/cancellation (a dense product), high values indicate
    /// a sparse product.
    pub distinct_fraction: f64,
}

impl Estimate {
    /// True iff the driver should use the row-band (dense) partitioning strategy rather than
    /// hash-band (sparse) partitioning.
    pub fn is_dense(&self) -> bool {
        self.distinct_fraction < DENSITY_STRATEGY_THRESHOLD
    }
}

const MIN_CAPACITY: usize = 8;

/// Samples `sample_count` random pairs from `a x b`, counts distinct product monomials among
/// them, and extrapolates to a full-product cardinality estimate.
///
/// The extrapolation treats the sample as draws (with replacement) from an unknown number of
/// equally likely output buckets and scales the sampled distinct-output rate by the total pair
/// count: `N_hat = |A|*|B| * (distinct / sample_count)`, clamped to `[distinct, |A|*|B|]`.
/// Overestimating `N_hat` only wastes memory (a larger table than strictly needed);
/// underestimating forces a later resize, which [`crate::multiplier::accumulator::Accumulator`]
/// already handles correctly, just less cheaply. The sampler is deterministic given `seed`, so
/// repeated runs over the same inputs pick the same capacity and strategy.
pub fn estimate<C, M>(
    a: &[Term<C, M>],
    b: &[Term<C, M>],
    sample_count: usize,
    seed: u64,
    max_load_factor: f64,
) -> Estimate
where
    C: Coefficient,
    M: Monomial,
{
    let total_pairs = a.len().saturating_mul(b.len());
    if total_pairs == 0 {
        return Estimate {
            predicted_count: 0,
            capacity: MIN_CAPACITY,
            distinct_fraction: 0.0,
        };
    }

    let effective_samples = sample_count.min(total_pairs).max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(effective_samples);

    for _ in 0..effective_samples {
        let i = rng.gen_range(0..a.len());
        let j = rng.gen_range(0..b.len());
        let product_monomial = a[i].monomial.add(&b[j].monomial);
        seen.insert(product_monomial.hash_value());
    }

    let distinct = seen.len();
    let distinct_fraction = distinct as f64 / effective_samples as f64;
    let predicted_count = ((total_pairs as f64) * distinct_fraction)
        .round()
        .max(distinct as f64)
        .min(total_pairs as f64) as usize;

    let capacity = ((predicted_count as f64 / max_load_factor).ceil() as usize)
        .max(MIN_CAPACITY)
        .next_power_of_two();

    Estimate {
        predicted_count,
        capacity,
        distinct_fraction,
    }
}
