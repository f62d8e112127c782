use std::sync::Arc;

use crate::coefficient::Coefficient;
use crate::monomial::Monomial;
use crate::symbol::SymbolSet;
use crate::term::Term;

/// Failure modes of [`Accumulator::insert`].
#[derive(Debug)]
pub enum InsertError<E> {
    /// The inserted monomial's arity does not match the accumulator's symbol set.
    ArityMismatch {
        /// Arity of the owning symbol set.
        expected: usize,
        /// Arity the inserted monomial actually had.
        found: usize,
    },
    /// The coefficient ring raised an error while merging.
    Coefficient(E),
}

impl<E: std::fmt::Display> std::fmt::Display for InsertError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertError::ArityMismatch { expected, found } => write!(
                f,
                "monomial arity {found} does not match symbol set arity {expected}"
            ),
            InsertError::Coefficient(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for InsertError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InsertError::ArityMismatch { .. } => None,
            InsertError::Coefficient(e) => Some(e),
        }
    }
}

/// An open-addressed, linear-probing hash table mapping monomial to non-zero coefficient.
///
/// This is both the multiplier's output table and the private scratch space each worker
/// accumulates into -- there is no lock anywhere in [`Accumulator::insert`]; concurrency safety
/// comes from the driver's partitioning, not from synchronization here (see
/// [`crate::multiplier::partitioner`]).
///
/// Deletion (on coefficient cancellation) is by backward-shift compaction of the probe chain,
/// not tombstoning: this keeps "every stored coefficient is non-zero" true at every
/// observer-visible moment, including mid-probe, without a third bucket state to reason about.
#[derive(Clone)]
pub struct Accumulator<C, M> {
    symbols: Arc<SymbolSet>,
    buckets: Vec<Option<Term<C, M>>>,
    mask: usize,
    len: usize,
    max_load_factor: f64,
}

const MIN_CAPACITY: usize = 8;

impl<C: Coefficient, M: Monomial> Accumulator<C, M> {
    /// Creates an empty accumulator sized to hold at least `capacity_hint` entries at the given
    /// `max_load_factor` before its first resize.
    pub fn new(symbols: Arc<SymbolSet>, capacity_hint: usize, max_load_factor: f64) -> Self {
        let min_capacity = ((capacity_hint as f64 / max_load_factor).ceil() as usize).max(MIN_CAPACITY);
        let capacity = min_capacity.next_power_of_two();
        Accumulator {
            symbols,
            buckets: (0..capacity).map(|_| None).collect(),
            mask: capacity - 1,
            len: 0,
            max_load_factor,
        }
    }

    /// The symbol set every monomial in this accumulator is defined over.
    pub fn symbols(&self) -> &Arc<SymbolSet> {
        &self.symbols
    }

    /// Current bucket count (always a power of two).
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Number of non-zero terms currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True iff no terms are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current load factor (`len / capacity`).
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    fn would_exceed_load_after_insert(&self) -> bool {
        (self.len + 1) as f64 > self.max_load_factor * self.buckets.len() as f64
    }

    fn home(&self, monomial: &M) -> usize {
        monomial.hash_value() as usize & self.mask
    }

    /// Inserts `term`, merging with an existing entry of the same monomial via
    /// [`Coefficient::add_in_place`] if one is present. If the merge produces a zero
    /// coefficient, the entry is evicted rather than stored. `term.coefficient` must be
    /// non-zero on entry if it is a brand-new monomial (callers -- the kernel -- are expected to
    /// have already discarded zero products via the filter hook, not rely on this to catch
    /// them).
    pub fn insert(&mut self, term: Term<C, M>) -> Result<(), InsertError<C::Error>> {
        if term.monomial.arity() != self.symbols.len() {
            return Err(InsertError::ArityMismatch {
                expected: self.symbols.len(),
                found: term.monomial.arity(),
            });
        }
        if self.would_exceed_load_after_insert() {
            self.resize(self.buckets.len() * 2);
        }

        let mut idx = self.home(&term.monomial);
        loop {
            let slot_is_match = matches!(&self.buckets[idx], Some(existing) if existing.monomial == term.monomial);
            if slot_is_match {
                let existing = self.buckets[idx].as_mut().expect("checked Some above");
                existing
                    .coefficient
                    .add_in_place(&term.coefficient)
                    .map_err(InsertError::Coefficient)?;
                if existing.coefficient.is_zero() {
                    self.evict(idx);
                }
                return Ok(());
            }
            if self.buckets[idx].is_none() {
                self.buckets[idx] = Some(term);
                self.len += 1;
                return Ok(());
            }
            idx = (idx + 1) & self.mask;
        }
    }

    /// Folds `other` into `self`, preserving all invariants. Consumes `other`.
    pub fn merge(&mut self, other: Accumulator<C, M>) -> Result<(), InsertError<C::Error>> {
        for term in other.into_terms() {
            self.insert(term)?;
        }
        Ok(())
    }

    /// Iterates over stored terms in arbitrary (bucket) order.
    pub fn iter(&self) -> impl Iterator<Item = &Term<C, M>> {
        self.buckets.iter().filter_map(Option::as_ref)
    }

    /// Consumes the accumulator, yielding its terms in arbitrary order.
    pub fn into_terms(self) -> impl Iterator<Item = Term<C, M>> {
        self.buckets.into_iter().flatten()
    }

    /// Grows the table to `new_capacity` (rounded up to a power of two) and rehashes every
    /// entry. Rehashing only ever happens at a resize event, never incrementally.
    fn resize(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.max(self.buckets.len() * 2).next_power_of_two();
        let new_mask = new_capacity - 1;
        let mut new_buckets: Vec<Option<Term<C, M>>> = (0..new_capacity).map(|_| None).collect();

        for term in self.buckets.drain(..).flatten() {
            let mut idx = term.monomial.hash_value() as usize & new_mask;
            while new_buckets[idx].is_some() {
                idx = (idx + 1) & new_mask;
            }
            new_buckets[idx] = Some(term);
        }

        self.buckets = new_buckets;
        self.mask = new_mask;
    }

    /// Backward-shift deletion: removes the entry at `hole` and slides later entries in its
    /// probe chain back to fill the gap, stopping at any entry whose home bucket still requires
    /// it to stay where it is.
    fn evict(&mut self, hole: usize) {
        self.buckets[hole] = None;
        self.len -= 1;

        let mut i = hole;
        let mut j = i;
        loop {
            j = (j + 1) & self.mask;
            let home = match &self.buckets[j] {
                None => break,
                Some(entry) => self.home(&entry.monomial),
            };
            if Self::in_cyclic_range(i, home, j) {
                // `home` lies strictly between the hole and `j`: the entry at `j` must stay on
                // its current probe chain, so it cannot fill the hole. Keep scanning forward.
                continue;
            }
            self.buckets.swap(i, j);
            i = j;
        }
    }

    /// True iff `k` lies in the cyclic interval `(i, j]` modulo the table size.
    fn in_cyclic_range(i: usize, k: usize, j: usize) -> bool {
        if i <= j {
            k > i && k <= j
        } else {
            k > i || k <= j
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monomial::ExponentVec;
    use num::BigInt;

    fn symbols(n: usize) -> Arc<SymbolSet> {
        Arc::new(SymbolSet::new((0..n).map(|i| format!("x{i}"))))
    }

    fn term(exps: Vec<i32>, coef: i64) -> Term<BigInt, ExponentVec> {
        Term::new(BigInt::from(coef), ExponentVec::new(exps))
    }

    #[test]
    fn insert_then_merge_accumulates_equal_monomials() {
        let mut acc = Accumulator::new(symbols(2), 4, 0.5);
        acc.insert(term(vec![1, 0], 3)).unwrap();
        acc.insert(term(vec![1, 0], 4)).unwrap();
        assert_eq!(acc.len(), 1);
        assert_eq!(acc.iter().next().unwrap().coefficient, BigInt::from(7));
    }

    #[test]
    fn cancellation_evicts_the_entry() {
        let mut acc = Accumulator::new(symbols(1), 4, 0.5);
        acc.insert(term(vec![5], 3)).unwrap();
        acc.insert(term(vec![5], -3)).unwrap();
        assert_eq!(acc.len(), 0);
        assert!(acc.iter().next().is_none());
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let mut acc = Accumulator::new(symbols(2), 4, 0.5);
        let bad = Term::new(BigInt::from(1), ExponentVec::new(vec![1]));
        match acc.insert(bad) {
            Err(InsertError::ArityMismatch { expected, found }) => {
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected ArityMismatch, got {other:?}"),
        }
    }

    #[test]
    fn resize_preserves_all_entries() {
        let mut acc = Accumulator::new(symbols(1), 2, 0.5);
        for i in 0..200 {
            acc.insert(term(vec![i], 1)).unwrap();
        }
        assert_eq!(acc.len(), 200);
        let mut seen: Vec<i32> = acc
            .iter()
            .map(|t| t.monomial.exponents()[0])
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn merge_combines_two_accumulators() {
        let mut a = Accumulator::new(symbols(1), 4, 0.5);
        a.insert(term(vec![1], 2)).unwrap();
        let mut b = Accumulator::new(symbols(1), 4, 0.5);
        b.insert(term(vec![1], 5)).unwrap();
        b.insert(term(vec![2], 9)).unwrap();

        a.merge(b).unwrap();
        assert_eq!(a.len(), 2);
        let sum_for_one: Vec<_> = a
            .iter()
            .filter(|t| t.monomial.exponents() == [1])
            .collect();
        assert_eq!(sum_for_one.len(), 1);
        assert_eq!(sum_for_one[0].coefficient, BigInt::from(7));
    }

    #[test]
    fn load_factor_never_exceeds_configured_maximum_after_insert_settles() {
        let mut acc = Accumulator::new(symbols(1), 4, 0.5);
        for i in 0..1000 {
            acc.insert(term(vec![i], 1)).unwrap();
        }
        assert!(acc.load_factor() <= 0.5);
    }

    #[test]
    fn eviction_does_not_break_lookups_for_survivors_in_the_same_probe_chain() {
        // Force collisions by using a tiny table and monomials that hash to the same bucket
        // (all single-exponent monomials of a 1-symbol accumulator collide under any hash
        // function with enough density, since capacity is small).
        let mut acc = Accumulator::new(symbols(1), 2, 0.9);
        for i in 0..6 {
            acc.insert(term(vec![i], (i + 1) as i64)).unwrap();
        }
        // Cancel the middle one out and make sure everything else is still found correctly.
        acc.insert(term(vec![3], -4)).unwrap();
        let mut remaining: Vec<i32> = acc.iter().map(|t| t.monomial.exponents()[0]).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![0, 1, 2, 4, 5]);
    }
}
