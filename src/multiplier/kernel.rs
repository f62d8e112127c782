use crate::coefficient::Coefficient;
use crate::config::Filter;
use crate::monomial::{Monomial, PackedExponents};
use crate::multiplier::accumulator::{Accumulator, InsertError};
use crate::term::Term;

/// Multiplies one term pair and deposits the result into `sink`, honoring an optional filter.
///
/// Implemented per concrete monomial type rather than as a blanket impl, so that a type can
/// override the default "general kernel" with a specialized one without conflicting with it --
/// stable Rust has no specialization for overlapping impls, so per-type impls are the only way to
/// let [`crate::monomial::PackedMonomial`] pick a faster path while [`crate::monomial::ExponentVec`]
/// falls back to the default. Whichever path a type picks, it must never change *which* products
/// end up in `sink`, only how fast they get there -- this module's tests cross-check both
/// against each other.
pub trait MonomialKernel: Monomial {
    /// Computes `(c_a * c_b, m_a + m_b)`, drops it if `filter` rejects it, and otherwise
    /// deposits it into `sink`.
    fn multiply_and_deposit<C: Coefficient>(
        a: &Term<C, Self>,
        b: &Term<C, Self>,
        filter: Option<&Filter<C, Self>>,
        sink: &mut Accumulator<C, Self>,
    ) -> Result<(), InsertError<C::Error>> {
        let monomial = a.monomial.add(&b.monomial);
        deposit(monomial, a, b, filter, sink)
    }
}

fn deposit<C, M>(
    monomial: M,
    a: &Term<C, M>,
    b: &Term<C, M>,
    filter: Option<&Filter<C, M>>,
    sink: &mut Accumulator<C, M>,
) -> Result<(), InsertError<C::Error>>
where
    C: Coefficient,
    M: Monomial,
{
    let coefficient = a
        .coefficient
        .multiply(&b.coefficient)
        .map_err(InsertError::Coefficient)?;

    if let Some(filter) = filter {
        if !filter(&coefficient, &monomial) {
            return Ok(());
        }
    }

    sink.insert(Term::new(coefficient, monomial))
}

impl MonomialKernel for crate::monomial::ExponentVec {}

/// Specialized kernel for packed monomials. The word-level add and the inlined hash are already
/// provided by [`crate::monomial::PackedMonomial`]'s own `Monomial` impl (`add` does a single
/// wrapping word addition guarded by a lane-overflow `debug_assert`; `hash_value` mixes the packed
/// word directly, with no per-exponent hashing), so the default `MonomialKernel` method -- which
/// just calls `a.monomial.add(&b.monomial)` -- already gets the fast path for free. This impl
/// block exists to name the specialization explicitly rather than leaving it to the blanket
/// default; it must route through [`crate::monomial::Monomial::add`] rather than hand-rolling the
/// word addition again, so the overflow guard can never be bypassed.
impl MonomialKernel for crate::monomial::PackedMonomial {}

/// Free-function form of the packed kernel, for callers (and tests) that want to exercise it
/// without going through the [`MonomialKernel`] trait. Routes through [`Monomial::add`] just like
/// the trait method does, so the lane-overflow `debug_assert` in
/// [`crate::monomial::PackedMonomial::add`] always runs -- a hand-rolled `wrapping_add` on the raw
/// packed words here would silently corrupt a neighbouring lane whenever a sum crosses
/// `MAX_EXPONENT`.
pub fn multiply_and_deposit_packed<C, M>(
    a: &Term<C, M>,
    b: &Term<C, M>,
    filter: Option<&Filter<C, M>>,
    sink: &mut Accumulator<C, M>,
) -> Result<(), InsertError<C::Error>>
where
    C: Coefficient,
    M: Monomial + PackedExponents,
{
    let monomial = a.monomial.add(&b.monomial);
    deposit(monomial, a, b, filter, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monomial::{ExponentVec, PackedMonomial};
    use crate::symbol::SymbolSet;
    use num::BigInt;
    use std::sync::Arc;

    fn symbols(n: usize) -> Arc<SymbolSet> {
        Arc::new(SymbolSet::new((0..n).map(|i| format!("x{i}"))))
    }

    #[test]
    fn general_kernel_multiplies_and_deposits() {
        let mut sink: Accumulator<BigInt, ExponentVec> = Accumulator::new(symbols(2), 4, 0.5);
        let a = Term::new(BigInt::from(2), ExponentVec::new(vec![1, 0]));
        let b = Term::new(BigInt::from(3), ExponentVec::new(vec![0, 2]));
        ExponentVec::multiply_and_deposit(&a, &b, None, &mut sink).unwrap();
        assert_eq!(sink.len(), 1);
        let term = sink.iter().next().unwrap();
        assert_eq!(term.coefficient, BigInt::from(6));
        assert_eq!(term.monomial.exponents(), &[1, 2]);
    }

    #[test]
    fn filter_discards_without_touching_accumulator() {
        let mut sink: Accumulator<BigInt, ExponentVec> = Accumulator::new(symbols(1), 4, 0.5);
        let a = Term::new(BigInt::from(2), ExponentVec::new(vec![5]));
        let b = Term::new(BigInt::from(3), ExponentVec::new(vec![5]));
        let filter: Filter<BigInt, ExponentVec> =
            std::sync::Arc::new(|_c: &BigInt, m: &ExponentVec| m.exponents()[0] < 5);
        ExponentVec::multiply_and_deposit(&a, &b, Some(&filter), &mut sink).unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    #[should_panic(expected = "lane overflow")]
    fn packed_kernel_catches_lane_overflow_via_monomial_add() {
        // Both exponents sit just under MAX_EXPONENT in the same lane; their sum overflows that
        // lane and would corrupt its neighbour if the kernel ever bypassed `PackedMonomial::add`'s
        // overflow guard. Routing through `Monomial::add` must trip the guard instead of silently
        // producing a wrong monomial.
        let mut sink: Accumulator<BigInt, PackedMonomial> = Accumulator::new(symbols(2), 4, 0.5);
        let a = Term::new(
            BigInt::from(1),
            PackedMonomial::try_new(&[PackedMonomial::MAX_EXPONENT, 0]).unwrap(),
        );
        let b = Term::new(
            BigInt::from(1),
            PackedMonomial::try_new(&[1, 0]).unwrap(),
        );
        let _ = multiply_and_deposit_packed(&a, &b, None, &mut sink);
    }

    #[test]
    fn packed_kernel_agrees_with_general_kernel() {
        let mut general: Accumulator<BigInt, ExponentVec> = Accumulator::new(symbols(3), 4, 0.5);
        let mut packed: Accumulator<BigInt, PackedMonomial> = Accumulator::new(symbols(3), 4, 0.5);

        let ga = Term::new(BigInt::from(2), ExponentVec::new(vec![1, 2, 0]));
        let gb = Term::new(BigInt::from(5), ExponentVec::new(vec![0, 1, 3]));
        ExponentVec::multiply_and_deposit(&ga, &gb, None, &mut general).unwrap();

        let pa = Term::new(BigInt::from(2), PackedMonomial::try_new(&[1, 2, 0]).unwrap());
        let pb = Term::new(BigInt::from(5), PackedMonomial::try_new(&[0, 1, 3]).unwrap());
        multiply_and_deposit_packed(&pa, &pb, None, &mut packed).unwrap();

        let expected = general.iter().next().unwrap();
        let actual = packed.iter().next().unwrap();
        assert_eq!(expected.coefficient, actual.coefficient);
        assert_eq!(
            expected.monomial.exponents(),
            actual
                .monomial
                .exponents()
                .iter()
                .map(|&e| e as i32)
                .collect::<Vec<_>>()
        );
    }
}
