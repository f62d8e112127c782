use std::convert::Infallible;

use num::rational::BigRational;
use num::{BigInt, One, Signed, Zero};

use crate::monomial::Monomial;
use crate::multiplier::kernel::MonomialKernel;
use crate::series::Series;

/// Capability trait for a value from a commutative ring: the multiplier treats it as a black
/// box, assuming multiplication is the expensive operation and that `add_in_place` may
/// allocate.
///
/// Implementations report failures through an associated `Error` rather than panicking, so the
/// driver can turn them into [`crate::error::Error::CoefficientError`] with worker/pair context
/// attached at the call site.
pub trait Coefficient: Clone + Send + Sync + std::fmt::Debug {
    /// Error type for fallible ring operations. Infallible rings (the common case) use
    /// [`std::convert::Infallible`].
    type Error: std::error::Error + Send + Sync + 'static;

    /// The additive identity.
    fn zero() -> Self;

    /// `self += other`, in place, since the result may be larger than either operand
    /// (arbitrary-precision rings) and callers should not pay for an extra move when avoidable.
    fn add_in_place(&mut self, other: &Self) -> Result<(), Self::Error>;

    /// Ring multiplication, producing a new value.
    fn multiply(&self, other: &Self) -> Result<Self, Self::Error>;

    /// Unary negation.
    fn negate(&self) -> Self;

    /// True iff this value is the additive identity.
    fn is_zero(&self) -> bool;
}

impl Coefficient for BigInt {
    type Error = Infallible;

    fn zero() -> Self {
        Zero::zero()
    }

    fn add_in_place(&mut self, other: &Self) -> Result<(), Self::Error> {
        *self += other;
        Ok(())
    }

    fn multiply(&self, other: &Self) -> Result<Self, Self::Error> {
        Ok(&*self * other)
    }

    fn negate(&self) -> Self {
        -self.clone()
    }

    fn is_zero(&self) -> bool {
        Zero::is_zero(self)
    }
}

impl Coefficient for BigRational {
    type Error = Infallible;

    fn zero() -> Self {
        Zero::zero()
    }

    fn add_in_place(&mut self, other: &Self) -> Result<(), Self::Error> {
        *self += other;
        Ok(())
    }

    fn multiply(&self, other: &Self) -> Result<Self, Self::Error> {
        Ok(&*self * other)
    }

    fn negate(&self) -> Self {
        -self.clone()
    }

    fn is_zero(&self) -> bool {
        Zero::is_zero(self)
    }
}

/// IEEE-754 double. Associativity of `+=` is *not* guaranteed for this coefficient type, so
/// multi-threaded results may differ bit-for-bit between thread counts, by design -- callers that
/// need bitwise-reproducible results regardless of `thread_count` should use an exact ring
/// (`BigInt`/`BigRational`) instead.
impl Coefficient for f64 {
    type Error = Infallible;

    fn zero() -> Self {
        0.0
    }

    fn add_in_place(&mut self, other: &Self) -> Result<(), Self::Error> {
        *self += other;
        Ok(())
    }

    fn multiply(&self, other: &Self) -> Result<Self, Self::Error> {
        Ok(self * other)
    }

    fn negate(&self) -> Self {
        -self
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

/// A coefficient that is itself a series: multiplication recurses through [`crate::multiply`]
/// with the crate's default [`crate::config::Config`]. This handles series-of-series coefficients
/// by recursion on coefficient multiplication, with no special-casing in the multiplier itself.
#[derive(Clone, Debug)]
pub struct NestedSeries<C: Coefficient, M: Monomial>(pub Series<C, M>);

impl<C: Coefficient + 'static, M: Monomial + MonomialKernel + 'static> Coefficient for NestedSeries<C, M> {
    type Error = crate::error::Error;

    fn zero() -> Self {
        // A coefficient-level zero carries no symbol set of its own; nested series addition and
        // multiplication only ever combine two `NestedSeries` values that already share one
        // (enforced by the outer multiplier, which only ever operates on same-symbol-set
        // operands), except for this additive identity, which is empty over an empty symbol set
        // and gets its real symbol set the first time it participates in an `add_in_place` with
        // a non-identity operand.
        NestedSeries(Series::new_empty(
            std::sync::Arc::new(crate::symbol::SymbolSet::default()),
            0,
        ))
    }

    fn add_in_place(&mut self, other: &Self) -> Result<(), Self::Error> {
        if self.0.symbols().is_empty() && self.0.is_empty() {
            self.0 = other.0.clone();
            return Ok(());
        }
        self.0 = self.0.add(&other.0)?;
        Ok(())
    }

    fn multiply(&self, other: &Self) -> Result<Self, Self::Error> {
        let config = crate::config::Config::default();
        Ok(NestedSeries(crate::multiply(&self.0, &other.0, &config)?))
    }

    fn negate(&self) -> Self {
        NestedSeries(self.0.negate())
    }

    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

/// Helper used by tests and by `BigRational` coefficient construction to build exact rationals
/// without spelling out `BigInt::from` everywhere.
pub fn ratio(numerator: i64, denominator: i64) -> BigRational {
    BigRational::new(BigInt::from(numerator), BigInt::from(denominator))
}

/// True iff `value` is representable as an exactly-rounded `f64` integer, i.e. its magnitude is
/// at most `2^53` -- the bound past which IEEE-754 double addition can silently drop precision.
/// Used by the S8 test-harness caveat: exact-cardinality assertions with `f64` coefficients only
/// hold when every intermediate value stays within this bound.
pub fn fits_f64_exact_integer(value: &BigInt) -> bool {
    let bound = BigInt::from(1i64 << 53);
    value.abs() <= bound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bigint_add_and_multiply() {
        let mut a = BigInt::from(3);
        let b = BigInt::from(4);
        Coefficient::add_in_place(&mut a, &b).unwrap();
        assert_eq!(a, BigInt::from(7));
        let p = Coefficient::multiply(&a, &b).unwrap();
        assert_eq!(p, BigInt::from(28));
    }

    #[test]
    fn bigint_negate_and_is_zero() {
        let a = BigInt::from(5);
        assert_eq!(Coefficient::negate(&a), BigInt::from(-5));
        assert!(!Coefficient::is_zero(&a));
        assert!(Coefficient::is_zero(&BigInt::zero()));
    }

    #[test]
    fn rational_arithmetic_is_exact() {
        let a = ratio(1, 3);
        let b = ratio(1, 6);
        let mut sum = a.clone();
        Coefficient::add_in_place(&mut sum, &b).unwrap();
        assert_eq!(sum, ratio(1, 2));
    }

    #[test]
    fn f64_multiplication_matches_primitive_multiplication() {
        let a = 2.5_f64;
        let b = 4.0_f64;
        assert_eq!(Coefficient::multiply(&a, &b).unwrap(), 10.0);
    }

    #[test]
    fn fits_f64_exact_integer_bound() {
        assert!(fits_f64_exact_integer(&BigInt::from(1i64 << 53)));
        assert!(!fits_f64_exact_integer(&(BigInt::from(1i64 << 53) + BigInt::one())));
    }
}
