use crate::coefficient::Coefficient;
use crate::monomial::Monomial;

/// A `(coefficient, monomial)` pair. Every `Term` held by a [`crate::series::Series`] must have
/// a non-zero coefficient; the accumulator is responsible for upholding that invariant, not
/// `Term` itself (a `Term` can transiently hold a zero coefficient while it is being built).
#[derive(Debug, Clone)]
pub struct Term<C, M> {
    /// The term's coefficient.
    pub coefficient: C,
    /// The term's monomial.
    pub monomial: M,
}

impl<C, M> Term<C, M> {
    /// Builds a term from its parts.
    pub fn new(coefficient: C, monomial: M) -> Self {
        Term {
            coefficient,
            monomial,
        }
    }
}

impl<C: Coefficient, M: Monomial> Term<C, M> {
    /// True iff this term's coefficient is the additive identity. A well-formed series never
    /// contains such a term.
    pub fn is_zero(&self) -> bool {
        self.coefficient.is_zero()
    }
}
