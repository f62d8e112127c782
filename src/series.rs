use std::sync::Arc;

use crate::coefficient::Coefficient;
use crate::error::{Error, Result};
use crate::monomial::Monomial;
use crate::multiplier::accumulator::Accumulator;
use crate::symbol::SymbolSet;
use crate::term::Term;

/// A truncated multivariate series: an unordered set of non-zero `(coefficient, monomial)` terms
/// over a fixed [`SymbolSet`].
///
/// `Series` itself does no parallel work -- it is the value type [`crate::multiply`] consumes and
/// produces. Building one always goes through an [`Accumulator`], so the "no duplicate monomials,
/// no zero coefficients" invariant holds by construction rather than by convention.
#[derive(Clone, Debug)]
pub struct Series<C, M> {
    symbols: Arc<SymbolSet>,
    terms: Vec<Term<C, M>>,
}

impl<C: Coefficient, M: Monomial> Series<C, M> {
    /// The series with no terms over `symbols`. `capacity_hint` only sizes the backing storage;
    /// it does not change the (empty) value.
    pub fn new_empty(symbols: Arc<SymbolSet>, capacity_hint: usize) -> Self {
        Series {
            symbols,
            terms: Vec::with_capacity(capacity_hint),
        }
    }

    /// Builds a series from terms that may repeat a monomial or carry a zero coefficient,
    /// combining and dropping as needed through an [`Accumulator`].
    pub fn from_terms(symbols: Arc<SymbolSet>, terms: Vec<Term<C, M>>) -> Result<Self> {
        let mut acc: Accumulator<C, M> = Accumulator::new(symbols.clone(), terms.len(), 0.5);
        for term in terms {
            acc.insert(term).map_err(|e| {
                Error::InternalInvariantViolated(format!("building series from terms: {e}"))
            })?;
        }
        Ok(Series {
            symbols,
            terms: acc.into_terms().collect(),
        })
    }

    fn from_accumulator(acc: Accumulator<C, M>) -> Self {
        let symbols = acc.symbols().clone();
        Series {
            symbols,
            terms: acc.into_terms().collect(),
        }
    }

    /// The symbol set every term's monomial is defined over.
    pub fn symbols(&self) -> &Arc<SymbolSet> {
        &self.symbols
    }

    /// Read access to the stored terms, in arbitrary order.
    pub fn terms(&self) -> &[Term<C, M>] {
        &self.terms
    }

    /// Number of non-zero terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True iff this series has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Term-wise addition. Both operands must share the same symbol set (in the same order);
    /// callers that need to combine series with differently-ordered symbol sets should call
    /// [`Series::aligned_to`] on one of them first.
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.symbols != other.symbols {
            return Err(Error::IncompatibleSymbols(format!(
                "{:?} vs {:?}",
                self.symbols.names().collect::<Vec<_>>(),
                other.symbols.names().collect::<Vec<_>>()
            )));
        }
        let mut acc: Accumulator<C, M> = Accumulator::new(
            self.symbols.clone(),
            self.terms.len() + other.terms.len(),
            0.5,
        );
        for term in self.terms.iter().chain(other.terms.iter()).cloned() {
            acc.insert(term).map_err(|e| {
                Error::InternalInvariantViolated(format!("series addition: {e}"))
            })?;
        }
        Ok(Series::from_accumulator(acc))
    }

    /// Unary negation: every coefficient is replaced by its additive inverse. Cannot introduce or
    /// remove a term, since negation never produces a zero from a non-zero coefficient for any
    /// ring this crate ships.
    pub fn negate(&self) -> Self {
        Series {
            symbols: self.symbols.clone(),
            terms: self
                .terms
                .iter()
                .map(|t| Term::new(t.coefficient.negate(), t.monomial.clone()))
                .collect(),
        }
    }

    /// Realigns every term's monomial onto `target`, a symbol set that must be a superset of
    /// `self.symbols()` (as produced by [`SymbolSet::union`]). This is the ambient
    /// "align the operand" step a caller runs before invoking [`crate::multiply`] on two series
    /// that are compatible in content but were built over differently-ordered or differently-sized
    /// symbol sets; `multiply` itself never calls this implicitly.
    pub fn aligned_to(&self, target: &Arc<SymbolSet>) -> Self {
        let remap = self.symbols.remap_positions(target);
        Series {
            symbols: target.clone(),
            terms: self
                .terms
                .iter()
                .map(|t| Term::new(t.coefficient.clone(), t.monomial.realign(&remap)))
                .collect(),
        }
    }
}

impl<C, M> Series<C, M> {
    /// Builds a series directly from already-deduplicated, already-non-zero terms, trusting the
    /// caller. Used internally by the driver, which builds its result through an `Accumulator`
    /// and therefore already has that guarantee.
    pub(crate) fn from_parts(symbols: Arc<SymbolSet>, terms: Vec<Term<C, M>>) -> Self {
        Series { symbols, terms }
    }
}
